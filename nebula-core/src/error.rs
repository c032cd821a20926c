use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the remote chain indexer.
///
/// A 404 is never represented here; the client turns it into an empty value.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Indexer returned {status} for {path}")]
    Status { status: StatusCode, path: String },

    #[error("Indexer rate limit still exceeded for {path} after retries")]
    RateLimited { path: String },

    #[error("Malformed indexer payload for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Pipeline-level faults surfaced to the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Upstream indexer failure: {0}")]
    Upstream(#[from] IndexerError),

    #[error("No holders found for this asset")]
    NoHolders,

    #[error("Pipeline cancelled")]
    Cancelled,
}

pub type IndexerResult<T> = Result<T, IndexerError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
