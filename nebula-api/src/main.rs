use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use nebula_core::{
    aggregator::StakeAggregator,
    assembler::assemble_graph,
    config::NebulaConfig,
    error::PipelineError,
    indexer::BlockfrostClient,
    labels::{LabelRegistry, WalletLabel},
    models::GraphResponse,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const FETCH_FAILED_MESSAGE: &str = "Failed to fetch token data. Please try again.";

/// Errors reported to HTTP clients as `{ "error": ... }`.
#[derive(Debug)]
enum ApiError {
    BadRequest(&'static str),
    NoHolders,
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NoHolders => (StatusCode::NOT_FOUND, "No holders found for this asset"),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED_MESSAGE),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NoHolders => ApiError::NoHolders,
            other => {
                tracing::error!("Graph API error: {other}");
                ApiError::Internal
            }
        }
    }
}

#[derive(Clone)]
struct AppState {
    aggregator: StakeAggregator,
    labels: Arc<LabelRegistry>,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GraphQuery {
    policy: Option<String>,
    asset: Option<String>,
}

fn is_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_policy_id(s: &str) -> bool {
    s.len() == 56 && is_hex(s)
}

fn is_asset_name(s: &str) -> bool {
    s.len() <= 64 && is_hex(s)
}

async fn health() -> &'static str {
    "ok"
}

async fn graph_handler(
    State(state): State<AppState>,
    Query(q): Query<GraphQuery>,
) -> Result<Json<GraphResponse>, ApiError> {
    let policy = q
        .policy
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::BadRequest("Policy ID is required"))?;
    if !is_policy_id(&policy) {
        return Err(ApiError::BadRequest(
            "Invalid policy ID format. Must be 56 hex characters.",
        ));
    }

    let asset = q.asset.unwrap_or_default();
    if !is_asset_name(&asset) {
        return Err(ApiError::BadRequest(
            "Invalid asset name format. Must be hex, at most 64 characters.",
        ));
    }

    // Dropping this future (client disconnect or timeout) cancels the pipeline.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = tokio::time::timeout(
        state.request_timeout,
        assemble_graph(&state.aggregator, &policy, &asset, &cancel),
    )
    .await;

    let response = match outcome {
        Ok(result) => result?,
        Err(_) => {
            tracing::warn!("Graph request for policy {policy} timed out after {:?}", state.request_timeout);
            return Err(PipelineError::Cancelled.into());
        }
    };

    Ok(Json(response))
}

#[derive(Serialize)]
struct LabelView<'a> {
    key: &'a str,
    #[serde(flatten)]
    label: &'a WalletLabel,
}

async fn labels_handler(State(state): State<AppState>) -> Response {
    let entries: Vec<LabelView> = state
        .labels
        .entries()
        .into_iter()
        .map(|(key, label)| LabelView { key, label })
        .collect();

    Json(entries).into_response()
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/graph", get(graph_handler))
        .route("/labels", get(labels_handler))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = NebulaConfig::from_env()?;
    tracing::info!("Starting nebula API with config: {:?}", config.runtime);
    tracing::debug!("Indexer config: {:?}", config.indexer);

    if config.indexer.project_id.is_empty() {
        tracing::warn!("No indexer project_id configured; requests will likely be rejected upstream");
    }

    let labels = Arc::new(
        LabelRegistry::builtin()
            .clone()
            .with_extra(&config.labels.extra),
    );
    tracing::info!("Loaded {} wallet labels", labels.entries().len());

    let indexer = Arc::new(BlockfrostClient::new(config.indexer.clone())?);
    let aggregator = StakeAggregator::new(indexer, labels.clone(), config.aggregator.clone());

    let state = AppState {
        aggregator,
        labels,
        request_timeout: config.api.request_timeout(),
    };

    let app = router(state);

    let addr: SocketAddr = config.api.bind_addr.parse()?;
    tracing::info!("Starting API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
