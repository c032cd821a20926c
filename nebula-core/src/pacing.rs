use crate::error::{PipelineError, PipelineResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fixed-interval pacing for sequential indexer loops: pause after every
/// `every`-th item (never after the first one).
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    every: usize,
    pause: Duration,
}

impl Pacer {
    pub fn new(every: usize, pause: Duration) -> Self {
        Self { every, pause }
    }

    pub fn should_pause(&self, index: usize) -> bool {
        self.every > 0 && !self.pause.is_zero() && index > 0 && index % self.every == 0
    }

    /// Called once item `index` has been processed.
    pub async fn after(&self, index: usize, cancel: &CancellationToken) -> PipelineResult<()> {
        if !self.should_pause(index) {
            return Ok(());
        }
        cancellable(cancel, tokio::time::sleep(self.pause)).await
    }
}

/// Races `fut` against `cancel`; a cancelled token always wins.
pub async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> PipelineResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        out = fut => Ok(out),
    }
}
