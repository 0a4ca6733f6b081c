//! Ways to wait for the backend to apply a mutation it has accepted

use std::cmp::min;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::CompletionConfig;
use crate::orchestrator::WorkflowHandle;
use crate::traits::{AwaitCompletion, TaskBackend};

/// Sleep for the expected duration of the workflow.
///
/// This is deterministic, which makes it the strategy of choice for tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedDelay;

#[async_trait]
impl AwaitCompletion for FixedDelay {
    async fn await_completion(&self, handle: &WorkflowHandle) {
        log::debug!("Waiting {:?} for the {} to complete", handle.wait(), handle.kind());
        tokio::time::sleep(handle.wait()).await;
    }
}


/// Poll the backend until its snapshot differs from the one before the mutation.
///
/// The baseline is what the backend had before the mutation, not the local collection: tasks removed locally only would look like a change.
///
/// Delays double between polls, up to `max_delay`. After `max_attempts` polls, this gives up silently.
#[derive(Debug)]
pub struct BackoffPolling<B: TaskBackend> {
    backend: Arc<B>,
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
}

impl<B: TaskBackend> BackoffPolling<B> {
    pub fn new(backend: Arc<B>, initial_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self { backend, initial_delay, max_delay, max_attempts }
    }
}

#[async_trait]
impl<B: TaskBackend> AwaitCompletion for BackoffPolling<B> {
    async fn await_completion(&self, handle: &WorkflowHandle) {
        let mut delay = self.initial_delay;

        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(delay).await;

            match self.backend.fetch_snapshot().await {
                Err(err) => log::debug!("Poll #{} for the {} failed: {}", attempt, handle.kind(), err),
                Ok(snapshot) => {
                    if &snapshot.tasks != handle.baseline() {
                        log::debug!("The {} completed after {} polls", handle.kind(), attempt);
                        return;
                    }
                    log::trace!("Poll #{} for the {}: nothing changed yet", attempt, handle.kind());
                },
            }

            delay = min(delay * 2, self.max_delay);
        }

        log::info!("The {} did not visibly complete after {} polls", handle.kind(), self.max_attempts);
    }

    fn needs_backend_baseline(&self) -> bool {
        true
    }
}


/// Build the completion strategy a config asks for
pub fn from_config<B>(config: &CompletionConfig, backend: Arc<B>) -> Arc<dyn AwaitCompletion>
where
    B: TaskBackend + 'static,
{
    match config {
        CompletionConfig::FixedDelay => Arc::new(FixedDelay),
        CompletionConfig::BackoffPolling{ initial_delay_ms, max_delay_ms, max_attempts } => {
            Arc::new(BackoffPolling::new(
                backend,
                Duration::from_millis(*initial_delay_ms),
                Duration::from_millis(*max_delay_ms),
                *max_attempts,
            ))
        },
    }
}
