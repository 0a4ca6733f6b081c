//! The seams between the sync engine and its collaborators

use async_trait::async_trait;

use crate::classifier::{Buckets, RenderFlags};
use crate::error::SyncError;
use crate::orchestrator::WorkflowHandle;
use crate::task::{Snapshot, TaskId};

/// The backend HTTP contract, as seen from the client.
///
/// Every mutation only tells whether the backend accepted it. Its effects are to be observed later, by fetching a new snapshot.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Returns the current task snapshot
    async fn fetch_snapshot(&self) -> Result<Snapshot, SyncError>;
    /// Ask the agent to interpret and plan some free text
    async fn parse_and_plan(&self, text: &str) -> Result<(), SyncError>;
    /// Start a full sync, ingesting the calendar at `source_url`
    async fn sync_all(&self, source_url: &str) -> Result<(), SyncError>;
    async fn delete_task(&self, id: &TaskId) -> Result<(), SyncError>;
    /// Answer a pending question of a task
    async fn clarify(&self, id: &TaskId, question: &str, answer: &str) -> Result<(), SyncError>;
}


/// Whether the user can currently use the text input and the sync button
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AffordanceState {
    /// Text input and its submit button
    pub input_enabled: bool,
    /// The full-sync button shows a busy label
    pub sync_busy: bool,
}

impl AffordanceState {
    pub fn idle() -> Self {
        Self { input_enabled: true, sync_busy: false }
    }
}

impl Default for AffordanceState {
    fn default() -> Self {
        Self::idle()
    }
}


/// Whatever displays the tasks to the user.
///
/// Implementors only draw what they are told to. User intents are sent back to the
/// [`SyncOrchestrator`](crate::orchestrator::SyncOrchestrator) and the [`OptimisticMutator`](crate::mutator::OptimisticMutator).
pub trait Presenter: Send + Sync {
    /// Draw the whole board
    fn render(&self, buckets: &Buckets, flags: RenderFlags);
    /// Display a status text in the input placeholder (e.g. "Agent is working...", or an error)
    fn show_status(&self, text: &str);
    /// Tell the user that their input is not acceptable
    fn alert(&self, text: &str);
    fn set_affordances(&self, state: AffordanceState);
}


/// How a workflow waits for the backend to be done with a mutation it has accepted
#[async_trait]
pub trait AwaitCompletion: Send + Sync {
    /// Returns once the mutation described by `handle` is believed to be applied on the backend.
    ///
    /// This never fails: in the worst case, the next refresh shows a state that is not updated yet.
    async fn await_completion(&self, handle: &WorkflowHandle);

    /// Whether [`WorkflowHandle::baseline`] must be what the backend had right before the mutation.
    /// When this is false, the local collection is good enough
    fn needs_backend_baseline(&self) -> bool {
        false
    }
}
