//! This module drives the workflows the user triggers against the backend.
//!
//! Every workflow has the same shape: submit a mutation, wait for the backend to apply it out-of-band, then refresh the whole task collection.
//! Nothing is retried: when the backend refuses a mutation, the user is told so and can trigger it again.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::mutator::{DeleteOutcome, OptimisticMutator};
use crate::store::{RefreshOutcome, TaskStore};
use crate::task::{TaskCollection, TaskId};
use crate::traits::{AwaitCompletion, Presenter, TaskBackend};
use crate::validation;

pub mod completion;
pub mod workflow;
pub use workflow::{WorkflowEvent, WorkflowHandle, WorkflowKind, WorkflowState};
use workflow::{AffordanceLock, FeedbackSender, WorkflowStates};

pub use crate::store::IDLE_STATUS;
/// Alerted when text is submitted before any full sync
pub const NOT_SYNCED_ALERT: &str = "Please run a full sync first, so that the agent knows your calendar.";


// I am too lazy to make `run_workflow` generic over an async closure.
// Let's work around by passing an enum, so that `run_workflow` will know what to submit
enum Mutation<'a> {
    ParseAndPlan { text: &'a str },
    SyncAll { source_url: &'a str },
    Clarify { id: &'a TaskId, question: &'a str, answer: &'a str },
}

impl<'a> Mutation<'a> {
    fn kind(&self) -> WorkflowKind {
        match self {
            Mutation::ParseAndPlan{..} => WorkflowKind::AgentDispatch,
            Mutation::SyncAll{..} => WorkflowKind::FullSync,
            Mutation::Clarify{..} => WorkflowKind::Clarification,
        }
    }
}

impl<'a> Display for Mutation<'a> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Mutation::ParseAndPlan{ text } => write!(f, "parse and plan {:?}", text),
            Mutation::SyncAll{ source_url } => write!(f, "sync all from {}", source_url),
            Mutation::Clarify{ id, question, .. } => write!(f, "answer {:?} for task {}", question, id),
        }
    }
}


/// How a workflow ended, when it was not rejected locally
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// The backend accepted the mutation. This tells what the final refresh did
    Completed(RefreshOutcome),
    /// The backend refused the mutation, or could not be reached. Nothing was refreshed
    SubmitFailed,
}


/// Turns user intents into backend mutations, and makes sure their effects are eventually displayed.
///
/// Workflows of different kinds may run concurrently. No guarantee is made about the order they complete in:
/// whichever refresh completes last defines what is displayed.
pub struct SyncOrchestrator<B, P>
where
    B: TaskBackend,
    P: Presenter,
{
    store: Arc<TaskStore<B, P>>,
    mutator: OptimisticMutator<B, P>,
    config: SyncConfig,
    completion: Arc<dyn AwaitCompletion>,

    workflows: WorkflowStates,
    affordances: AffordanceLock,
    feedback_channel: Option<FeedbackSender>,
}

impl<B, P> SyncOrchestrator<B, P>
where
    B: TaskBackend + 'static,
    P: Presenter,
{
    /// Create an orchestrator, using the completion strategy `config` asks for
    pub fn new(store: Arc<TaskStore<B, P>>, config: SyncConfig) -> Self {
        let completion = completion::from_config(&config.completion, store.backend().clone());
        Self::new_with_completion(store, config, completion)
    }
}

impl<B, P> SyncOrchestrator<B, P>
where
    B: TaskBackend,
    P: Presenter,
{
    pub fn new_with_completion(store: Arc<TaskStore<B, P>>, config: SyncConfig, completion: Arc<dyn AwaitCompletion>) -> Self {
        Self {
            mutator: OptimisticMutator::new(store.clone()),
            store, config, completion,
            workflows: WorkflowStates::new(),
            affordances: AffordanceLock::new(),
            feedback_channel: None,
        }
    }

    /// Publish the progress of every workflow to this channel
    pub fn with_feedback_channel(mut self, channel: FeedbackSender) -> Self {
        self.feedback_channel = Some(channel);
        self
    }

    pub fn store(&self) -> &Arc<TaskStore<B, P>> { &self.store }
    pub fn config(&self) -> &SyncConfig { &self.config }

    pub fn workflow_state(&self, kind: WorkflowKind) -> WorkflowState {
        self.workflows.state(kind)
    }

    fn feedback(&self, event: WorkflowEvent) {
        self.feedback_channel
            .as_ref()
            .map(|sender| {
                sender.send(event)
            });
    }

    fn presenter(&self) -> &P {
        self.store.presenter()
    }

    /// Show the initial state of the board, before anything is fetched
    pub fn start(&self) {
        self.presenter().set_affordances(self.affordances.state());
        self.store.show_status(IDLE_STATUS);
        self.store.render();
    }

    /// Ask the agent to interpret `text` and plan the tasks it describes.
    ///
    /// This is refused locally until a full sync has completed once.
    pub async fn submit_text(&self, text: &str) -> Result<WorkflowOutcome, SyncError> {
        if self.store.has_synced() == false {
            log::info!("Refusing to submit text before the first full sync");
            self.presenter().alert(NOT_SYNCED_ALERT);
            return Err(SyncError::NotSynced);
        }
        let text = text.trim();
        if text.is_empty() {
            let err = SyncError::EmptyText;
            self.presenter().alert(&err.to_string());
            return Err(err);
        }

        self.run_workflow(Mutation::ParseAndPlan{ text }).await
    }

    /// Ingest the calendar at `source_url` along with the backend tasks. Once done, text submission is allowed
    pub async fn run_full_sync(&self, source_url: &str) -> Result<WorkflowOutcome, SyncError> {
        self.run_workflow(Mutation::SyncAll{ source_url }).await
    }

    /// Answer the pending `question` of a task.
    ///
    /// Answers to questions about an email must look like an email, or they are refused locally.
    pub async fn answer_clarification(&self, id: &TaskId, question: &str, answer: &str) -> Result<WorkflowOutcome, SyncError> {
        if let Err(err) = validation::validate_answer(question, answer) {
            log::info!("Refusing answer for task {}: {}", id, err);
            self.presenter().alert(&err.to_string());
            return Err(err);
        }

        self.run_workflow(Mutation::Clarify{ id, question, answer }).await
    }

    /// Delete a task. See [`OptimisticMutator::delete_task`]
    pub async fn delete_task(&self, id: &TaskId, is_external: bool) -> DeleteOutcome {
        self.mutator.delete_task(id, is_external).await
    }

    async fn submit(&self, mutation: &Mutation<'_>) -> Result<(), SyncError> {
        let backend = self.store.backend();
        match mutation {
            Mutation::ParseAndPlan{ text } => backend.parse_and_plan(text).await,
            Mutation::SyncAll{ source_url } => backend.sync_all(source_url).await,
            Mutation::Clarify{ id, question, answer } => backend.clarify(id, question, answer).await,
        }
    }

    /// What the completion strategy compares the backend state against
    async fn baseline(&self) -> TaskCollection {
        if self.completion.needs_backend_baseline() == false {
            return self.store.tasks();
        }
        match self.store.backend().fetch_snapshot().await {
            Ok(snapshot) => snapshot.tasks,
            Err(err) => {
                log::warn!("Unable to fetch the state before the mutation, comparing with the local tasks instead: {}", err);
                self.store.tasks()
            },
        }
    }

    fn wait_for(&self, kind: WorkflowKind) -> std::time::Duration {
        match kind {
            WorkflowKind::AgentDispatch => self.config.agent_wait(),
            WorkflowKind::FullSync => self.config.full_sync_wait(),
            WorkflowKind::Clarification => self.config.clarify_wait(),
        }
    }

    async fn run_workflow(&self, mutation: Mutation<'_>) -> Result<WorkflowOutcome, SyncError> {
        let kind = mutation.kind();
        let ticket = match self.workflows.try_begin(kind) {
            Ok(ticket) => ticket,
            Err(err) => {
                log::warn!("Not starting a {}: {}", kind, err);
                self.presenter().alert(&err.to_string());
                return Err(err);
            }
        };
        // Released whatever way this function returns
        let _affordances = self.affordances.acquire(self.presenter(), kind == WorkflowKind::FullSync);

        log::info!("Starting workflow: {}", mutation);
        self.feedback(WorkflowEvent::Submitting{ kind });
        self.store.show_status(kind.busy_status());

        let handle = WorkflowHandle::new(kind, self.baseline().await, self.wait_for(kind));

        if let Err(err) = self.submit(&mutation).await {
            log::error!("Unable to {}: {}", mutation, err);
            self.store.show_status(kind.failure_status());
            self.feedback(WorkflowEvent::Finished{ kind, success: false });
            return Ok(WorkflowOutcome::SubmitFailed);
        }

        ticket.cool_down();
        self.feedback(WorkflowEvent::Waiting{ kind });
        self.completion.await_completion(&handle).await;

        if kind == WorkflowKind::FullSync {
            self.store.mark_synced();
        }

        self.feedback(WorkflowEvent::Refreshing{ kind });
        let refresh = self.store.refresh().await;
        if refresh != RefreshOutcome::Failed {
            // A failed refresh leaves its own status text
            self.store.show_status(IDLE_STATUS);
        }

        log::info!("Workflow {} done (refresh: {:?})", kind, refresh);
        self.feedback(WorkflowEvent::Finished{ kind, success: refresh != RefreshOutcome::Failed });
        Ok(WorkflowOutcome::Completed(refresh))
    }
}
