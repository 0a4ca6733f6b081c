//! Utilities to track the progression of workflows

use std::collections::HashMap;
use std::fmt::{Display, Error, Formatter};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::SyncError;
use crate::task::TaskCollection;
use crate::traits::{AffordanceState, Presenter};

/// The three things the user can ask the backend to do
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    /// Let the agent interpret and plan some free text
    AgentDispatch,
    /// Ingest the calendar and the backend tasks
    FullSync,
    /// Answer a pending question
    Clarification,
}

impl Display for WorkflowKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            WorkflowKind::AgentDispatch => write!(f, "agent dispatch"),
            WorkflowKind::FullSync => write!(f, "full sync"),
            WorkflowKind::Clarification => write!(f, "clarification"),
        }
    }
}

impl WorkflowKind {
    /// Shown while the workflow runs
    pub fn busy_status(&self) -> &'static str {
        match self {
            WorkflowKind::AgentDispatch => "Agent is planning...",
            WorkflowKind::FullSync => "Syncing calendar and tasks...",
            WorkflowKind::Clarification => "Sending your answer...",
        }
    }

    /// Shown when the backend refused the mutation
    pub fn failure_status(&self) -> &'static str {
        match self {
            WorkflowKind::AgentDispatch => "The agent could not be reached. Try again.",
            WorkflowKind::FullSync => "Sync failed. Try again.",
            WorkflowKind::Clarification => "Your answer could not be sent. Try again.",
        }
    }
}


/// Where a workflow of a given kind currently is
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    /// The mutation is being submitted
    InFlight,
    /// The mutation has been accepted, the workflow waits for it to complete and refreshes
    CoolingDown,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::Idle
    }
}


/// An event that happens during a workflow
#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowEvent {
    /// No workflow has started yet
    Idle,
    Submitting { kind: WorkflowKind },
    /// The backend accepted the mutation, and is processing it
    Waiting { kind: WorkflowKind },
    Refreshing { kind: WorkflowKind },
    Finished { kind: WorkflowKind, success: bool },
}

impl Display for WorkflowEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            WorkflowEvent::Idle => write!(f, "Idle"),
            WorkflowEvent::Submitting{kind} => write!(f, "[{}] submitting...", kind),
            WorkflowEvent::Waiting{kind} => write!(f, "[{}] waiting for the backend...", kind),
            WorkflowEvent::Refreshing{kind} => write!(f, "[{}] refreshing...", kind),
            WorkflowEvent::Finished{kind, success} => match success {
                true => write!(f, "[{}] successfully finished", kind),
                false => write!(f, "[{}] finished with errors", kind),
            }
        }
    }
}

impl Default for WorkflowEvent {
    fn default() -> Self {
        Self::Idle
    }
}

/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<WorkflowEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<WorkflowEvent>;

/// Create a feeback channel, that can be used to retrieve the current progress of workflows
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(WorkflowEvent::default())
}


/// What a completion strategy knows about a workflow that is waiting for the backend
#[derive(Clone, Debug)]
pub struct WorkflowHandle {
    kind: WorkflowKind,
    baseline: TaskCollection,
    wait: Duration,
}

impl WorkflowHandle {
    pub fn new(kind: WorkflowKind, baseline: TaskCollection, wait: Duration) -> Self {
        Self { kind, baseline, wait }
    }

    pub fn kind(&self) -> WorkflowKind { self.kind }
    /// The tasks as they were known before the mutation was submitted
    pub fn baseline(&self) -> &TaskCollection { &self.baseline }
    /// How long this kind of workflow is expected to take on the backend
    pub fn wait(&self) -> Duration { self.wait }
}


fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// One `Idle -> InFlight -> CoolingDown -> Idle` state machine per workflow kind
#[derive(Debug, Default)]
pub struct WorkflowStates {
    states: Mutex<HashMap<WorkflowKind, WorkflowState>>,
}

impl WorkflowStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, kind: WorkflowKind) -> WorkflowState {
        lock(&self.states).get(&kind).copied().unwrap_or_default()
    }

    /// Move `kind` to `InFlight`, or fail if a workflow of this kind is already running.
    ///
    /// The returned ticket moves the state back to `Idle` when dropped.
    pub fn try_begin(&self, kind: WorkflowKind) -> Result<WorkflowTicket<'_>, SyncError> {
        let mut states = lock(&self.states);
        let state = states.entry(kind).or_default();
        if *state != WorkflowState::Idle {
            return Err(SyncError::WorkflowBusy{ kind });
        }
        *state = WorkflowState::InFlight;
        Ok(WorkflowTicket { states: self, kind })
    }

    fn set(&self, kind: WorkflowKind, new_state: WorkflowState) {
        let mut states = lock(&self.states);
        let state = states.entry(kind).or_default();
        log::trace!("Workflow {}: {:?} -> {:?}", kind, *state, new_state);
        *state = new_state;
    }
}

/// Proof that a workflow is running. See [`WorkflowStates::try_begin`]
#[derive(Debug)]
pub struct WorkflowTicket<'a> {
    states: &'a WorkflowStates,
    kind: WorkflowKind,
}

impl<'a> WorkflowTicket<'a> {
    /// The mutation has been accepted
    pub fn cool_down(&self) {
        self.states.set(self.kind, WorkflowState::CoolingDown);
    }
}

impl<'a> Drop for WorkflowTicket<'a> {
    fn drop(&mut self) {
        self.states.set(self.kind, WorkflowState::Idle);
    }
}


#[derive(Debug, Default)]
struct LockCounts {
    input: usize,
    sync: usize,
}

impl LockCounts {
    fn state(&self) -> AffordanceState {
        AffordanceState {
            input_enabled: self.input == 0,
            sync_busy: self.sync > 0,
        }
    }
}

/// Disables the input affordances for as long as at least one workflow holds them
#[derive(Debug, Default)]
pub struct AffordanceLock {
    counts: Mutex<LockCounts>,
}

impl AffordanceLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AffordanceState {
        lock(&self.counts).state()
    }

    /// Disable the text input (and flag the sync control as busy when `sync_busy` is set) until the guard is dropped
    pub fn acquire<'a>(&'a self, presenter: &'a dyn Presenter, sync_busy: bool) -> AffordanceGuard<'a> {
        let state = {
            let mut counts = lock(&self.counts);
            counts.input += 1;
            if sync_busy {
                counts.sync += 1;
            }
            counts.state()
        };
        presenter.set_affordances(state);
        AffordanceGuard { lock: self, presenter, sync_busy }
    }
}

/// See [`AffordanceLock::acquire`]
pub struct AffordanceGuard<'a> {
    lock: &'a AffordanceLock,
    presenter: &'a dyn Presenter,
    sync_busy: bool,
}

impl<'a> Drop for AffordanceGuard<'a> {
    fn drop(&mut self) {
        let state = {
            let mut counts = lock(&self.lock.counts);
            counts.input = counts.input.saturating_sub(1);
            if self.sync_busy {
                counts.sync = counts.sync.saturating_sub(1);
            }
            counts.state()
        };
        self.presenter.set_affordances(state);
    }
}
