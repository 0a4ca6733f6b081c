//! In-memory stand-ins for the backend and the UI.
//!
//! These are used by tests, and are handy to try the engine without a running backend.

use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::classifier::{Buckets, RenderFlags};
use crate::error::SyncError;
use crate::mock_behaviour::MockBehaviour;
use crate::task::{Snapshot, Task, TaskCollection, TaskId};
use crate::traits::{AffordanceState, Presenter, TaskBackend};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}


/// A call received by a [`MockBackend`]
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    FetchSnapshot,
    ParseAndPlan(String),
    SyncAll(String),
    DeleteTask(TaskId),
    Clarify { id: TaskId, question: String, answer: String },
}

/// A backend that keeps its tasks in memory, and applies mutations as soon as it accepts them
///
/// * `parse_and_plan` adds an unscheduled task titled after the text
/// * `sync_all` adds the tasks set by [`Self::set_calendar_tasks`]
/// * `clarify` clears the pending questions of a task
/// * `delete_task` removes a task (unknown IDs are not an error)
#[derive(Debug, Default)]
pub struct MockBackend {
    tasks: Mutex<TaskCollection>,
    calendar_tasks: Mutex<TaskCollection>,
    behaviour: Mutex<MockBehaviour>,
    latency: Mutex<Option<Duration>>,

    calls: Mutex<Vec<BackendCall>>,
    fetch_count: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: TaskCollection) -> Self {
        let backend = Self::default();
        backend.set_server_tasks(tasks);
        backend
    }

    pub fn set_server_tasks(&self, tasks: TaskCollection) {
        *lock(&self.tasks) = tasks;
    }
    pub fn server_tasks(&self) -> TaskCollection {
        lock(&self.tasks).clone()
    }

    /// The tasks a full sync will ingest
    pub fn set_calendar_tasks(&self, tasks: TaskCollection) {
        *lock(&self.calendar_tasks) = tasks;
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        *lock(&self.behaviour) = behaviour;
    }

    /// Make every call sleep for this long before being handled
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    /// How many calls were made, snapshot fetches excluded
    pub fn mutation_count(&self) -> usize {
        lock(&self.calls).iter().filter(|c| **c != BackendCall::FetchSnapshot).count()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        lock(&self.calls).iter().filter(|c| matches!(c, BackendCall::DeleteTask(_))).count()
    }

    async fn handle(&self, call: BackendCall) {
        lock(&self.calls).push(call);
        let latency = *lock(&self.latency);
        match latency {
            Some(duration) => tokio::time::sleep(duration).await,
            // Still give other tasks a chance to run, like a real network call would
            None => tokio::task::yield_now().await,
        }
    }
}

#[async_trait]
impl TaskBackend for MockBackend {
    async fn fetch_snapshot(&self) -> Result<Snapshot, SyncError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.handle(BackendCall::FetchSnapshot).await;
        lock(&self.behaviour).can_fetch_snapshot()?;
        Ok(Snapshot{ tasks: self.server_tasks() })
    }

    async fn parse_and_plan(&self, text: &str) -> Result<(), SyncError> {
        self.handle(BackendCall::ParseAndPlan(text.to_string())).await;
        lock(&self.behaviour).can_parse_and_plan()?;
        lock(&self.tasks).push(Task::new(text.to_string()));
        Ok(())
    }

    async fn sync_all(&self, source_url: &str) -> Result<(), SyncError> {
        self.handle(BackendCall::SyncAll(source_url.to_string())).await;
        lock(&self.behaviour).can_sync_all()?;
        let ingested = lock(&self.calendar_tasks).clone();
        let mut tasks = lock(&self.tasks);
        for task in ingested {
            if tasks.iter().all(|t| t.id() != task.id()) {
                tasks.push(task);
            }
        }
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), SyncError> {
        self.handle(BackendCall::DeleteTask(id.clone())).await;
        lock(&self.behaviour).can_delete_task()?;
        lock(&self.tasks).retain(|t| t.id() != id);
        Ok(())
    }

    async fn clarify(&self, id: &TaskId, question: &str, answer: &str) -> Result<(), SyncError> {
        self.handle(BackendCall::Clarify{ id: id.clone(), question: question.to_string(), answer: answer.to_string() }).await;
        lock(&self.behaviour).can_clarify()?;
        let mut tasks = lock(&self.tasks);
        for task in tasks.iter_mut() {
            if task.id() == id {
                *task = Task::new_with_parameters(
                    task.id().clone(), task.title().to_string(),
                    task.due_date().cloned(), Some(task.duration()),
                    task.plan_day(), Vec::new(), task.is_external());
            }
        }
        Ok(())
    }
}



/// Something a [`RecordingPresenter`] has been asked to do
#[derive(Clone, Debug, PartialEq)]
pub enum PresenterEvent {
    Render { buckets: Buckets, flags: RenderFlags },
    Status(String),
    Alert(String),
    Affordances(AffordanceState),
}

/// A presenter that only remembers what it was told
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<PresenterEvent>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PresenterEvent> {
        lock(&self.events).clone()
    }

    pub fn render_count(&self) -> usize {
        lock(&self.events).iter().filter(|e| matches!(e, PresenterEvent::Render{..})).count()
    }

    /// The buckets of the last render
    pub fn last_buckets(&self) -> Option<Buckets> {
        lock(&self.events).iter().rev().find_map(|e| match e {
            PresenterEvent::Render{ buckets, .. } => Some(buckets.clone()),
            _ => None,
        })
    }

    pub fn last_flags(&self) -> Option<RenderFlags> {
        lock(&self.events).iter().rev().find_map(|e| match e {
            PresenterEvent::Render{ flags, .. } => Some(*flags),
            _ => None,
        })
    }

    pub fn last_status(&self) -> Option<String> {
        lock(&self.events).iter().rev().find_map(|e| match e {
            PresenterEvent::Status(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn alerts(&self) -> Vec<String> {
        lock(&self.events).iter().filter_map(|e| match e {
            PresenterEvent::Alert(s) => Some(s.clone()),
            _ => None,
        }).collect()
    }

    pub fn affordance_history(&self) -> Vec<AffordanceState> {
        lock(&self.events).iter().filter_map(|e| match e {
            PresenterEvent::Affordances(a) => Some(*a),
            _ => None,
        }).collect()
    }

    /// The affordances as they currently are (idle if never changed)
    pub fn current_affordances(&self) -> AffordanceState {
        self.affordance_history().last().copied().unwrap_or_default()
    }
}

impl Presenter for RecordingPresenter {
    fn render(&self, buckets: &Buckets, flags: RenderFlags) {
        lock(&self.events).push(PresenterEvent::Render{ buckets: buckets.clone(), flags });
    }
    fn show_status(&self, text: &str) {
        lock(&self.events).push(PresenterEvent::Status(text.to_string()));
    }
    fn alert(&self, text: &str) {
        lock(&self.events).push(PresenterEvent::Alert(text.to_string()));
    }
    fn set_affordances(&self, state: AffordanceState) {
        lock(&self.events).push(PresenterEvent::Affordances(state));
    }
}
