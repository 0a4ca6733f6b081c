//! The single, authoritative in-memory copy of the tasks

use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::classifier::{self, Buckets, RenderFlags};
use crate::task::{Task, TaskCollection, TaskId};
use crate::traits::{Presenter, TaskBackend};

/// The input placeholder, when nothing is going on
pub const IDLE_STATUS: &str = "Tell me what you need to get done...";
/// Shown when a refresh could not reach the backend
pub const REFRESH_FAILED_STATUS: &str = "Could not load tasks from the server. Try again later.";


/// What happened to a call to [`TaskStore::refresh`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot replaced the collection
    Refreshed,
    /// Another refresh was already running. Nothing was fetched, and the caller may not see the state it expects
    Skipped,
    /// The backend could not be reached. The collection is untouched
    Failed,
}


/// Ephemeral facts about the current session
#[derive(Debug, Default)]
pub struct SyncSession {
    has_synced: AtomicBool,
}

impl SyncSession {
    /// Whether a full sync has completed at least once
    pub fn has_synced(&self) -> bool {
        self.has_synced.load(Ordering::SeqCst)
    }

    fn mark_synced(&self) {
        self.has_synced.store(true, Ordering::SeqCst);
    }
}


/// Owns the task collection, and is the only one allowed to write it.
///
/// The collection is only ever replaced wholesale by [`Self::refresh`], or shrunk by [`Self::remove_local`].
/// Every change is followed by a full re-render.
pub struct TaskStore<B, P>
where
    B: TaskBackend,
    P: Presenter,
{
    backend: Arc<B>,
    presenter: Arc<P>,

    tasks: Mutex<TaskCollection>,
    refresh_in_flight: AtomicBool,
    /// Whether the status text currently tells a refresh failed
    failure_shown: AtomicBool,
    session: SyncSession,
}

/// Clears the in-flight flag, whatever way the refresh ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> Drop for InFlightGuard<'a> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<B, P> TaskStore<B, P>
where
    B: TaskBackend,
    P: Presenter,
{
    /// Create an empty store. Nothing is fetched until [`Self::refresh`] is called
    pub fn new(backend: Arc<B>, presenter: Arc<P>) -> Self {
        Self {
            backend, presenter,
            tasks: Mutex::new(TaskCollection::new()),
            refresh_in_flight: AtomicBool::new(false),
            failure_shown: AtomicBool::new(false),
            session: SyncSession::default(),
        }
    }

    pub fn backend(&self) -> &Arc<B> { &self.backend }
    pub fn presenter(&self) -> &Arc<P> { &self.presenter }
    pub fn session(&self) -> &SyncSession { &self.session }

    pub fn has_synced(&self) -> bool {
        self.session.has_synced()
    }

    /// Record that a full sync has completed, and redraw (the empty-inbox text depends on it)
    pub(crate) fn mark_synced(&self) {
        self.session.mark_synced();
        self.render();
    }

    /// A copy of the current collection
    pub fn tasks(&self) -> TaskCollection {
        self.lock_tasks().clone()
    }

    pub fn get(&self, id: &TaskId) -> Option<Task> {
        self.lock_tasks().iter().find(|t| t.id() == id).cloned()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_in_flight.load(Ordering::SeqCst)
    }

    fn lock_tasks(&self) -> MutexGuard<'_, TaskCollection> {
        match self.tasks.lock() {
            Ok(guard) => guard,
            // The collection is only ever assigned as a whole, it cannot be left half-written
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Fetch the current snapshot from the backend and replace the whole collection with it.
    ///
    /// This is debounced rather than queued: if a refresh is already in flight, this returns [`RefreshOutcome::Skipped`] at once.
    /// Failures never propagate. They leave the collection as it was, and show a status text to the user.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self.refresh_in_flight.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            log::debug!("A refresh is already in flight, skipping this one");
            return RefreshOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.refresh_in_flight);

        match self.backend.fetch_snapshot().await {
            Err(err) => {
                log::warn!("Unable to refresh tasks: {}", err);
                self.presenter.show_status(REFRESH_FAILED_STATUS);
                self.failure_shown.store(true, Ordering::SeqCst);
                RefreshOutcome::Failed
            },
            Ok(snapshot) => {
                log::debug!("Replacing the task collection with {} tasks", snapshot.tasks.len());
                *self.lock_tasks() = snapshot.tasks;
                self.render();
                if self.failure_shown.swap(false, Ordering::SeqCst) {
                    self.presenter.show_status(IDLE_STATUS);
                }
                RefreshOutcome::Refreshed
            },
        }
    }

    /// Display a status text. It replaces any refresh failure text, which will then not be cleared by the next refresh
    pub(crate) fn show_status(&self, text: &str) {
        self.failure_shown.store(false, Ordering::SeqCst);
        self.presenter.show_status(text);
    }

    /// Drop a task from the local collection, without telling the backend. Returns the removed task, if any
    pub(crate) fn remove_local(&self, id: &TaskId) -> Option<Task> {
        let removed = {
            let mut tasks = self.lock_tasks();
            let position = tasks.iter().position(|t| t.id() == id);
            position.map(|pos| tasks.remove(pos))
        };
        if removed.is_some() {
            self.render();
        }
        removed
    }

    /// Classify the current collection
    pub fn classify(&self) -> (Buckets, RenderFlags) {
        let buckets = classifier::classify(&self.lock_tasks());
        let flags = classifier::render_flags(&buckets, self.has_synced());
        (buckets, flags)
    }

    /// Redraw everything from the current collection
    pub fn render(&self) {
        let (buckets, flags) = self.classify();
        self.presenter.render(&buckets, flags);
    }
}
