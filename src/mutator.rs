//! Local-first mutations, reconciled with the backend afterwards

use std::sync::Arc;

use crate::store::{RefreshOutcome, TaskStore};
use crate::task::TaskId;
use crate::traits::{Presenter, TaskBackend};

/// What happened to a deletion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The task comes from an ingested calendar: it was only hidden locally, and will be back after the next full refresh
    LocalOnly,
    /// The backend deleted the task as well
    Propagated,
    /// The backend refused the deletion. A refresh was issued to get back to the backend state
    Reconciled(RefreshOutcome),
}

/// Applies mutations locally before telling the backend.
///
/// There is no "pending" shadow state: when the backend disagrees, the backend snapshot wins.
pub struct OptimisticMutator<B, P>
where
    B: TaskBackend,
    P: Presenter,
{
    store: Arc<TaskStore<B, P>>,
}

impl<B, P> OptimisticMutator<B, P>
where
    B: TaskBackend,
    P: Presenter,
{
    pub fn new(store: Arc<TaskStore<B, P>>) -> Self {
        Self { store }
    }

    /// Delete a task.
    ///
    /// It is removed from the local collection (and the board redrawn) at once, before any network call.
    /// External tasks are not deleted on the backend at all.
    /// Other tasks are deleted on the backend. If that fails, the task is not put back by hand: a full refresh re-derives the truth.
    pub async fn delete_task(&self, id: &TaskId, is_external: bool) -> DeleteOutcome {
        if self.store.remove_local(id).is_none() {
            log::debug!("Task {} was not in the local collection", id);
        }

        if is_external {
            log::info!("Task {} comes from an external calendar, hiding it locally only", id);
            return DeleteOutcome::LocalOnly;
        }

        match self.store.backend().delete_task(id).await {
            Ok(()) => {
                log::debug!("Task {} deleted on the backend", id);
                DeleteOutcome::Propagated
            },
            Err(err) => {
                log::warn!("Unable to delete task {} on the backend ({}), reconciling with a refresh", id, err);
                DeleteOutcome::Reconciled(self.store.refresh().await)
            },
        }
    }
}
