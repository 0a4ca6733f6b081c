//! This crate keeps a task-planning client in sync with its backend.
//!
//! The backend owns the tasks: it interprets free text with an agent, ingests calendars, and plans tasks for today or tomorrow.
//! It does all of this out-of-band, so the client only ever learns about changes by fetching a full snapshot again.
//!
//! * a [`TaskStore`](store::TaskStore) owns the single in-memory copy of the tasks, and refreshes it wholesale
//! * the [`classifier`] sorts tasks into the buckets the user sees
//! * a [`SyncOrchestrator`](orchestrator::SyncOrchestrator) runs the "submit, wait, refresh" workflows the user triggers
//! * an [`OptimisticMutator`](mutator::OptimisticMutator) deletes tasks locally first, and reconciles with the backend afterwards
//!
//! The backend and the UI are only seen through the [`TaskBackend`](traits::TaskBackend) and [`Presenter`](traits::Presenter) traits.
//! [`client::Client`] is the HTTP implementation of the former.

pub mod traits;

pub mod task;
pub use task::{PlanDay, Snapshot, Task, TaskCollection, TaskId};
pub mod error;
pub use error::SyncError;

pub mod classifier;
pub mod store;
pub use store::TaskStore;
pub mod mutator;
pub mod orchestrator;
pub use orchestrator::SyncOrchestrator;
pub mod validation;
pub mod view;

pub mod client;
pub mod config;

pub mod mock;
pub mod mock_behaviour;
pub mod utils;

/// A [`SyncOrchestrator`] that talks to the real backend
pub type HttpOrchestrator<P> = SyncOrchestrator<client::Client, P>;
