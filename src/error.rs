//! Errors raised by the sync engine

use crate::orchestrator::WorkflowKind;

/// Everything that can go wrong while talking to the backend, or before even trying to.
///
/// `Transport`, `Status` and `Decode` are transport failures: they are logged and turned into a
/// status text for the user, but never bubble up as faults.
/// `NotSynced`, `EmptyText`, `InvalidEmail` and `WorkflowBusy` are validation failures: they abort a workflow
/// before any network call is made.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{operation} failed to reach the backend: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} returned unexpected HTTP status {status}")]
    Status {
        operation: &'static str,
        status: u16,
    },
    #[error("unable to decode the task snapshot: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },
    #[error("a full sync must complete before tasks can be added")]
    NotSynced,
    #[error("there is nothing to send")]
    EmptyText,
    #[error("{answer:?} is not a valid email address")]
    InvalidEmail { answer: String },
    #[error("a {kind} workflow is already running")]
    WorkflowBusy { kind: WorkflowKind },
    /// Failures that do not come from a real HTTP stack (e.g. mocked backends)
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Whether this error comes from a local precondition check
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::NotSynced | SyncError::EmptyText | SyncError::InvalidEmail{..} | SyncError::WorkflowBusy{..})
    }

    /// Whether this error comes from the network or the backend
    pub fn is_transport(&self) -> bool {
        self.is_validation() == false
    }
}

impl From<String> for SyncError {
    fn from(s: String) -> Self {
        SyncError::Other(s)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy() {
        assert!(SyncError::NotSynced.is_validation());
        assert!(SyncError::InvalidEmail{ answer: "nope".to_string() }.is_validation());
        assert!(SyncError::WorkflowBusy{ kind: WorkflowKind::FullSync }.is_validation());
        assert!(SyncError::Status{ operation: "delete_task", status: 500 }.is_transport());
        assert!(SyncError::from("mocked".to_string()).is_transport());
    }

    #[test]
    fn messages() {
        let err = SyncError::Status{ operation: "sync_all", status: 502 };
        assert_eq!(err.to_string(), "sync_all returned unexpected HTTP status 502");
        let err = SyncError::InvalidEmail{ answer: "bob".to_string() };
        assert_eq!(err.to_string(), "\"bob\" is not a valid email address");
    }
}
