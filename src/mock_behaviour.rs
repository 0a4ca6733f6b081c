//! This module provides ways to tweak mocked backends, so that they can return errors on some tests

use crate::error::SyncError;

/// This stores some behaviour tweaks, that describe how a mocked instance will behave during a given test
///
/// So that a functions fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,

    pub fetch_snapshot_behaviour: (u32, u32),
    pub parse_and_plan_behaviour: (u32, u32),
    pub sync_all_behaviour: (u32, u32),
    pub delete_task_behaviour: (u32, u32),
    pub clarify_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            fetch_snapshot_behaviour: (0, n_fails),
            parse_and_plan_behaviour: (0, n_fails),
            sync_all_behaviour: (0, n_fails),
            delete_task_behaviour: (0, n_fails),
            clarify_behaviour: (0, n_fails),
        }
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    pub fn can_fetch_snapshot(&mut self) -> Result<(), SyncError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.fetch_snapshot_behaviour, "fetch_snapshot")
    }
    pub fn can_parse_and_plan(&mut self) -> Result<(), SyncError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.parse_and_plan_behaviour, "parse_and_plan")
    }
    pub fn can_sync_all(&mut self) -> Result<(), SyncError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.sync_all_behaviour, "sync_all")
    }
    pub fn can_delete_task(&mut self) -> Result<(), SyncError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.delete_task_behaviour, "delete_task")
    }
    pub fn can_clarify(&mut self) -> Result<(), SyncError> {
        if self.is_suspended { return Ok(()) }
        decrement(&mut self.clarify_behaviour, "clarify")
    }
}


/// Consume one scripted outcome for `operation`: successes are spent first, then failures. Once both are spent, everything succeeds
fn decrement(remaining: &mut (u32, u32), operation: &str) -> Result<(), SyncError> {
    if remaining.0 > 0 {
        remaining.0 -= 1;
    } else if remaining.1 > 0 {
        remaining.1 -= 1;
        log::debug!("Mock behaviour: {} fails, {:?} left", operation, remaining);
        return Err(format!("{} is scripted to fail ({:?} left)", operation, remaining).into());
    }
    log::debug!("Mock behaviour: {} goes through, {:?} left", operation, remaining);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mock_behaviour() {
        let mut ok = MockBehaviour::new();
        assert!(ok.can_fetch_snapshot().is_ok());
        assert!(ok.can_fetch_snapshot().is_ok());
        assert!(ok.can_delete_task().is_ok());

        let mut now = MockBehaviour::fail_now(2);
        assert!(now.can_fetch_snapshot().is_err());
        assert!(now.can_sync_all().is_err());
        assert!(now.can_sync_all().is_err());
        assert!(now.can_fetch_snapshot().is_err());
        assert!(now.can_fetch_snapshot().is_ok());
        assert!(now.can_fetch_snapshot().is_ok());
        assert!(now.can_sync_all().is_ok());

        let mut custom = MockBehaviour{
            delete_task_behaviour: (0,1),
            clarify_behaviour: (1,2),
            ..MockBehaviour::default()
        };
        assert!(custom.can_delete_task().is_err());
        assert!(custom.can_delete_task().is_ok());
        assert!(custom.can_clarify().is_ok());
        assert!(custom.can_clarify().is_err());
        assert!(custom.can_clarify().is_err());
        assert!(custom.can_clarify().is_ok());

        let mut suspended = MockBehaviour::fail_now(1);
        suspended.suspend();
        assert!(suspended.can_parse_and_plan().is_ok());
        suspended.resume();
        assert!(suspended.can_parse_and_plan().is_err());
    }

    #[test]
    fn successes_are_spent_before_failures() {
        let mut remaining = (1, 1);
        assert!(decrement(&mut remaining, "test").is_ok());
        assert!(decrement(&mut remaining, "test").is_err());
        assert_eq!(remaining, (0, 0));
        assert!(decrement(&mut remaining, "test").is_ok());
        assert_eq!(remaining, (0, 0));
    }
}
