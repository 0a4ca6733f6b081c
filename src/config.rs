//! Support for library configuration options

use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

/// The `User-Agent` sent to the backend.
/// Feel free to override it when initing this library.
pub static USER_AGENT: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new(format!("taskboard-sync/{}", env!("CARGO_PKG_VERSION")))));

pub const ENV_BASE_URL: &str = "TASKBOARD_BASE_URL";
pub const ENV_CALENDAR_URL: &str = "TASKBOARD_CALENDAR_URL";
pub const ENV_COMPLETION: &str = "TASKBOARD_COMPLETION";

/// Returns the current value of [`USER_AGENT`]
pub fn user_agent() -> String {
    match USER_AGENT.lock() {
        Ok(ua) => ua.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}


/// How workflows wait for the backend once it accepted a mutation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CompletionConfig {
    /// Sleep for the workflow-specific wait, then refresh
    FixedDelay,
    /// Poll the snapshot until it changes, waiting longer and longer between polls
    BackoffPolling {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        max_attempts: u32,
    },
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig::FixedDelay
    }
}

impl CompletionConfig {
    /// The default polling parameters
    pub fn backoff_polling() -> Self {
        CompletionConfig::BackoffPolling {
            initial_delay_ms: 250,
            max_delay_ms: 4_000,
            max_attempts: 8,
        }
    }
}


/// Runtime options of the sync engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Every endpoint is relative to this URL
    pub base_url: Url,
    /// The calendar feed a full sync ingests when the user does not provide one
    pub calendar_url: Option<String>,
    pub agent_wait_ms: u64,
    pub full_sync_wait_ms: u64,
    pub clarify_wait_ms: u64,
    pub completion: CompletionConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            calendar_url: None,
            agent_wait_ms: 1_500,
            full_sync_wait_ms: 8_000,
            clarify_wait_ms: 1_500,
            completion: CompletionConfig::default(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse("http://localhost:8000/api/").unwrap(/* this is a valid, constant URL */)
}

impl SyncConfig {
    /// Load a config from a JSON file. Missing fields take their default value
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let config = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };
        Ok(config)
    }

    /// Apply the `TASKBOARD_*` environment variables on top of this config
    pub fn with_env_overrides(self) -> Result<Self, Box<dyn Error>> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = Url::parse(&url)?;
        }
        if let Some(url) = lookup(ENV_CALENDAR_URL) {
            self.calendar_url = Some(url);
        }
        match lookup(ENV_COMPLETION).as_deref() {
            None => (),
            Some("fixed_delay") => self.completion = CompletionConfig::FixedDelay,
            Some("backoff_polling") => self.completion = CompletionConfig::backoff_polling(),
            Some(other) => return Err(format!("Unknown completion strategy {:?}", other).into()),
        }
        Ok(self)
    }

    pub fn agent_wait(&self) -> Duration     { Duration::from_millis(self.agent_wait_ms) }
    pub fn full_sync_wait(&self) -> Duration { Duration::from_millis(self.full_sync_wait_ms) }
    pub fn clarify_wait(&self) -> Duration   { Duration::from_millis(self.clarify_wait_ms) }
}



#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/api/");
        assert_eq!(config.agent_wait(), Duration::from_millis(1500));
        assert_eq!(config.full_sync_wait(), Duration::from_secs(8));
        assert_eq!(config.clarify_wait(), Duration::from_millis(1500));
        assert_eq!(config.completion, CompletionConfig::FixedDelay);
    }

    #[test]
    fn partial_json() {
        let config: SyncConfig = serde_json::from_str(r#"{
            "base_url": "https://planner.example.com/api/",
            "completion": { "strategy": "backoff_polling", "initial_delay_ms": 10, "max_delay_ms": 100, "max_attempts": 3 }
        }"#).unwrap();
        assert_eq!(config.base_url.host_str(), Some("planner.example.com"));
        assert_eq!(config.full_sync_wait_ms, 8_000);
        assert_eq!(config.completion, CompletionConfig::BackoffPolling{ initial_delay_ms: 10, max_delay_ms: 100, max_attempts: 3 });
    }

    #[test]
    fn overrides() {
        let mut env = HashMap::new();
        env.insert(ENV_BASE_URL, "http://10.0.0.2:9000/api/");
        env.insert(ENV_CALENDAR_URL, "https://canvas.example.com/feed.ics");
        env.insert(ENV_COMPLETION, "backoff_polling");

        let config = SyncConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.base_url.port(), Some(9000));
        assert_eq!(config.calendar_url.as_deref(), Some("https://canvas.example.com/feed.ics"));
        assert_eq!(config.completion, CompletionConfig::backoff_polling());

        let mut env = HashMap::new();
        env.insert(ENV_COMPLETION, "carrier-pigeon");
        assert!(SyncConfig::default().with_overrides(|key| env.get(key).map(|v| v.to_string())).is_err());
    }

    #[test]
    fn missing_file() {
        assert!(SyncConfig::from_file(Path::new("/this/file/does/not/exist.json")).is_err());
    }
}
