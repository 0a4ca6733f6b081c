//! This module provides a client to connect to the planner backend

use std::error::Error;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SyncError;
use crate::task::{Snapshot, TaskId};
use crate::traits::TaskBackend;

static SNAPSHOT_PATH: &str = "demo_state";
static PARSE_AND_PLAN_PATH: &str = "parse_and_plan";
static SYNC_ALL_PATH: &str = "sync_all";
static DELETE_TASK_PATH: &str = "delete_task";
static CLARIFY_PATH: &str = "clarify";

#[derive(Serialize)]
struct AgentTextBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct SyncAllBody<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    #[serde(rename = "taskId")]
    task_id: &'a str,
}

#[derive(Serialize)]
struct ClarifyBody<'a> {
    #[serde(rename = "taskID")]
    task_id: &'a str,
    question: &'a str,
    answer: &'a str,
}

#[derive(Deserialize)]
struct PingReply {
    #[serde(default)]
    message: String,
}


/// A [`TaskBackend`] that talks JSON over HTTP to the planner backend
#[derive(Clone, Debug)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new<S: AsRef<str>>(base_url: S) -> Result<Self, Box<dyn Error>> {
        let url = Url::parse(base_url.as_ref())?;
        Self::from_url(url)
    }

    /// Create a client for an already parsed base URL
    pub fn from_url(mut base_url: Url) -> Result<Self, Box<dyn Error>> {
        // Endpoints are joined to the base URL: without a trailing slash, its last segment would be replaced
        if base_url.path().ends_with('/') == false {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(crate::config::user_agent())
            .build()?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.base_url.join(path)
            .map_err(|err| SyncError::Other(format!("Invalid endpoint {}: {}", path, err)))
    }

    /// The greeting lives at the base itself (`GET /api`), not under it
    fn ping_url(&self) -> Url {
        let mut url = self.base_url.clone();
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);
        url
    }

    /// Check the backend is up, and return its greeting
    pub async fn ping(&self) -> Result<String, SyncError> {
        let url = self.ping_url();
        log::debug!("GET {}", url);
        let response = self.http
            .get(url)
            .send()
            .await
            .map_err(|source| SyncError::Transport{ operation: "ping", source })?;
        check_status("ping", &response)?;

        let reply: PingReply = response.json()
            .await
            .map_err(|source| SyncError::Transport{ operation: "ping", source })?;
        Ok(reply.message)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, operation: &'static str, path: &str, body: &B) -> Result<(), SyncError> {
        let url = self.endpoint(path)?;
        log::debug!("POST {}", url);

        let response = self.http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| SyncError::Transport{ operation, source })?;

        // The reply body only tells the mutation has been accepted. Its effects are observed by the next snapshot
        check_status(operation, &response)
    }
}

fn check_status(operation: &'static str, response: &reqwest::Response) -> Result<(), SyncError> {
    if response.status().is_success() == false {
        return Err(SyncError::Status{ operation, status: response.status().as_u16() });
    }
    Ok(())
}

#[async_trait]
impl TaskBackend for Client {
    async fn fetch_snapshot(&self) -> Result<Snapshot, SyncError> {
        let url = self.endpoint(SNAPSHOT_PATH)?;
        log::debug!("GET {}", url);

        let response = self.http
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|source| SyncError::Transport{ operation: "fetch_snapshot", source })?;
        check_status("fetch_snapshot", &response)?;

        let text = response.text()
            .await
            .map_err(|source| SyncError::Transport{ operation: "fetch_snapshot", source })?;
        let snapshot: Snapshot = serde_json::from_str(&text)
            .map_err(|source| SyncError::Decode{ source })?;

        log::debug!("Fetched a snapshot of {} tasks", snapshot.tasks.len());
        Ok(snapshot)
    }

    async fn parse_and_plan(&self, text: &str) -> Result<(), SyncError> {
        self.post_json("parse_and_plan", PARSE_AND_PLAN_PATH, &AgentTextBody{ text }).await
    }

    async fn sync_all(&self, source_url: &str) -> Result<(), SyncError> {
        self.post_json("sync_all", SYNC_ALL_PATH, &SyncAllBody{ url: source_url }).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), SyncError> {
        self.post_json("delete_task", DELETE_TASK_PATH, &DeleteBody{ task_id: id.as_str() }).await
    }

    async fn clarify(&self, id: &TaskId, question: &str, answer: &str) -> Result<(), SyncError> {
        let body = ClarifyBody{ task_id: id.as_str(), question, answer };
        self.post_json("clarify", CLARIFY_PATH, &body).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_a_trailing_slash() {
        let client = Client::new("http://localhost:8000/api").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8000/api/");
        assert_eq!(client.endpoint(SNAPSHOT_PATH).unwrap().as_str(), "http://localhost:8000/api/demo_state");

        let client = Client::new("http://localhost:8000/api/").unwrap();
        assert_eq!(client.endpoint(CLARIFY_PATH).unwrap().as_str(), "http://localhost:8000/api/clarify");
    }

    #[test]
    fn ping_url_has_no_trailing_slash() {
        let client = Client::new("http://localhost:8000/api").unwrap();
        assert_eq!(client.ping_url().as_str(), "http://localhost:8000/api");
    }

    #[test]
    fn invalid_base_url() {
        assert!(Client::new("not a url").is_err());
    }

    #[test]
    fn wire_bodies() {
        let body = serde_json::to_value(&ClarifyBody{ task_id: "t1", question: "q", answer: "a" }).unwrap();
        assert_eq!(body, serde_json::json!({"taskID": "t1", "question": "q", "answer": "a"}));
        let body = serde_json::to_value(&DeleteBody{ task_id: "t2" }).unwrap();
        assert_eq!(body, serde_json::json!({"taskId": "t2"}));
    }
}
