use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use hook_core::config::TrelloCredentials;
use hook_core::{TaskRequest, TaskStore, TicketRequest};
use mailer::Notifier;
use serde_json::Value;
use tower::ServiceExt;
use trello::TrelloClient;

use super::api_routes;
use crate::AppState;

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<TaskRequest>>,
    failure: Option<String>,
}

impl MemoryStore {
    pub fn records(&self) -> Vec<TaskRequest> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: &TaskRequest) -> Result<String> {
        if let Some(message) = &self.failure {
            return Err(anyhow!(message.clone()));
        }
        let mut records = self.records.lock().unwrap();
        records.push(task.clone());
        Ok(format!("task-{}", records.len()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    task_ids: Mutex<Vec<String>>,
    cards: Mutex<Vec<(String, TicketRequest)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn task_ids(&self) -> Vec<String> {
        self.task_ids.lock().unwrap().clone()
    }

    pub fn cards(&self) -> Vec<(String, TicketRequest)> {
        self.cards.lock().unwrap().clone()
    }

    fn outcome(&self) -> Result<()> {
        if self.fail {
            Err(anyhow!("smtp transport unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn task_created(&self, task_id: &str, _task: &TaskRequest) -> Result<()> {
        self.task_ids.lock().unwrap().push(task_id.to_string());
        self.outcome()
    }

    async fn card_created(&self, card_id: &str, ticket: &TicketRequest) -> Result<()> {
        self.cards
            .lock()
            .unwrap()
            .push((card_id.to_string(), ticket.clone()));
        self.outcome()
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub trello: Option<TrelloClient>,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            trello: None,
        }
    }

    pub fn with_failing_store(message: &str) -> Self {
        Self {
            store: Arc::new(MemoryStore {
                failure: Some(message.to_string()),
                ..MemoryStore::default()
            }),
            ..Self::new()
        }
    }

    pub fn with_failing_notifier() -> Self {
        Self {
            notifier: Arc::new(RecordingNotifier {
                fail: true,
                ..RecordingNotifier::default()
            }),
            ..Self::new()
        }
    }

    pub fn trello_at(mut self, base_url: &str) -> Self {
        let credentials = TrelloCredentials {
            token: "test-token".into(),
            key: "test-key".into(),
            id_list: "list-123".into(),
        };
        self.trello =
            Some(TrelloClient::new(base_url, credentials, Duration::from_secs(5)).unwrap());
        self
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            trello: self.trello.clone(),
        };
        api_routes().with_state(state)
    }
}

pub async fn post_json(router: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
