pub mod envelope;
pub mod normalize;
pub mod tasks;
pub mod tickets;

#[cfg(test)]
mod test_support;

use std::future::Future;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(tasks::create_task))
        .route("/createTrelloTicket", post(tickets::create_trello_ticket))
        .route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Await a notification after the primary effect succeeded.
///
/// Errors are logged and dropped; the response has already been decided.
pub(crate) async fn notify_best_effort<F>(identifier: &str, send: F)
where
    F: Future<Output = anyhow::Result<()>>,
{
    match send.await {
        Ok(()) => tracing::info!(identifier, "email notification sent successfully"),
        Err(err) => {
            tracing::error!(identifier, error = ?err, "failed to send email notification")
        }
    }
}
