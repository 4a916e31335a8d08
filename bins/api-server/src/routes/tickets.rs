use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hook_core::EffectResult;
use tracing::{error, info};
use trello::TrelloError;

use super::envelope::{extract_tool_call, respond, ToolCall, ToolCallError};
use super::normalize::normalize_ticket;
use super::notify_best_effort;
use crate::AppState;

const CARD_CONTEXT: &str = "Error creating Trello card";

pub async fn create_trello_ticket(State(state): State<AppState>, body: Bytes) -> Response {
    let tool_call = match extract_tool_call(&body) {
        Ok(tool_call) => tool_call,
        Err(err) => {
            tracing::warn!(error = %err, "rejected ticket webhook");
            return err.into_response();
        }
    };

    let tool_call_id = tool_call.id.clone();
    let outcome = dispatch_ticket(&state, tool_call).await;
    respond(tool_call_id, outcome)
}

async fn dispatch_ticket(
    state: &AppState,
    tool_call: ToolCall,
) -> Result<EffectResult, ToolCallError> {
    let tool_call_id = tool_call.id.clone();

    let arguments = tool_call
        .arguments()
        .and_then(normalize_ticket)
        .map_err(|err| {
            error!(tool_call_id = %tool_call_id, error = %err, "invalid ticket arguments");
            ToolCallError::effect(CARD_CONTEXT, err)
        })?;

    let Some(ticket) = arguments.into_request() else {
        return Err(ToolCallError::Validation("Name is required".to_string()));
    };

    let Some(client) = state.trello.as_ref() else {
        error!(tool_call_id = %tool_call_id, "Trello client not configured");
        return Err(ToolCallError::Configuration(
            "Trello configuration is missing. Please check your .env file.".to_string(),
        ));
    };

    let card = client
        .create_card(&ticket)
        .await
        .map_err(|err| match err {
            TrelloError::HttpStatus { status, body } => ToolCallError::Remote {
                context: CARD_CONTEXT,
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            },
            other => {
                error!(tool_call_id = %tool_call_id, error = ?other, "error creating Trello card");
                ToolCallError::effect(CARD_CONTEXT, other)
            }
        })?;
    info!(tool_call_id = %tool_call_id, card_id = %card.id, "Trello card created successfully");

    notify_best_effort(&card.id, state.notifier.card_created(&card.id, &ticket)).await;

    Ok(EffectResult::succeeded(card.id, "Task created successfully"))
}
