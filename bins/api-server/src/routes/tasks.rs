use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use hook_core::EffectResult;
use tracing::{error, info};

use super::envelope::{extract_tool_call, respond, ToolCall, ToolCallError};
use super::normalize::normalize_task;
use super::notify_best_effort;
use crate::AppState;

const TASK_CONTEXT: &str = "Error creating task";

pub async fn create_task(State(state): State<AppState>, body: Bytes) -> Response {
    let tool_call = match extract_tool_call(&body) {
        Ok(tool_call) => tool_call,
        Err(err) => {
            tracing::warn!(error = %err, "rejected task webhook");
            return err.into_response();
        }
    };

    let tool_call_id = tool_call.id.clone();
    let outcome = dispatch_task(&state, tool_call).await;
    respond(tool_call_id, outcome)
}

async fn dispatch_task(
    state: &AppState,
    tool_call: ToolCall,
) -> Result<EffectResult, ToolCallError> {
    let tool_call_id = tool_call.id.clone();
    let function = tool_call.function_name().unwrap_or("unknown").to_string();

    let task = tool_call
        .arguments()
        .and_then(normalize_task)
        .map_err(|err| {
            error!(tool_call_id = %tool_call_id, error = %err, "invalid task arguments");
            ToolCallError::effect(TASK_CONTEXT, err)
        })?;

    info!(
        tool_call_id = %tool_call_id,
        function = %function,
        title = %task.title,
        priority = %task.priority,
        due_date = ?task.due_date,
        "tool called with task arguments"
    );

    let task_id = state.store.insert_task(&task).await.map_err(|err| {
        error!(tool_call_id = %tool_call_id, error = ?err, "error saving task");
        ToolCallError::effect(TASK_CONTEXT, err)
    })?;
    info!(tool_call_id = %tool_call_id, task_id = %task_id, "task saved");

    notify_best_effort(&task_id, state.notifier.task_created(&task_id, &task)).await;

    let detail = format!("Task created successfully with ID {task_id}");
    Ok(EffectResult::succeeded(task_id, detail))
}
