//! Heartbeat endpoints

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::debug;

use crate::api::error::ApiResult;
use crate::api::state::ApiState;
use crate::api::types::{ApiResponse, HeartbeatRequest};
use crate::monitors::heartbeat::{HeartbeatAck, HeartbeatView};

/// POST /api/v1/heartbeat
///
/// Records a heartbeat and answers with the time of the next check.
pub async fn record_heartbeat(
    State(state): State<ApiState>,
    payload: Result<Json<HeartbeatRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<HeartbeatAck>>> {
    let Json(request) = payload?;
    debug!(name = %request.name, extra = ?request.extra, "heartbeat received");

    let ack = state.watchdog.record_heartbeat(&request.name).await?;

    Ok(Json(ApiResponse::ok(ack)))
}

/// GET /api/v1/heartbeats
pub async fn list_heartbeats(
    State(state): State<ApiState>,
) -> Json<ApiResponse<Vec<HeartbeatView>>> {
    Json(ApiResponse::ok(state.watchdog.statuses().await))
}
