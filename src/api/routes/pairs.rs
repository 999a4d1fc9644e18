//! Pair registration endpoints

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::debug;

use crate::api::error::ApiResult;
use crate::api::state::ApiState;
use crate::api::types::{ApiResponse, SymbolsData};
use crate::pairs::{PairInfo, RegistrationAck};

/// POST /api/v1/pairs
///
/// Body is a list of pairs; both legs of each become symbols of interest.
pub async fn register_pairs(
    State(state): State<ApiState>,
    payload: Result<Json<Vec<PairInfo>>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<RegistrationAck>>> {
    let Json(pairs) = payload?;
    debug!("received {} pair(s)", pairs.len());

    let ack = state.pairs.register_pairs(&pairs).await?;

    Ok(Json(ApiResponse::ok(ack)))
}

/// GET /api/v1/symbols
pub async fn list_symbols(State(state): State<ApiState>) -> Json<ApiResponse<SymbolsData>> {
    Json(ApiResponse::ok(state.pairs.symbols().await))
}
