// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{error::ApiError, gate::GateState, models::SubmitKeyRequest, state::AppState};

#[utoipa::path(
    get,
    path = "/v1/access",
    tag = "Access",
    responses((status = 200, body = GateState))
)]
pub async fn get_access(State(state): State<AppState>) -> Json<GateState> {
    Json(state.gate.state().await)
}

#[utoipa::path(
    post,
    path = "/v1/access/key",
    request_body = SubmitKeyRequest,
    tag = "Access",
    responses(
        (status = 200, body = GateState),
        (status = 400, description = "Empty key"),
        (status = 403, description = "Key rejected by the sorting service"),
        (status = 503, description = "Sorting service unreachable")
    )
)]
pub async fn submit_key(
    State(state): State<AppState>,
    Json(request): Json<SubmitKeyRequest>,
) -> Result<Json<GateState>, ApiError> {
    state.gate.submit_key(&request.key).await?;
    Ok(Json(state.gate.state().await))
}

/// Re-run the stored credential check, as on startup.
#[utoipa::path(
    post,
    path = "/v1/access/check",
    tag = "Access",
    responses((status = 200, body = GateState))
)]
pub async fn recheck(State(state): State<AppState>) -> Json<GateState> {
    Json(state.gate.check().await)
}
