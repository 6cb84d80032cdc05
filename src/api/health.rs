// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::{gate::GateState, state::AppState};

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Credential directory writability. Absent when the credential is kept
    /// in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_store: Option<String>,
    /// Current access gate state ("checking", "granted" or "denied").
    pub access: String,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn check_credential_store(state: &AppState) -> Option<String> {
    let store = state.credential_file.as_ref()?;
    match store.health_check() {
        Ok(()) => Some("ok".to_string()),
        Err(e) => {
            warn!(error = %e, path = %store.path().display(), "Credential directory not writable");
            Some("unavailable".to_string())
        }
    }
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails. A denied gate is
/// not a failure: the service is still able to accept a key.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let credential_store = check_credential_store(&state);
    let all_ok = credential_store.as_deref().map(|s| s == "ok").unwrap_or(true);

    let access = match state.gate.state().await {
        GateState::Checking => "checking",
        GateState::Granted { .. } => "granted",
        GateState::Denied { .. } => "denied",
    };

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            credential_store,
            access: access.to_string(),
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{test_state, TestState};
    use crate::credentials::FileCredentialStore;

    #[tokio::test]
    async fn in_memory_store_is_healthy() {
        let TestState { state, .. } = test_state(None);

        let (status, Json(body)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert!(body.checks.credential_store.is_none());
        assert_eq!(body.checks.access, "checking");
    }

    #[tokio::test]
    async fn writable_credential_dir_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        let TestState { mut state, .. } = test_state(None);
        state.credential_file = Some(FileCredentialStore::in_dir(dir.path().join("nested")));

        let (status, Json(body)) = readiness(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.checks.credential_store.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn unusable_credential_dir_is_degraded() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let TestState { mut state, .. } = test_state(None);
        state.credential_file = Some(FileCredentialStore::in_dir(&blocker));

        let (status, Json(body)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
        assert_eq!(body.checks.credential_store.as_deref(), Some("unavailable"));
    }

    #[tokio::test]
    async fn liveness_is_always_ok() {
        let Json(body) = liveness().await;
        assert_eq!(body.status, "ok");
    }
}
