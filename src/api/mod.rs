// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderName,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    gate::GateState,
    models::{ProgressState, SubmitKeyRequest, UpdateCommentsRequest, ValidationResult},
    shell::NavLink,
    state::AppState,
    workflow::{WorkflowOutcome, WorkflowPhase, WorkflowStatus},
};

pub mod access;
pub mod health;
pub mod pages;
pub mod sort;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    let v1_routes = Router::new()
        .route("/access", get(access::get_access))
        .route("/access/key", post(access::submit_key))
        .route("/access/check", post(access::recheck))
        .route("/sort", post(sort::submit))
        .route("/sort/status", get(sort::get_status))
        .route("/sort/comments", put(sort::update_comments))
        .route(
            "/sort/file",
            post(sort::select_file).layer(upload_limit.clone()),
        )
        .route("/sort/download", get(sort::download))
        .route("/nav", get(sort::nav_links))
        .with_state(state.clone());

    let page_routes = Router::new()
        .route("/", get(pages::landing))
        .route("/about", get(pages::about))
        .route("/sorting", get(pages::sorting))
        .route("/sorting/key", post(pages::sorting_key))
        .route(
            "/sorting/submit",
            post(pages::sorting_submit).layer(upload_limit),
        )
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(page_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        access::get_access,
        access::submit_key,
        access::recheck,
        sort::get_status,
        sort::update_comments,
        sort::select_file,
        sort::submit,
        sort::download,
        sort::nav_links,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            GateState,
            ValidationResult,
            SubmitKeyRequest,
            UpdateCommentsRequest,
            WorkflowStatus,
            WorkflowPhase,
            WorkflowOutcome,
            ProgressState,
            NavLink,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Access", description = "Access key gate"),
        (name = "Sort", description = "CSV submission and sorted download"),
        (name = "Navigation", description = "Navigation link state"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
