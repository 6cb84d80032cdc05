// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sorting workflow endpoints. All of them sit behind the access gate.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::{
    error::ApiError,
    models::{SortedFile, UpdateCommentsRequest},
    shell::NavLink,
    state::AppState,
    workflow::{EditOutcome, WorkflowStatus, MISSING_FILE_MESSAGE},
};

/// Upload fields read from a multipart body.
#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub file: Option<(String, Vec<u8>)>,
    pub comments: Option<String>,
}

/// Keeps the extractor's status, e.g. 413 when the upload limit is hit.
fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::new(e.status(), e.body_text())
}

/// Read the `file` and `comments` fields; unknown fields are skipped.
///
/// An empty file field (a browser form with nothing selected) counts as
/// absent.
pub(crate) async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if !name.is_empty() || !bytes.is_empty() {
                    form.file = Some((name, bytes.to_vec()));
                }
            }
            Some("comments") => {
                form.comments = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }
    Ok(form)
}

pub(crate) async fn require_access(state: &AppState) -> Result<(), ApiError> {
    if state.gate.is_granted().await {
        Ok(())
    } else {
        Err(ApiError::access_required())
    }
}

fn deferred(outcome: EditOutcome) -> Result<(), ApiError> {
    match outcome {
        EditOutcome::Applied => Ok(()),
        EditOutcome::Deferred(advisory) => Err(ApiError::conflict(advisory)),
    }
}

/// Apply an uploaded form to the workflow draft.
pub(crate) async fn apply_upload_form(state: &AppState, form: UploadForm) -> Result<(), ApiError> {
    if let Some(comments) = form.comments {
        deferred(state.workflow.set_comments(comments).await)?;
    }
    if let Some((name, bytes)) = form.file {
        deferred(state.workflow.select_file(name, bytes).await?)?;
    }
    Ok(())
}

/// Run a submission on its own task.
///
/// The task is detached from the HTTP request: a client that goes away
/// does not cancel the sort, and the result stays available for download.
pub(crate) async fn run_submission(state: &AppState) -> Result<SortedFile, ApiError> {
    let workflow = state.workflow.clone();
    match tokio::spawn(async move { workflow.submit().await }).await {
        Ok(result) => Ok(result?),
        Err(e) => {
            error!(error = %e, "Submission task failed");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Submission task failed",
            ))
        }
    }
}

pub(crate) fn csv_attachment(file: SortedFile) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.file_name),
            ),
        ],
        file.bytes,
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/v1/sort/status",
    tag = "Sort",
    responses((status = 200, body = WorkflowStatus), (status = 403, description = "Access key required"))
)]
pub async fn get_status(State(state): State<AppState>) -> Result<Json<WorkflowStatus>, ApiError> {
    require_access(&state).await?;
    Ok(Json(state.workflow.status().await))
}

#[utoipa::path(
    put,
    path = "/v1/sort/comments",
    request_body = UpdateCommentsRequest,
    tag = "Sort",
    responses(
        (status = 200, body = WorkflowStatus),
        (status = 409, description = "Sort in progress; edit not applied")
    )
)]
pub async fn update_comments(
    State(state): State<AppState>,
    Json(request): Json<UpdateCommentsRequest>,
) -> Result<Json<WorkflowStatus>, ApiError> {
    require_access(&state).await?;
    deferred(state.workflow.set_comments(request.comments).await)?;
    Ok(Json(state.workflow.status().await))
}

#[utoipa::path(
    post,
    path = "/v1/sort/file",
    request_body(content_type = "multipart/form-data", description = "`file` field holding the CSV"),
    tag = "Sort",
    responses(
        (status = 200, body = WorkflowStatus),
        (status = 400, description = "Missing or non-CSV file"),
        (status = 413, description = "Upload exceeds MAX_UPLOAD_BYTES"),
        (status = 409, description = "Sort in progress; selection not applied")
    )
)]
pub async fn select_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<WorkflowStatus>, ApiError> {
    require_access(&state).await?;
    let form = read_upload_form(multipart).await?;
    let (name, bytes) = form
        .file
        .ok_or_else(|| ApiError::bad_request(MISSING_FILE_MESSAGE))?;
    deferred(state.workflow.select_file(name, bytes).await?)?;
    Ok(Json(state.workflow.status().await))
}

#[utoipa::path(
    post,
    path = "/v1/sort",
    tag = "Sort",
    responses(
        (status = 200, description = "Sorted CSV as `sorted_families.csv`", content_type = "text/csv"),
        (status = 400, description = "No CSV selected"),
        (status = 403, description = "Access key rejected"),
        (status = 409, description = "A sort is already running"),
        (status = 502, description = "Sorting service failed")
    )
)]
pub async fn submit(State(state): State<AppState>) -> Result<Response, ApiError> {
    require_access(&state).await?;
    let sorted = run_submission(&state).await?;
    Ok(csv_attachment(sorted))
}

#[utoipa::path(
    get,
    path = "/v1/sort/download",
    tag = "Sort",
    responses(
        (status = 200, description = "Most recent sorted CSV", content_type = "text/csv"),
        (status = 404, description = "Nothing sorted yet")
    )
)]
pub async fn download(State(state): State<AppState>) -> Result<Response, ApiError> {
    require_access(&state).await?;
    let sorted = state
        .workflow
        .last_download()
        .await
        .ok_or_else(|| ApiError::not_found("No sorted file available"))?;
    Ok(csv_attachment(sorted))
}

#[utoipa::path(
    get,
    path = "/v1/nav",
    tag = "Navigation",
    responses((status = 200, body = [NavLink]))
)]
pub async fn nav_links(State(state): State<AppState>) -> Json<Vec<NavLink>> {
    Json(state.shell.links())
}
