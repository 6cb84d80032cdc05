// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::gate::GateError;
use crate::workflow::SubmitError;

pub const ACCESS_REQUIRED_MESSAGE: &str = "Access key required.";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn access_required() -> Self {
        Self::forbidden(ACCESS_REQUIRED_MESSAGE)
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        let status = match &e {
            GateError::EmptyKey => StatusCode::BAD_REQUEST,
            GateError::NoCredential | GateError::Rejected(_) => StatusCode::FORBIDDEN,
            GateError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GateError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        let status = match &e {
            SubmitError::InvalidFileType | SubmitError::MissingFile => StatusCode::BAD_REQUEST,
            SubmitError::InFlight => StatusCode::CONFLICT,
            SubmitError::NoCredential | SubmitError::AccessDenied(_) => StatusCode::FORBIDDEN,
            SubmitError::KeyCheckUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SubmitError::SortFailed(_) => StatusCode::BAD_GATEWAY,
            SubmitError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
