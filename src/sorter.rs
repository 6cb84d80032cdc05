// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client for the remote `POST /api/sort/` endpoint.
//!
//! The request is a multipart form with two fields, `file` (the CSV) and
//! `comments` (free-text grouping instructions). The remote service answers
//! with the sorted CSV as the response body; any non-2xx status is a failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use tracing::{info, warn};
use url::Url;

use crate::models::SubmissionPayload;
use crate::verifier::endpoint;

pub const SORT_PATH: &str = "api/sort/";
const CSV_MIME: &str = "text/csv";

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("sort request failed: {0}")]
    Request(String),

    #[error("sort request returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Sends a CSV to the remote sorting service.
#[async_trait]
pub trait SortClient: Send + Sync {
    /// Upload the payload and return the sorted CSV bytes.
    async fn sort(&self, payload: SubmissionPayload) -> Result<Vec<u8>, SortError>;
}

#[derive(Debug, Clone)]
pub struct HttpSortClient {
    sort_url: Url,
    http: Client,
}

impl HttpSortClient {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, SortError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SortError::Request(format!("failed to build HTTP client: {e}")))?;
        let sort_url =
            endpoint(base_url, SORT_PATH).map_err(|e| SortError::Request(e.to_string()))?;
        Ok(Self { sort_url, http })
    }
}

#[async_trait]
impl SortClient for HttpSortClient {
    async fn sort(&self, payload: SubmissionPayload) -> Result<Vec<u8>, SortError> {
        let SubmissionPayload { file, comments } = payload;
        let size = file.bytes.len();

        let part = multipart::Part::bytes(file.bytes)
            .file_name(file.name.clone())
            .mime_str(CSV_MIME)
            .map_err(|e| SortError::Request(format!("invalid part type: {e}")))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("comments", comments);

        info!(file = %file.name, bytes = size, "Sending sort request");

        let response = self
            .http
            .post(self.sort_url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| SortError::Request(format!("POST {} failed: {e}", self.sort_url.path())))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Sort request rejected");
            return Err(SortError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SortError::Request(format!("reading sorted file failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectedFile;
    use crate::testing::spawn_stub_server;
    use axum::{extract::Multipart, http::StatusCode, routing::post, Router};

    fn payload() -> SubmissionPayload {
        SubmissionPayload {
            file: SelectedFile {
                name: "data.csv".to_string(),
                bytes: b"name,vibe\nAda,calm\n".to_vec(),
            },
            comments: "Group by music taste".to_string(),
        }
    }

    #[tokio::test]
    async fn sort_uploads_file_and_comments() {
        let router = Router::new().route(
            "/api/sort/",
            post(|mut multipart: Multipart| async move {
                let mut file = None;
                let mut comments = None;
                while let Some(field) = multipart.next_field().await.unwrap() {
                    match field.name() {
                        Some("file") => {
                            assert_eq!(field.file_name(), Some("data.csv"));
                            file = Some(field.bytes().await.unwrap());
                        }
                        Some("comments") => comments = Some(field.text().await.unwrap()),
                        _ => {}
                    }
                }
                assert_eq!(comments.as_deref(), Some("Group by music taste"));
                let file = file.expect("file field present");
                let mut sorted = file.to_vec();
                sorted.extend_from_slice(b"family,1\n");
                sorted
            }),
        );
        let base = spawn_stub_server(router).await;
        let client = HttpSortClient::new(&base, Duration::from_secs(5)).unwrap();

        let sorted = client.sort(payload()).await.unwrap();
        assert_eq!(sorted, b"name,vibe\nAda,calm\nfamily,1\n".to_vec());
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let router = Router::new().route(
            "/api/sort/",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Processing failed") }),
        );
        let base = spawn_stub_server(router).await;
        let client = HttpSortClient::new(&base, Duration::from_secs(5)).unwrap();

        match client.sort(payload()).await {
            Err(SortError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "Processing failed");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
