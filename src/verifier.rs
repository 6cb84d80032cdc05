// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access key verification against the remote sorting API.
//!
//! Two endpoints are involved:
//!
//! - `POST /api/validate-key/` re-validates a stored key/device pair and, when
//!   called with a key alone, binds a fresh device id to it
//! - `POST /api/verify-key/` checks a freshly entered key
//!
//! The remote service answers rejections with a 4xx status *and* a JSON body
//! (`{"valid": false, "message": ...}`), so bodies are decoded regardless of
//! status. Only transport failures and undecodable bodies become
//! [`VerifierError`]s; callers treat those as "not valid right now" without
//! concluding that the key itself is bad.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::models::{KeyCheckRequest, ValidationResult};

pub const VALIDATE_KEY_PATH: &str = "api/validate-key/";
pub const VERIFY_KEY_PATH: &str = "api/verify-key/";

#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("key verification request failed: {0}")]
    Request(String),

    #[error("key verification response was invalid: {0}")]
    InvalidResponse(String),
}

/// Confirms access keys with the remote service.
#[async_trait]
pub trait KeyVerifier: Send + Sync {
    /// Re-validate a key, optionally paired with the device it is bound to.
    ///
    /// With a device id this confirms an existing credential; without one
    /// the remote service binds the key to a newly minted device id.
    async fn validate(
        &self,
        key: &str,
        device_id: Option<&str>,
    ) -> Result<ValidationResult, VerifierError>;

    /// Check a key typed in by the user.
    async fn verify(
        &self,
        key: &str,
        device_id: Option<&str>,
    ) -> Result<ValidationResult, VerifierError>;
}

#[derive(Debug, Clone)]
pub struct HttpKeyVerifier {
    validate_url: Url,
    verify_url: Url,
    http: Client,
}

impl HttpKeyVerifier {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, VerifierError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerifierError::Request(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(base_url, http)
    }

    pub fn with_client(base_url: &Url, http: Client) -> Result<Self, VerifierError> {
        Ok(Self {
            validate_url: endpoint(base_url, VALIDATE_KEY_PATH)?,
            verify_url: endpoint(base_url, VERIFY_KEY_PATH)?,
            http,
        })
    }

    async fn post_key_check(
        &self,
        url: &Url,
        body: &KeyCheckRequest<'_>,
    ) -> Result<ValidationResult, VerifierError> {
        let response = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| VerifierError::Request(format!("POST {} failed: {e}", url.path())))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| VerifierError::Request(format!("POST {} body read failed: {e}", url.path())))?;

        match serde_json::from_slice::<ValidationResult>(&bytes) {
            Ok(result) => {
                debug!(
                    path = %url.path(),
                    status = status.as_u16(),
                    valid = result.valid,
                    "Key check answered"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(
                    path = %url.path(),
                    status = status.as_u16(),
                    error = %e,
                    "Key check returned an undecodable body"
                );
                Err(VerifierError::InvalidResponse(format!(
                    "POST {} returned {status}: {e}",
                    url.path()
                )))
            }
        }
    }
}

#[async_trait]
impl KeyVerifier for HttpKeyVerifier {
    async fn validate(
        &self,
        key: &str,
        device_id: Option<&str>,
    ) -> Result<ValidationResult, VerifierError> {
        self.post_key_check(&self.validate_url, &KeyCheckRequest { key, device_id })
            .await
    }

    async fn verify(
        &self,
        key: &str,
        device_id: Option<&str>,
    ) -> Result<ValidationResult, VerifierError> {
        self.post_key_check(&self.verify_url, &KeyCheckRequest { key, device_id })
            .await
    }
}

/// Join an API path onto the configured base URL.
///
/// The base is treated as a directory even without a trailing slash, so
/// `https://host/prefix` + `api/sort/` yields `https://host/prefix/api/sort/`.
pub(crate) fn endpoint(base_url: &Url, path: &str) -> Result<Url, VerifierError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path)
        .map_err(|e| VerifierError::Request(format!("invalid endpoint {path}: {e}")))
}
