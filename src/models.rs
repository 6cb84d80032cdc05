// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Data Models
//!
//! Types shared by the access gate, the submission workflow and the HTTP
//! surface. Wire types for the remote sorting API mirror its JSON field
//! names (`device_id`, `valid`, `message`).
//!
//! ## Model Categories
//!
//! - **Credentials**: the persisted access key / device id pair
//! - **Verification**: request and response bodies of the key endpoints
//! - **Submission**: the draft, the upload payload and the sorted result
//! - **Progress**: cosmetic progress reported while a sort runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// File name offered for download after a successful sort.
pub const SORTED_FILE_NAME: &str = "sorted_families.csv";

// =============================================================================
// Credentials
// =============================================================================

/// Access key paired with the device id the remote service bound it to.
///
/// The device id is only meaningful together with the key it was last
/// validated with; the two are always saved and cleared as a unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessCredential {
    #[serde(rename = "access_key")]
    pub key: String,
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl AccessCredential {
    pub fn new(key: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            device_id: device_id.into(),
            saved_at: None,
        }
    }

    /// Whether both halves of the pair are present.
    pub fn is_complete(&self) -> bool {
        !self.key.trim().is_empty() && !self.device_id.trim().is_empty()
    }

    /// Same key and device id, ignoring bookkeeping fields.
    pub fn same_pair(&self, other: &AccessCredential) -> bool {
        self.key == other.key && self.device_id == other.device_id
    }
}

// =============================================================================
// Verification
// =============================================================================

/// Body sent to `/api/validate-key/` and `/api/verify-key/`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KeyCheckRequest<'a> {
    pub key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<&'a str>,
}

/// Outcome of a single key verification call.
///
/// Never persisted; only its effect on the stored credential is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ValidationResult {
    #[serde(default)]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn granted(device_id: impl Into<String>) -> Self {
        Self {
            valid: true,
            device_id: Some(device_id.into()),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            device_id: None,
            message: Some(message.into()),
        }
    }
}

/// Key typed into the access gate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitKeyRequest {
    pub key: String,
}

// =============================================================================
// Submission
// =============================================================================

/// File chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Multipart payload sent to `/api/sort/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub file: SelectedFile,
    pub comments: String,
}

/// Result of a successful sort, ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SortedFile {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            file_name: SORTED_FILE_NAME.to_string(),
            bytes,
        }
    }
}

/// Free-text instructions sent alongside the CSV.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateCommentsRequest {
    pub comments: String,
}

// =============================================================================
// Progress
// =============================================================================

/// Purely cosmetic progress; not derived from the remote service.
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct ProgressState {
    /// 0 to 100.
    pub percent: f32,
    pub message: String,
}

impl ProgressState {
    pub const WAITING_MESSAGE: &'static str = "Waiting to start...";

    pub fn new(percent: f32, message: impl Into<String>) -> Self {
        Self {
            percent,
            message: message.into(),
        }
    }

    pub fn waiting() -> Self {
        Self::new(0.0, Self::WAITING_MESSAGE)
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::waiting()
    }
}
