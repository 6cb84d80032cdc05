// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Submission Workflow
//!
//! Orchestrates one sort submission:
//!
//! 1. **Idle → Validating**: requires a selected `.csv` file, otherwise the
//!    request is refused locally and nothing is sent
//! 2. **Validating**: the stored key is re-validated through the
//!    [`AccessGate`]; an explicit rejection clears it and stops here, before
//!    the sort endpoint is ever contacted
//! 3. **Uploading**: file and instructions go to the sort endpoint while a
//!    [`ProgressTicker`] animates the cosmetic progress bar
//! 4. **Succeeded / Failed**: the ticker is cancelled and awaited, progress
//!    jumps to 100 or back to 0, and the phase returns to `Idle`
//!
//! Only one submission runs at a time. Edits attempted while one is in
//! flight are not applied; they leave a short-lived advisory instead.
//!
//! A failed sort never touches the stored credential: a file that could not
//! be sorted says nothing about the key.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::credentials::CredentialStoreError;
use crate::gate::{AccessGate, GateError, SERVER_ERROR_MESSAGE};
use crate::models::{ProgressState, SelectedFile, SortedFile, SubmissionPayload};
use crate::progress::{
    shuffled_messages, ProgressTicker, COMPLETE_MESSAGE, FAILED_MESSAGE, STARTED_MESSAGE,
};
use crate::sorter::{SortClient, SortError};
use crate::verifier::VerifierError;

pub const INVALID_FILE_MESSAGE: &str = "Please upload a valid .csv file.";
pub const MISSING_FILE_MESSAGE: &str = "Please upload a CSV file before submitting.";
pub const COMMENTS_LOCKED_MESSAGE: &str = "Sorting is in progress — you can't edit instructions.";
pub const FILE_LOCKED_MESSAGE: &str = "Sorting is in progress — file upload disabled.";

/// How long an advisory stays visible.
pub const SOFT_WARNING_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Idle,
    Validating,
    Uploading,
    Succeeded,
    Failed,
}

impl WorkflowPhase {
    pub fn is_in_flight(self) -> bool {
        matches!(self, WorkflowPhase::Validating | WorkflowPhase::Uploading)
    }
}

/// Result of the most recent submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    Succeeded { file_name: String },
    Failed { message: String },
}

/// Whether an edit was applied or deferred because a sort is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Deferred(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{}", INVALID_FILE_MESSAGE)]
    InvalidFileType,

    #[error("{}", MISSING_FILE_MESSAGE)]
    MissingFile,

    #[error("a sort is already in progress")]
    InFlight,

    #[error("Access key required.")]
    NoCredential,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("{}", SERVER_ERROR_MESSAGE)]
    KeyCheckUnavailable(#[source] VerifierError),

    #[error("credential storage failed: {0}")]
    Store(#[source] CredentialStoreError),

    #[error("{}", FAILED_MESSAGE)]
    SortFailed(#[source] SortError),
}

impl From<GateError> for SubmitError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::NoCredential | GateError::EmptyKey => SubmitError::NoCredential,
            GateError::Rejected(message) => SubmitError::AccessDenied(message),
            GateError::Unavailable(source) => SubmitError::KeyCheckUnavailable(source),
            GateError::Store(source) => SubmitError::Store(source),
        }
    }
}

/// Snapshot for status displays.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WorkflowStatus {
    pub phase: WorkflowPhase,
    pub progress: ProgressState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_file: Option<String>,
    pub comments: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<WorkflowOutcome>,
    pub download_available: bool,
}

#[derive(Debug, Default)]
struct Draft {
    file: Option<SelectedFile>,
    comments: String,
}

#[derive(Debug)]
struct SoftWarning {
    message: &'static str,
    expires_at: Instant,
}

/// Case-insensitive `.csv` suffix check.
pub fn is_csv_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".csv")
}

pub struct SubmissionWorkflow {
    gate: Arc<AccessGate>,
    sorter: Arc<dyn SortClient>,
    progress_interval: Duration,
    phase: watch::Sender<WorkflowPhase>,
    progress: Arc<watch::Sender<ProgressState>>,
    draft: Mutex<Draft>,
    warning: Mutex<Option<SoftWarning>>,
    outcome: Mutex<Option<WorkflowOutcome>>,
    last_download: Mutex<Option<SortedFile>>,
}

impl SubmissionWorkflow {
    pub fn new(
        gate: Arc<AccessGate>,
        sorter: Arc<dyn SortClient>,
        progress_interval: Duration,
    ) -> Self {
        let (phase, _) = watch::channel(WorkflowPhase::Idle);
        let (progress, _) = watch::channel(ProgressState::waiting());
        Self {
            gate,
            sorter,
            progress_interval,
            phase,
            progress: Arc::new(progress),
            draft: Mutex::new(Draft::default()),
            warning: Mutex::new(None),
            outcome: Mutex::new(None),
            last_download: Mutex::new(None),
        }
    }

    pub fn gate(&self) -> &Arc<AccessGate> {
        &self.gate
    }

    pub fn phase(&self) -> WorkflowPhase {
        *self.phase.borrow()
    }

    /// Watch phase changes, e.g. to grey out navigation while in flight.
    pub fn subscribe_phase(&self) -> watch::Receiver<WorkflowPhase> {
        self.phase.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase().is_in_flight()
    }

    pub fn progress(&self) -> ProgressState {
        self.progress.borrow().clone()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressState> {
        self.progress.subscribe()
    }

    /// Choose the file to upload.
    ///
    /// Non-CSV names are refused and leave any previous selection in place.
    pub async fn select_file(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<EditOutcome, SubmitError> {
        if self.is_in_flight() {
            self.warn_soft(FILE_LOCKED_MESSAGE).await;
            return Ok(EditOutcome::Deferred(FILE_LOCKED_MESSAGE));
        }

        let name = name.into();
        if !is_csv_name(&name) {
            return Err(SubmitError::InvalidFileType);
        }

        self.draft.lock().await.file = Some(SelectedFile { name, bytes });
        Ok(EditOutcome::Applied)
    }

    /// Replace the free-text instructions.
    pub async fn set_comments(&self, comments: impl Into<String>) -> EditOutcome {
        if self.is_in_flight() {
            self.warn_soft(COMMENTS_LOCKED_MESSAGE).await;
            return EditOutcome::Deferred(COMMENTS_LOCKED_MESSAGE);
        }

        self.draft.lock().await.comments = comments.into();
        EditOutcome::Applied
    }

    /// Current advisory, if it has not expired yet.
    pub async fn soft_warning(&self) -> Option<&'static str> {
        let mut warning = self.warning.lock().await;
        match warning.as_ref() {
            Some(w) if Instant::now() < w.expires_at => Some(w.message),
            Some(_) => {
                *warning = None;
                None
            }
            None => None,
        }
    }

    async fn warn_soft(&self, message: &'static str) {
        *self.warning.lock().await = Some(SoftWarning {
            message,
            expires_at: Instant::now() + SOFT_WARNING_TTL,
        });
    }

    pub async fn last_download(&self) -> Option<SortedFile> {
        self.last_download.lock().await.clone()
    }

    pub async fn status(&self) -> WorkflowStatus {
        let (selected_file, comments) = {
            let draft = self.draft.lock().await;
            (
                draft.file.as_ref().map(|f| f.name.clone()),
                draft.comments.clone(),
            )
        };
        WorkflowStatus {
            phase: self.phase(),
            progress: self.progress(),
            selected_file,
            comments,
            warning: self.soft_warning().await.map(str::to_string),
            last_outcome: self.outcome.lock().await.clone(),
            download_available: self.last_download.lock().await.is_some(),
        }
    }

    /// Run one submission end to end.
    pub async fn submit(&self) -> Result<SortedFile, SubmitError> {
        let payload = {
            let draft = self.draft.lock().await;
            let file = draft.file.clone().ok_or(SubmitError::MissingFile)?;
            if !is_csv_name(&file.name) {
                return Err(SubmitError::InvalidFileType);
            }
            SubmissionPayload {
                file,
                comments: draft.comments.clone(),
            }
        };

        let started = self.phase.send_if_modified(|phase| {
            if *phase == WorkflowPhase::Idle {
                *phase = WorkflowPhase::Validating;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(SubmitError::InFlight);
        }
        let _in_flight = InFlightGuard { phase: &self.phase };

        self.progress.send_replace(ProgressState::waiting());

        if let Err(e) = self.gate.revalidate().await {
            let error = SubmitError::from(e);
            warn!(error = %error, "Submission stopped before upload");
            self.finish(WorkflowOutcome::Failed {
                message: error.to_string(),
            })
            .await;
            return Err(error);
        }

        self.phase.send_replace(WorkflowPhase::Uploading);
        self.progress
            .send_replace(ProgressState::new(1.0, STARTED_MESSAGE));
        info!(
            file = %payload.file.name,
            bytes = payload.file.bytes.len(),
            "Submission uploading"
        );

        let cancel = CancellationToken::new();
        let ticker = ProgressTicker::new(
            self.progress.clone(),
            shuffled_messages(),
            self.progress_interval,
        )
        .spawn(cancel.clone());
        let ticker_guard = cancel.drop_guard();

        let result = self.sorter.sort(payload).await;

        drop(ticker_guard);
        if let Err(e) = ticker.await {
            warn!(error = %e, "Progress ticker ended abnormally");
        }

        match result {
            Ok(bytes) => {
                let sorted = SortedFile::new(bytes);
                self.progress
                    .send_replace(ProgressState::new(100.0, COMPLETE_MESSAGE));
                *self.last_download.lock().await = Some(sorted.clone());
                info!(
                    file = %sorted.file_name,
                    bytes = sorted.bytes.len(),
                    "Submission sorted"
                );
                self.finish(WorkflowOutcome::Succeeded {
                    file_name: sorted.file_name.clone(),
                })
                .await;
                Ok(sorted)
            }
            Err(e) => {
                warn!(error = %e, "Sort request failed");
                self.progress
                    .send_replace(ProgressState::new(0.0, FAILED_MESSAGE));
                self.finish(WorkflowOutcome::Failed {
                    message: FAILED_MESSAGE.to_string(),
                })
                .await;
                Err(SubmitError::SortFailed(e))
            }
        }
    }

    /// Publish the terminal phase, then return to `Idle`.
    async fn finish(&self, outcome: WorkflowOutcome) {
        let terminal = match outcome {
            WorkflowOutcome::Succeeded { .. } => WorkflowPhase::Succeeded,
            WorkflowOutcome::Failed { .. } => WorkflowPhase::Failed,
        };
        *self.outcome.lock().await = Some(outcome);
        self.phase.send_replace(terminal);
        self.phase.send_replace(WorkflowPhase::Idle);
    }
}

/// Returns the phase to `Idle` if a submission is abandoned mid-flight.
struct InFlightGuard<'a> {
    phase: &'a watch::Sender<WorkflowPhase>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_if_modified(|phase| {
            if phase.is_in_flight() {
                *phase = WorkflowPhase::Idle;
                true
            } else {
                false
            }
        });
    }
}
