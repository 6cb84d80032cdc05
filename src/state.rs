// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ClientConfig, DEFAULT_MAX_UPLOAD_BYTES};
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::gate::AccessGate;
use crate::shell::NavigationShell;
use crate::sorter::{HttpSortClient, SortClient, SortError};
use crate::verifier::{HttpKeyVerifier, KeyVerifier, VerifierError};
use crate::workflow::SubmissionWorkflow;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Verifier(#[from] VerifierError),

    #[error(transparent)]
    Sorter(#[from] SortError),
}

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AccessGate>,
    pub workflow: Arc<SubmissionWorkflow>,
    pub shell: NavigationShell,
    /// Body limit for the multipart upload routes.
    pub max_upload_bytes: usize,
    /// Present when the credential lives on disk; used by readiness checks.
    pub credential_file: Option<FileCredentialStore>,
}

impl AppState {
    /// Wire the gate and workflow around the given collaborators.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        verifier: Arc<dyn KeyVerifier>,
        sorter: Arc<dyn SortClient>,
        progress_interval: Duration,
    ) -> Self {
        let gate = Arc::new(AccessGate::new(store, verifier));
        let workflow = Arc::new(SubmissionWorkflow::new(
            gate.clone(),
            sorter,
            progress_interval,
        ));
        let shell = NavigationShell::new(workflow.subscribe_phase());
        Self {
            gate,
            workflow,
            shell,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            credential_file: None,
        }
    }

    /// Production wiring: file-backed store and HTTP clients for the remote API.
    pub fn from_config(config: &ClientConfig) -> Result<Self, StateError> {
        let file_store = FileCredentialStore::in_dir(&config.data_dir);
        let verifier = HttpKeyVerifier::new(&config.api_base_url, config.verify_timeout)?;
        let sorter = HttpSortClient::new(&config.api_base_url, config.sort_timeout)?;

        let mut state = Self::new(
            Arc::new(file_store.clone()),
            Arc::new(verifier),
            Arc::new(sorter),
            config.progress_interval,
        );
        state.credential_file = Some(file_store);
        state.max_upload_bytes = config.max_upload_bytes;
        Ok(state)
    }
}
