// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Gate
//!
//! Blocks the sorting workflow until a valid access key is established.
//!
//! ## States
//!
//! ```text
//!            check()                     submit_key() ok
//! Checking ───────────► Granted ◄─────────────────────── Denied
//!     │                    │                                ▲
//!     └──── no/invalid ────┼────────────────────────────────┘
//!                          └── revalidate() explicitly invalid
//! ```
//!
//! - `Checking` is the initial state while a stored credential is re-validated;
//!   nothing should be rendered for it
//! - Entering `Granted` persists the credential
//! - An *explicit* invalid answer clears the store; transport failures leave
//!   it alone and simply keep (or put) the gate in `Denied`
//!
//! Gate operations run one at a time. A check that is still waiting on the
//! remote service cannot clear a key entered after it started.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::credentials::{CredentialStore, CredentialStoreError};
use crate::models::{AccessCredential, ValidationResult};
use crate::verifier::{KeyVerifier, VerifierError};

pub const EMPTY_KEY_MESSAGE: &str = "Please enter a key.";
pub const INVALID_KEY_MESSAGE: &str = "Invalid key.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Try again later.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    Checking,
    Granted {
        device_id: String,
    },
    Denied {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl GateState {
    pub fn is_granted(&self) -> bool {
        matches!(self, GateState::Granted { .. })
    }

    fn denied(message: Option<String>) -> Self {
        GateState::Denied { message }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("{}", EMPTY_KEY_MESSAGE)]
    EmptyKey,

    #[error("no stored access key")]
    NoCredential,

    /// The remote service explicitly refused the key.
    #[error("{0}")]
    Rejected(String),

    /// The remote service could not be asked.
    #[error("{}", SERVER_ERROR_MESSAGE)]
    Unavailable(#[source] VerifierError),

    #[error("credential storage failed: {0}")]
    Store(#[from] CredentialStoreError),
}

pub struct AccessGate {
    store: Arc<dyn CredentialStore>,
    verifier: Arc<dyn KeyVerifier>,
    state: RwLock<GateState>,
    /// Held for the whole of `check`, `submit_key` and `revalidate`.
    ops: Mutex<()>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn CredentialStore>, verifier: Arc<dyn KeyVerifier>) -> Self {
        Self {
            store,
            verifier,
            state: RwLock::new(GateState::Checking),
            ops: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> GateState {
        self.state.read().await.clone()
    }

    pub async fn is_granted(&self) -> bool {
        self.state.read().await.is_granted()
    }

    /// Startup check: re-validate whatever credential is stored.
    ///
    /// Always leaves the gate in `Granted` or `Denied`. A transport failure
    /// denies access for now but keeps the stored key for the next attempt.
    /// The current state stays visible until the answer arrives.
    pub async fn check(&self) -> GateState {
        let _op = self.ops.lock().await;

        let next = match self.revalidate_stored().await {
            Ok(credential) => GateState::Granted {
                device_id: credential.device_id,
            },
            Err(GateError::NoCredential) => GateState::denied(None),
            Err(GateError::Rejected(message)) => GateState::denied(Some(message)),
            Err(e) => {
                warn!(error = %e, "Stored access key could not be checked");
                GateState::denied(None)
            }
        };

        *self.state.write().await = next.clone();
        next
    }

    /// Handle a key typed into the gate.
    ///
    /// On success the credential is persisted and the gate is `Granted`; on
    /// any failure the gate stays `Denied` with a message for the user.
    pub async fn submit_key(&self, raw_key: &str) -> Result<AccessCredential, GateError> {
        let _op = self.ops.lock().await;
        let key = raw_key.trim();
        if key.is_empty() {
            self.deny(Some(EMPTY_KEY_MESSAGE.to_string())).await;
            return Err(GateError::EmptyKey);
        }

        match self.verify_new_key(key).await {
            Ok(credential) => {
                if let Err(e) = self.store.save(&credential) {
                    warn!(error = %e, "Accepted access key could not be stored");
                    self.deny(Some(SERVER_ERROR_MESSAGE.to_string())).await;
                    return Err(e.into());
                }
                info!(device_id = %credential.device_id, "Access key accepted");
                *self.state.write().await = GateState::Granted {
                    device_id: credential.device_id.clone(),
                };
                Ok(credential)
            }
            Err(e) => {
                warn!(error = %e, "Access key not accepted");
                self.deny(Some(user_message(&e))).await;
                Err(e)
            }
        }
    }

    /// Confirm the stored credential is still live, e.g. right before a
    /// protected submission.
    ///
    /// An explicit rejection clears the store and moves the gate to
    /// `Denied`. Transport failures are returned without touching either.
    pub async fn revalidate(&self) -> Result<AccessCredential, GateError> {
        let _op = self.ops.lock().await;
        match self.revalidate_stored().await {
            Ok(credential) => {
                *self.state.write().await = GateState::Granted {
                    device_id: credential.device_id.clone(),
                };
                Ok(credential)
            }
            Err(GateError::NoCredential) => {
                self.deny(None).await;
                Err(GateError::NoCredential)
            }
            Err(GateError::Rejected(message)) => {
                self.deny(Some(message.clone())).await;
                Err(GateError::Rejected(message))
            }
            Err(e) => Err(e),
        }
    }

    async fn deny(&self, message: Option<String>) {
        *self.state.write().await = GateState::denied(message);
    }

    /// Validate the stored pair, clearing it if the service rejects it.
    async fn revalidate_stored(&self) -> Result<AccessCredential, GateError> {
        let stored = self.store.load()?.ok_or(GateError::NoCredential)?;

        let result = self
            .verifier
            .validate(&stored.key, Some(&stored.device_id))
            .await
            .map_err(GateError::Unavailable)?;

        if !result.valid {
            warn!(
                device_id = %stored.device_id,
                message = ?result.message,
                "Stored access key rejected, clearing"
            );
            self.store.clear()?;
            return Err(GateError::Rejected(rejection_message(&result)));
        }

        match result.device_id {
            Some(device_id) if !device_id.is_empty() && device_id != stored.device_id => {
                let refreshed = AccessCredential::new(stored.key, device_id);
                self.store.save(&refreshed)?;
                info!(device_id = %refreshed.device_id, "Device binding refreshed");
                Ok(refreshed)
            }
            _ => Ok(stored),
        }
    }

    /// First-time verification, binding a device id when the service did
    /// not mint one on the verify call.
    async fn verify_new_key(&self, key: &str) -> Result<AccessCredential, GateError> {
        let result = self
            .verifier
            .verify(key, None)
            .await
            .map_err(GateError::Unavailable)?;
        if !result.valid {
            return Err(GateError::Rejected(rejection_message(&result)));
        }
        if let Some(device_id) = result.device_id.filter(|d| !d.is_empty()) {
            return Ok(AccessCredential::new(key, device_id));
        }

        let bound = self
            .verifier
            .validate(key, None)
            .await
            .map_err(GateError::Unavailable)?;
        if !bound.valid {
            return Err(GateError::Rejected(rejection_message(&bound)));
        }
        bound
            .device_id
            .filter(|d| !d.is_empty())
            .map(|device_id| AccessCredential::new(key, device_id))
            .ok_or_else(|| {
                GateError::Unavailable(VerifierError::InvalidResponse(
                    "no device id returned for accepted key".to_string(),
                ))
            })
    }
}

fn rejection_message(result: &ValidationResult) -> String {
    result
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| INVALID_KEY_MESSAGE.to_string())
}

/// Text shown in the gate for a failed key entry.
fn user_message(error: &GateError) -> String {
    match error {
        GateError::Rejected(message) => message.clone(),
        GateError::EmptyKey => EMPTY_KEY_MESSAGE.to_string(),
        _ => SERVER_ERROR_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialStoreResult, InMemoryCredentialStore};
    use crate::testing::FakeVerifier;

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    impl CredentialStore for ReadOnlyStore {
        fn load(&self) -> CredentialStoreResult<Option<AccessCredential>> {
            Ok(None)
        }

        fn save(&self, _: &AccessCredential) -> CredentialStoreResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn clear(&self) -> CredentialStoreResult<()> {
            Ok(())
        }
    }

    fn gate_with(
        stored: Option<AccessCredential>,
        verifier: Arc<FakeVerifier>,
    ) -> (AccessGate, Arc<InMemoryCredentialStore>) {
        let store = Arc::new(match stored {
            Some(credential) => InMemoryCredentialStore::with_credential(credential),
            None => InMemoryCredentialStore::new(),
        });
        let gate = AccessGate::new(store.clone(), verifier);
        (gate, store)
    }

    #[tokio::test]
    async fn starts_in_checking() {
        let (gate, _) = gate_with(None, Arc::new(FakeVerifier::new()));
        assert_eq!(gate.state().await, GateState::Checking);
    }

    #[tokio::test]
    async fn stored_valid_credential_is_granted_and_unchanged() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_validate(Ok(ValidationResult::granted("D1")));
        let stored = AccessCredential::new("ABC", "D1");
        let (gate, store) = gate_with(Some(stored.clone()), verifier.clone());

        let state = gate.check().await;

        assert_eq!(
            state,
            GateState::Granted {
                device_id: "D1".to_string()
            }
        );
        assert_eq!(store.load().unwrap(), Some(stored));
        assert_eq!(
            verifier.validate_calls(),
            vec![("ABC".to_string(), Some("D1".to_string()))]
        );
    }

    #[tokio::test]
    async fn no_credential_denies_without_network() {
        let verifier = Arc::new(FakeVerifier::new());
        let (gate, _) = gate_with(None, verifier.clone());

        assert_eq!(gate.check().await, GateState::Denied { message: None });
        assert!(verifier.validate_calls().is_empty());
        assert!(verifier.verify_calls().is_empty());
    }

    #[tokio::test]
    async fn rejected_stored_credential_is_cleared() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_validate(Ok(ValidationResult::rejected("Key expired.")));
        let (gate, store) = gate_with(Some(AccessCredential::new("ABC", "D1")), verifier);

        let state = gate.check().await;

        assert_eq!(
            state,
            GateState::Denied {
                message: Some("Key expired.".to_string())
            }
        );
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn transport_failure_denies_but_keeps_credential() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_validate(Err(VerifierError::Request("connection refused".into())));
        let stored = AccessCredential::new("ABC", "D1");
        let (gate, store) = gate_with(Some(stored.clone()), verifier);

        assert_eq!(gate.check().await, GateState::Denied { message: None });
        assert_eq!(store.load().unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn new_key_is_verified_and_persisted() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_verify(Ok(ValidationResult::granted("D9")));
        let (gate, store) = gate_with(None, verifier.clone());
        gate.check().await;

        let credential = gate.submit_key("  XYZ ").await.unwrap();

        assert_eq!(credential, AccessCredential::new("XYZ", "D9"));
        assert!(store.load().unwrap().unwrap().same_pair(&credential));
        assert_eq!(
            gate.state().await,
            GateState::Granted {
                device_id: "D9".to_string()
            }
        );
        assert_eq!(verifier.verify_calls(), vec![("XYZ".to_string(), None)]);
    }

    #[tokio::test]
    async fn empty_key_is_refused_locally() {
        let verifier = Arc::new(FakeVerifier::new());
        let (gate, _) = gate_with(None, verifier.clone());

        let err = gate.submit_key("   ").await.unwrap_err();

        assert!(matches!(err, GateError::EmptyKey));
        assert!(verifier.verify_calls().is_empty());
        assert_eq!(
            gate.state().await,
            GateState::Denied {
                message: Some(EMPTY_KEY_MESSAGE.to_string())
            }
        );
    }

    #[tokio::test]
    async fn rejected_key_is_not_stored() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_verify(Ok(ValidationResult {
            valid: false,
            device_id: None,
            message: None,
        }));
        let (gate, store) = gate_with(None, verifier);

        let err = gate.submit_key("BAD").await.unwrap_err();

        assert!(matches!(err, GateError::Rejected(ref m) if m == INVALID_KEY_MESSAGE));
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(
            gate.state().await,
            GateState::Denied {
                message: Some(INVALID_KEY_MESSAGE.to_string())
            }
        );
    }

    #[tokio::test]
    async fn server_error_on_key_entry_shows_generic_message() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_verify(Err(VerifierError::InvalidResponse("html".into())));
        let (gate, store) = gate_with(None, verifier);

        assert!(matches!(
            gate.submit_key("XYZ").await,
            Err(GateError::Unavailable(_))
        ));
        assert_eq!(store.load().unwrap(), None);
        assert_eq!(
            gate.state().await,
            GateState::Denied {
                message: Some(SERVER_ERROR_MESSAGE.to_string())
            }
        );
    }

    #[tokio::test]
    async fn verify_without_device_binds_through_validate() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_verify(Ok(ValidationResult {
            valid: true,
            device_id: None,
            message: None,
        }));
        verifier.push_validate(Ok(ValidationResult::granted("D5")));
        let (gate, store) = gate_with(None, verifier.clone());

        let credential = gate.submit_key("XYZ").await.unwrap();

        assert_eq!(credential.device_id, "D5");
        assert!(store.load().unwrap().is_some());
        assert_eq!(verifier.validate_calls(), vec![("XYZ".to_string(), None)]);
    }

    #[tokio::test]
    async fn revalidation_rejection_revokes_access() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_validate(Ok(ValidationResult::granted("D1")));
        verifier.push_validate(Ok(ValidationResult::rejected("Key usage limit reached.")));
        let (gate, store) = gate_with(Some(AccessCredential::new("ABC", "D1")), verifier);
        assert!(gate.check().await.is_granted());

        let err = gate.revalidate().await.unwrap_err();

        assert!(matches!(err, GateError::Rejected(ref m) if m == "Key usage limit reached."));
        assert!(!gate.is_granted().await);
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn revalidation_transport_failure_keeps_access() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_validate(Ok(ValidationResult::granted("D1")));
        verifier.push_validate(Err(VerifierError::Request("timeout".into())));
        let (gate, store) = gate_with(Some(AccessCredential::new("ABC", "D1")), verifier);
        gate.check().await;

        assert!(matches!(
            gate.revalidate().await,
            Err(GateError::Unavailable(_))
        ));
        assert!(gate.is_granted().await);
        assert!(store.load().unwrap().is_some());
    }

    #[tokio::test]
    async fn revalidation_with_new_device_overwrites_store() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_validate(Ok(ValidationResult::granted("D2")));
        let (gate, store) = gate_with(Some(AccessCredential::new("ABC", "D1")), verifier);

        let credential = gate.revalidate().await.unwrap();

        assert_eq!(credential.device_id, "D2");
        assert_eq!(store.load().unwrap().unwrap().device_id, "D2");
    }

    #[tokio::test]
    async fn storage_failure_on_key_entry_shows_server_error() {
        let verifier = Arc::new(FakeVerifier::new());
        verifier.push_verify(Ok(ValidationResult::granted("D9")));
        let gate = AccessGate::new(Arc::new(ReadOnlyStore), verifier);
        gate.check().await;

        assert!(matches!(
            gate.submit_key("XYZ").await,
            Err(GateError::Store(_))
        ));
        assert_eq!(
            gate.state().await,
            GateState::Denied {
                message: Some(SERVER_ERROR_MESSAGE.to_string())
            }
        );
    }

    #[tokio::test]
    async fn key_entered_during_check_survives_old_key_rejection() {
        let verifier = Arc::new(FakeVerifier::gated());
        verifier.push_validate(Ok(ValidationResult::rejected("Key expired.")));
        verifier.push_verify(Ok(ValidationResult::granted("D9")));
        let (gate, store) = gate_with(Some(AccessCredential::new("ABC", "D1")), verifier.clone());
        let gate = Arc::new(gate);

        let checking = tokio::spawn({
            let gate = gate.clone();
            async move { gate.check().await }
        });
        while verifier.validate_calls().is_empty() {
            tokio::task::yield_now().await;
        }

        let entering = tokio::spawn({
            let gate = gate.clone();
            async move { gate.submit_key("XYZ").await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(verifier.verify_calls().is_empty(), "key entry waits for the check");

        verifier.release();
        assert_eq!(
            checking.await.unwrap(),
            GateState::Denied {
                message: Some("Key expired.".to_string())
            }
        );
        verifier.release();
        let credential = entering.await.unwrap().unwrap();

        assert_eq!(credential, AccessCredential::new("XYZ", "D9"));
        assert_eq!(
            gate.state().await,
            GateState::Granted {
                device_id: "D9".to_string()
            }
        );
        assert!(store.load().unwrap().unwrap().same_pair(&credential));
    }

    #[tokio::test]
    async fn recheck_keeps_granted_visible_until_answered() {
        let verifier = Arc::new(FakeVerifier::gated());
        verifier.push_validate(Ok(ValidationResult::granted("D1")));
        verifier.push_validate(Ok(ValidationResult::granted("D1")));
        let (gate, _) = gate_with(Some(AccessCredential::new("ABC", "D1")), verifier.clone());
        let gate = Arc::new(gate);
        verifier.release();
        assert!(gate.check().await.is_granted());

        let rechecking = tokio::spawn({
            let gate = gate.clone();
            async move { gate.check().await }
        });
        while verifier.validate_calls().len() < 2 {
            tokio::task::yield_now().await;
        }

        assert!(gate.is_granted().await);
        verifier.release();
        assert!(rechecking.await.unwrap().is_granted());
    }
}
