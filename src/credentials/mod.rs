// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Storage
//!
//! Persistence for the access key / device id pair. The gate and the
//! submission workflow receive a [`CredentialStore`] instead of touching
//! storage directly, so tests can inject [`InMemoryCredentialStore`].
//!
//! ## Semantics
//!
//! - `load` returns `None` when nothing is stored or when the stored record
//!   is missing either half of the pair
//! - `save` overwrites any previous credential
//! - `clear` is idempotent
//!
//! No expiry is tracked here; the remote service is the only authority on
//! whether a key is still usable.

mod file;

use std::sync::{Mutex, PoisonError};

pub use file::{FileCredentialStore, CREDENTIAL_FILE_NAME};

use crate::models::AccessCredential;

#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("credential store lock poisoned")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for CredentialStoreError {
    fn from(_: PoisonError<T>) -> Self {
        CredentialStoreError::Poisoned
    }
}

pub type CredentialStoreResult<T> = Result<T, CredentialStoreError>;

/// Durable storage for a single [`AccessCredential`].
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> CredentialStoreResult<Option<AccessCredential>>;

    fn save(&self, credential: &AccessCredential) -> CredentialStoreResult<()>;

    fn clear(&self) -> CredentialStoreResult<()>;
}

/// Process-local store used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    slot: Mutex<Option<AccessCredential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: AccessCredential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> CredentialStoreResult<Option<AccessCredential>> {
        let slot = self.slot.lock()?;
        Ok(slot.clone().filter(AccessCredential::is_complete))
    }

    fn save(&self, credential: &AccessCredential) -> CredentialStoreResult<()> {
        *self.slot.lock()? = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> CredentialStoreResult<()> {
        *self.slot.lock()? = None;
        Ok(())
    }
}
