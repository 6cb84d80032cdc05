// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File-backed credential store.
//!
//! The credential lives in a single JSON file under the data directory:
//!
//! ```text
//! {DATA_DIR}/
//!   credentials.json   # { "access_key": ..., "device_id": ..., "saved_at": ... }
//! ```
//!
//! Writes go to a temp file first and are renamed into place, so a crash
//! never leaves a half-written credential behind.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::{CredentialStore, CredentialStoreResult};
use crate::models::AccessCredential;

pub const CREDENTIAL_FILE_NAME: &str = "credentials.json";

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store the credential in `credentials.json` under `data_dir`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(CREDENTIAL_FILE_NAME))
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check that the directory holding the credential is writable.
    ///
    /// Performs a write-read-delete round trip next to the credential file.
    pub fn health_check(&self) -> CredentialStoreResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let probe = dir.join(".health_check");
        let data = b"health_check_data";
        fs::write(&probe, data)?;
        let read_back = fs::read(&probe)?;
        fs::remove_file(&probe)?;

        if read_back != data {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "health check data mismatch").into());
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> CredentialStoreResult<Option<AccessCredential>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let credential: AccessCredential = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(credential).filter(AccessCredential::is_complete))
    }

    fn save(&self, credential: &AccessCredential) -> CredentialStoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut record = credential.clone();
        record.saved_at = Some(Utc::now());

        let temp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &record)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> CredentialStoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
