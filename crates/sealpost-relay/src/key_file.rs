//! File-backed key configuration.
//!
//! The settings collaborator writes a PEM file; the relay reads it. Every
//! `get` re-reads the file, so a rotated key is used by the next message
//! without restarting the relay.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use sealpost_core::{KeyStore, KeyStoreError};

/// Key store reading a PEM file on every access.
///
/// A missing file means "not configured". Any other read error is logged
/// and also reported as "not configured", so the gate stays closed.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    /// Use the PEM file at `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Key file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl KeyStore for FileKeyStore {
    fn get(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "key file unreadable");
                None
            },
        }
    }

    /// Writes go through a staging file and a rename, so readers see either
    /// the old key or the new one.
    fn set(&self, value: Option<String>) -> Result<(), KeyStoreError> {
        match value {
            Some(pem) => {
                let staging = self.staging_path();
                std::fs::write(&staging, pem.as_bytes())
                    .and_then(|()| std::fs::rename(&staging, &self.path))
                    .map_err(|e| KeyStoreError::Io(e.to_string()))
            },
            None => match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(KeyStoreError::Io(e.to_string())),
            },
        }
    }
}
