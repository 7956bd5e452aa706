//! Key configuration capability.
//!
//! The gate never holds key material of its own. It asks a [`KeyStore`] on
//! every call, so a rotation through the settings collaborator takes effect
//! for the very next message.

use std::sync::{PoisonError, RwLock};

use crate::error::KeyStoreError;

/// Source of the configured public key.
///
/// Must be Send + Sync: the relay reads it concurrently from every in-flight
/// message task while settings may write it.
pub trait KeyStore: Send + Sync + 'static {
    /// Current PEM key material. `None` means "not configured".
    fn get(&self) -> Option<String>;

    /// Replace (or with `None`, clear) the key material.
    fn set(&self, value: Option<String>) -> Result<(), KeyStoreError>;

    /// Trial-parse and trial-encrypt a candidate without touching the
    /// active configuration.
    fn validate(&self, candidate: &str) -> bool {
        sealpost_crypto::is_usable_public_key(candidate)
    }

    /// Store `candidate` only if it passes [`KeyStore::validate`].
    ///
    /// A rejected candidate leaves the active key untouched.
    fn set_validated(&self, candidate: &str) -> Result<(), KeyStoreError> {
        if !self.validate(candidate) {
            return Err(KeyStoreError::Rejected);
        }
        self.set(Some(candidate.to_string()))
    }
}

/// In-memory key store for tests and embedding.
///
/// A single `RwLock` around the scalar value: readers never observe a torn
/// write.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    value: RwLock<Option<String>>,
}

impl MemoryKeyStore {
    /// Create an unconfigured store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `pem`.
    pub fn with_key(pem: impl Into<String>) -> Self {
        Self { value: RwLock::new(Some(pem.into())) }
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self) -> Option<String> {
        self.value.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, value: Option<String>) -> Result<(), KeyStoreError> {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unconfigured() {
        assert_eq!(MemoryKeyStore::new().get(), None);
    }

    #[test]
    fn set_and_clear() {
        let store = MemoryKeyStore::new();

        store.set(Some("pem".to_string())).unwrap();
        assert_eq!(store.get().as_deref(), Some("pem"));

        store.set(None).unwrap();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn rejected_candidate_keeps_active_key() {
        let store = MemoryKeyStore::with_key("active");

        assert_eq!(store.set_validated("not-a-key"), Err(KeyStoreError::Rejected));
        assert_eq!(store.get().as_deref(), Some("active"));
    }
}
