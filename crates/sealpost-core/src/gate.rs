//! Fail-closed encryption gate.
//!
//! Two separate calls make up the gate: [`EncryptionGate::is_configured`]
//! answers "may anything be forwarded at all", and
//! [`EncryptionGate::encrypt`] performs the transform. Keeping them apart
//! lets the caller log "not configured" and "encryption failed" as distinct
//! drop reasons.

use std::sync::Arc;

use rand::rngs::OsRng;
use sealpost_crypto::EncryptionKey;

use crate::{envelope::EncryptedEnvelope, error::GateError, key_store::KeyStore};

/// Zero-trust gate in front of every forwarded message.
///
/// # Invariants
///
/// - Each call reads the key store afresh (no memoisation)
/// - Blank key material counts as "not configured"
/// - Oversized plaintext is an error, never truncated
#[derive(Clone)]
pub struct EncryptionGate {
    store: Arc<dyn KeyStore>,
}

impl EncryptionGate {
    /// Create a gate reading from `store`.
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    /// The key store this gate reads.
    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// True iff the store currently holds non-blank key material.
    ///
    /// Does not parse the key; a malformed key is still "configured".
    pub fn is_configured(&self) -> bool {
        self.store.get().is_some_and(|pem| !pem.trim().is_empty())
    }

    /// Parse the currently configured key.
    ///
    /// # Errors
    ///
    /// - `NotConfigured`: store is empty or blank
    /// - `KeyParse`: material is not an RSA public key
    pub fn check_key(&self) -> Result<EncryptionKey, GateError> {
        let pem = self
            .store
            .get()
            .filter(|pem| !pem.trim().is_empty())
            .ok_or(GateError::NotConfigured)?;

        EncryptionKey::from_pem(&pem).map_err(|e| {
            tracing::debug!(error = %e, "configured key failed to parse");
            GateError::KeyParse(e)
        })
    }

    /// Encrypt a string with the currently configured key.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedEnvelope, GateError> {
        self.encrypt_bytes(plaintext.as_bytes())
    }

    /// Encrypt raw bytes with the currently configured key.
    ///
    /// # Errors
    ///
    /// - `NotConfigured`: no key is set
    /// - `KeyParse`: the configured key cannot be parsed
    /// - `Encryption`: the transform failed (including too-long input)
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<EncryptedEnvelope, GateError> {
        let key = self.check_key()?;
        let ciphertext =
            sealpost_crypto::encrypt(&key, plaintext, &mut OsRng).map_err(GateError::from_crypto)?;

        Ok(EncryptedEnvelope::from_ciphertext(&ciphertext))
    }

    /// Vet a candidate key without touching the active configuration.
    ///
    /// Returns `false` on any failure; never errors.
    pub fn validate_key(&self, candidate: &str) -> bool {
        self.store.validate(candidate)
    }
}
