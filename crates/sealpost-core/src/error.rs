//! Error types for the encryption gate and key configuration.
//!
//! Gate errors are the first three kinds of the relay's drop taxonomy; the
//! fourth (emission failure) belongs to the relay crate.

use sealpost_crypto::CryptoError;
use thiserror::Error;

/// Reasons the gate refused to produce ciphertext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// No key material is configured.
    ///
    /// An expected state, not a fault. The message must be dropped.
    #[error("no encryption key configured")]
    NotConfigured,

    /// Configured key material could not be parsed as an RSA public key
    #[error("configured key is unusable: {0}")]
    KeyParse(#[source] CryptoError),

    /// The cryptographic transform failed, including oversized input
    #[error("encryption failed: {0}")]
    Encryption(#[source] CryptoError),
}

impl GateError {
    /// Classify a crypto failure by whether the key or the input was at fault.
    pub(crate) fn from_crypto(err: CryptoError) -> Self {
        if err.is_key_error() { Self::KeyParse(err) } else { Self::Encryption(err) }
    }
}

/// Errors from writing key configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreError {
    /// Candidate failed trial encryption and was not stored
    #[error("candidate key rejected")]
    Rejected,

    /// Backing storage could not be written
    #[error("key store I/O error: {0}")]
    Io(String),
}
