//! Errors for RSA-OAEP operations.

use thiserror::Error;

/// Errors from key parsing, encryption and decryption.
///
/// Messages describe sizes and parser failures only. They never carry key
/// material, plaintext or ciphertext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key text is not valid PEM/base64, or contains no key body at all
    #[error("invalid key encoding: {reason}")]
    InvalidEncoding {
        /// Parser failure description
        reason: String,
    },

    /// Decoded bytes are not a usable RSA key structure
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// Parser failure description
        reason: String,
    },

    /// Plaintext exceeds what OAEP-SHA256 can carry for this key size
    #[error("plaintext too long: {len} bytes, maximum is {max}")]
    PlaintextTooLong {
        /// Length of the rejected plaintext
        len: usize,
        /// Maximum accepted length for the key in use
        max: usize,
    },

    /// The RSA transform itself failed
    #[error("encryption failed: {reason}")]
    EncryptionFailed {
        /// Failure description
        reason: String,
    },

    /// Ciphertext did not decrypt under the given private key
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Failure description
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if the failure is in the key material rather than the
    /// operation performed with it.
    pub fn is_key_error(&self) -> bool {
        matches!(self, Self::InvalidEncoding { .. } | Self::InvalidKey { .. })
    }
}
