//! Public and private key handling.
//!
//! Public keys are accepted in the loose form operators paste into a
//! settings screen: PEM with or without its `-----BEGIN/END-----` framing,
//! on one line or many, with arbitrary whitespace. Framing markers are cut
//! out wherever they appear, not only at the start of a line.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding},
    rand_core::CryptoRngCore,
    traits::PublicKeyParts,
};

use super::error::CryptoError;

/// SHA-256 output size, used for both the OAEP label hash and MGF1.
pub const DIGEST_SIZE: usize = 32;

/// Largest plaintext OAEP-SHA256 accepts for a modulus of
/// `key_size_bytes` bytes.
///
/// Returns 0 for moduli too small to carry any payload.
pub fn max_plaintext_len(key_size_bytes: usize) -> usize {
    key_size_bytes.saturating_sub(2 * DIGEST_SIZE + 2)
}

/// Parsed RSA public key used for OAEP encryption.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    inner: RsaPublicKey,
}

impl EncryptionKey {
    /// Parse PEM-framed (or bare base64) `SubjectPublicKeyInfo` key material.
    ///
    /// # Errors
    ///
    /// - `InvalidEncoding`: no key body, or the body is not valid base64
    /// - `InvalidKey`: the DER is not an RSA `SubjectPublicKeyInfo`
    pub fn from_pem(text: &str) -> Result<Self, CryptoError> {
        let der = decode_pem_body(text)?;
        let inner = RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| CryptoError::InvalidKey { reason: e.to_string() })?;

        Ok(Self { inner })
    }

    /// Modulus size in bytes (256 for a 2048-bit key).
    pub fn size_bytes(&self) -> usize {
        self.inner.size()
    }

    /// Largest plaintext this key can encrypt.
    pub fn max_plaintext_len(&self) -> usize {
        max_plaintext_len(self.size_bytes())
    }

    /// Encode as PEM `SubjectPublicKeyInfo`.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        self.inner
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey { reason: e.to_string() })
    }

    pub(super) fn as_rsa(&self) -> &RsaPublicKey {
        &self.inner
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey").field("bits", &(self.size_bytes() * 8)).finish()
    }
}

/// RSA private key, held by the collector side of the relay.
///
/// The relaying device never needs one. It is provided for collectors that
/// open envelopes, and for tests that check round-trips.
#[derive(Clone)]
pub struct DecryptionKey {
    inner: RsaPrivateKey,
}

impl DecryptionKey {
    /// Generate a fresh key pair of `bits` modulus size.
    pub fn generate<R: CryptoRngCore>(rng: &mut R, bits: usize) -> Result<Self, CryptoError> {
        let inner = RsaPrivateKey::new(rng, bits)
            .map_err(|e| CryptoError::InvalidKey { reason: e.to_string() })?;

        Ok(Self { inner })
    }

    /// Parse a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(text: &str) -> Result<Self, CryptoError> {
        let inner = RsaPrivateKey::from_pkcs8_pem(text.trim())
            .map_err(|e| CryptoError::InvalidKey { reason: e.to_string() })?;

        Ok(Self { inner })
    }

    /// Public half of this key pair.
    pub fn encryption_key(&self) -> EncryptionKey {
        EncryptionKey { inner: self.inner.to_public_key() }
    }

    /// Public half encoded as PEM, in the form operators configure.
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.encryption_key().to_pem()
    }

    pub(super) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }
}

impl fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKey").field("bits", &(self.inner.size() * 8)).finish()
    }
}

/// Strip PEM framing and whitespace, then base64-decode the remainder.
///
/// Splitting on `-----` leaves marker labels (`BEGIN PUBLIC KEY`, ...) at odd
/// positions and key material at even ones. Base64 never contains `-`.
fn decode_pem_body(text: &str) -> Result<Vec<u8>, CryptoError> {
    let body: String = text
        .split("-----")
        .step_by(2)
        .flat_map(|segment| segment.chars().filter(|c| !c.is_whitespace()))
        .collect();

    if body.is_empty() {
        return Err(CryptoError::InvalidEncoding { reason: "no key material".to_string() });
    }

    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| CryptoError::InvalidEncoding { reason: e.to_string() })
}
