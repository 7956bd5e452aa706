//! Encrypted envelope.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// Transport-ready ciphertext of one sensitive field.
///
/// There is deliberately no plaintext field and no constructor taking
/// plaintext: envelopes are only minted from ciphertext bytes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    ciphertext: String,
}

impl EncryptedEnvelope {
    /// Wrap raw ciphertext, base64-encoding it.
    pub fn from_ciphertext(ciphertext: &[u8]) -> Self {
        Self { ciphertext: STANDARD.encode(ciphertext) }
    }

    /// Base64 ciphertext as sent to the collector.
    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    /// Raw ciphertext bytes.
    pub fn ciphertext_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.ciphertext.as_bytes())
    }
}

impl fmt::Debug for EncryptedEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedEnvelope")
            .field("ciphertext", &Redacted(self.ciphertext.len()))
            .finish()
    }
}

/// Debug stand-in for content that must not reach logs.
pub(crate) struct Redacted(pub(crate) usize);

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} bytes>", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ciphertext_roundtrips_through_base64() {
        let envelope = EncryptedEnvelope::from_ciphertext(&[0u8, 1, 2, 255]);

        assert_eq!(envelope.ciphertext(), "AAEC/w==");
        assert_eq!(envelope.ciphertext_bytes().unwrap(), vec![0u8, 1, 2, 255]);
    }

    #[test]
    fn debug_hides_ciphertext() {
        let envelope = EncryptedEnvelope::from_ciphertext(&[7u8; 256]);
        let rendered = format!("{envelope:?}");

        assert!(!rendered.contains(envelope.ciphertext()));
        assert_eq!(rendered, "EncryptedEnvelope { ciphertext: <344 bytes> }");
    }
}
