//! Sealpost Cryptographic Primitives
//!
//! Asymmetric building blocks for the sealpost relay. Functions are pure
//! apart from the random source, which callers provide so tests can run with
//! a seeded RNG.
//!
//! # Scheme
//!
//! RSA with OAEP padding, SHA-256 as both the label digest and the MGF1
//! digest. Public keys arrive as PEM (or bare base64) wrapping a standard
//! `SubjectPublicKeyInfo` DER structure.
//!
//! ```text
//! PEM text
//!    │  strip framing + whitespace
//!    ▼
//! base64 body ──decode──▶ SPKI DER ──parse──▶ EncryptionKey
//!                                                  │
//! plaintext (≤ k - 2·hLen - 2 bytes) ──OAEP-SHA256─┘
//!                                                  ▼
//!                                             ciphertext (k bytes)
//! ```
//!
//! # Security
//!
//! Randomised padding:
//! - OAEP draws a fresh seed per encryption, so equal plaintexts produce
//!   unequal ciphertexts
//! - The RNG MUST be cryptographically secure outside of tests
//!
//! Size limit:
//! - Input is bounded by `key_size_bytes - 2 * 32 - 2`
//! - Oversized input is rejected with [`CryptoError::PlaintextTooLong`],
//!   never truncated
//!
//! Key hygiene:
//! - Only the public half is needed on the relaying device
//! - [`DecryptionKey`] exists for collectors and tests

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod oaep;

pub use oaep::{
    CryptoError, DIGEST_SIZE, DecryptionKey, EncryptionKey, decrypt, encrypt, is_usable_public_key,
    max_plaintext_len,
};
