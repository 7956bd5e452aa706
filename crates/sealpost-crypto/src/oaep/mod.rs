//! RSA-OAEP-SHA256 encryption.
//!
//! Key parsing lives in [`key`], the encrypt/decrypt transform in
//! [`encryption`].

mod encryption;
mod error;
mod key;

pub use encryption::{decrypt, encrypt, is_usable_public_key};
pub use error::CryptoError;
pub use key::{DIGEST_SIZE, DecryptionKey, EncryptionKey, max_plaintext_len};
