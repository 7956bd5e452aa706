//! OAEP-SHA256 encryption and decryption.
//!
//! The random source is a parameter so tests can pin it. Production callers
//! pass the OS RNG.

use rand::rngs::OsRng;
use rsa::{Oaep, rand_core::CryptoRngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{
    error::CryptoError,
    key::{DecryptionKey, EncryptionKey},
};

/// Fixed trial plaintext used by [`is_usable_public_key`].
const TRIAL_PLAINTEXT: &[u8] = b"sealpost key check";

/// Encrypt `plaintext` under `key` with OAEP-SHA256.
///
/// Returns raw ciphertext of exactly `key.size_bytes()` bytes.
///
/// # Errors
///
/// - `PlaintextTooLong`: input exceeds [`EncryptionKey::max_plaintext_len`]
/// - `EncryptionFailed`: the RSA transform rejected the input
pub fn encrypt<R: CryptoRngCore>(
    key: &EncryptionKey,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    let max = key.max_plaintext_len();
    if plaintext.len() > max {
        return Err(CryptoError::PlaintextTooLong { len: plaintext.len(), max });
    }

    key.as_rsa()
        .encrypt(rng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed { reason: e.to_string() })
}

/// Decrypt OAEP-SHA256 ciphertext with the private key.
///
/// The returned buffer is zeroized on drop.
///
/// # Errors
///
/// - `DecryptionFailed`: wrong key, wrong padding, or tampered ciphertext
pub fn decrypt(key: &DecryptionKey, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    key.as_rsa()
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map(Zeroizing::new)
        .map_err(|e| CryptoError::DecryptionFailed { reason: e.to_string() })
}

/// Parse `candidate` and run one trial encryption with it.
///
/// Never fails: any parse or transform error yields `false`. Intended for
/// vetting a key before it replaces the active configuration.
pub fn is_usable_public_key(candidate: &str) -> bool {
    let Ok(key) = EncryptionKey::from_pem(candidate) else {
        return false;
    };

    encrypt(&key, TRIAL_PLAINTEXT, &mut OsRng).is_ok()
}
