//! Fuzz target for public key parsing
//!
//! Whatever lands in the key setting must never crash the gate (HIGH
//! priority)
//!
//! # Strategy
//!
//! - Armor: Valid, missing, doubled, truncated, random label
//! - Body: Arbitrary bytes base64'd, raw text, whitespace-heavy
//!
//! # Invariants
//!
//! - `EncryptionKey::from_pem` returns an error, never panics
//! - `is_usable_public_key` agrees with a successful parse plus a trial
//!   encryption
//! - A closed gate or an unparsable key never produces ciphertext

#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealpost_core::{EncryptionGate, GateError, MemoryKeyStore};
use sealpost_crypto::{EncryptionKey, is_usable_public_key};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Clone, Arbitrary)]
struct KeyCandidate {
    armor: Armor,
    body: Body,
}

#[derive(Debug, Clone, Arbitrary)]
enum Armor {
    Valid,
    Missing,
    Doubled,
    HeaderOnly,
    Label(String),
}

#[derive(Debug, Clone, Arbitrary)]
enum Body {
    Encoded(Vec<u8>),
    Raw(String),
    Spaced(Vec<u8>, u8),
}

fn encode(bytes: &[u8]) -> String {
    // Loose encoding without padding rules: the parser should cope either way
    bytes.iter().map(|b| BASE64[(*b as usize) % 64] as char).collect()
}

fn render(candidate: &KeyCandidate) -> String {
    let body = match &candidate.body {
        Body::Encoded(bytes) => encode(bytes),
        Body::Raw(text) => text.clone(),
        Body::Spaced(bytes, every) => {
            let every = usize::from(*every).max(1);
            encode(bytes)
                .chars()
                .enumerate()
                .flat_map(|(i, c)| (i % every == 0).then_some('\n').into_iter().chain([c]))
                .collect()
        },
    };

    match &candidate.armor {
        Armor::Valid => format!("-----BEGIN PUBLIC KEY-----\n{body}\n-----END PUBLIC KEY-----\n"),
        Armor::Missing => body,
        Armor::Doubled => format!(
            "-----BEGIN PUBLIC KEY-----\n-----BEGIN PUBLIC KEY-----\n{body}\n-----END PUBLIC KEY-----"
        ),
        Armor::HeaderOnly => format!("-----BEGIN PUBLIC KEY-----\n{body}"),
        Armor::Label(label) => format!("-----BEGIN {label}-----\n{body}\n-----END {label}-----"),
    }
}

fuzz_target!(|candidate: KeyCandidate| {
    let pem = render(&candidate);

    let parsed = EncryptionKey::from_pem(&pem);
    let usable = is_usable_public_key(&pem);

    // Usable implies parsable
    if usable {
        assert!(parsed.is_ok(), "usable key failed to parse");
    }

    let gate = EncryptionGate::new(Arc::new(MemoryKeyStore::with_key(pem.clone())));
    match gate.encrypt("fuzz") {
        Ok(_) => assert!(parsed.is_ok(), "gate encrypted under an unparsable key"),
        Err(GateError::NotConfigured) => assert!(pem.trim().is_empty()),
        Err(GateError::KeyParse(_)) => assert!(parsed.is_err()),
        Err(GateError::Encryption(_)) => {},
    }
});
