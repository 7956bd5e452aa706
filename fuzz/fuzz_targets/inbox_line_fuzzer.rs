//! Fuzz target for inbox line decoding
//!
//! Live feeds and inbox exports are untrusted JSON lines (MEDIUM priority)
//!
//! # Invariants
//!
//! - Decoding arbitrary bytes as an `InboundMessage` never panics
//! - A decoded message has a stable id
//! - Sealing with no key configured always fails closed

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use sealpost_core::{EncryptionGate, GateError, InboundMessage, MemoryKeyStore};

fuzz_target!(|data: &[u8]| {
    let Ok(message) = serde_json::from_slice::<InboundMessage>(data) else {
        return;
    };

    assert_eq!(message.message_id(), message.message_id());

    let gate = EncryptionGate::new(Arc::new(MemoryKeyStore::new()));
    assert!(matches!(gate.seal(message), Err(GateError::NotConfigured)));
});
