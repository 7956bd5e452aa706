//! Sealpost core.
//!
//! The data model and the zero-trust encryption gate of the relay. Nothing in
//! this crate performs I/O or depends on an async runtime; the relay crate
//! wires these pieces to tasks, ports and files.
//!
//! # Data flow
//!
//! ```text
//! InboundMessage ──▶ EncryptionGate::is_configured ──no──▶ drop
//!                         │yes
//!                         ▼
//!                    EncryptionGate::seal ──err──▶ drop
//!                         │ok
//!                         ▼
//!                    OutboundEvent (envelopes only)
//! ```
//!
//! # Invariants
//!
//! - Every sensitive field of an [`OutboundEvent`] is an
//!   [`EncryptedEnvelope`]. The relay builds events only through
//!   [`EncryptionGate::seal`], which returns one only when encryption
//!   succeeded
//! - [`EncryptedEnvelope`] has no plaintext field
//! - The gate reads the [`KeyStore`] on every call; there is no key cache to
//!   go stale after rotation
//! - `Debug` output of messages, envelopes and events never contains
//!   content, only lengths

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
mod envelope;
mod error;
mod event;
mod gate;
mod key_store;
mod message;
mod seal;

pub use envelope::EncryptedEnvelope;
pub use error::{GateError, KeyStoreError};
pub use event::{EventKind, MessageId, OutboundEvent};
pub use gate::EncryptionGate;
pub use key_store::{KeyStore, MemoryKeyStore};
pub use message::{InboundMessage, MessageKind};
