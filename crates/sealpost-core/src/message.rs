//! Inbound message model.
//!
//! Messages are produced by the ingestion adapter (live receiver or inbox
//! export) and consumed exactly once by the relay. Nothing here is ever
//! persisted by the relay itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{envelope::Redacted, event::MessageId};

/// Content kinds the device can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain SMS text
    Text,
    /// Binary (port-addressed) SMS
    BinaryData,
    /// MMS download notification
    MultimediaNotice,
}

impl MessageKind {
    /// Stable lowercase name, used in logs and identity hashing.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::BinaryData => "binary_data",
            Self::MultimediaNotice => "multimedia_notice",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A received message, normalised by the ingestion adapter.
///
/// Timestamps are milliseconds since the Unix epoch. `sender` and
/// `received_at` are present on every variant.
///
/// JSON form is internally tagged by `"kind"` with camelCase fields;
/// binary payloads are standard base64.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    /// Plain SMS text
    Text {
        /// Originating address
        sender: String,
        /// Receipt time (ms since epoch)
        received_at: u64,
        /// Message text (sensitive)
        body: String,
        /// SIM slot the message arrived on, if known
        #[serde(default)]
        sim_slot: Option<u8>,
    },

    /// Binary SMS
    BinaryData {
        /// Originating address
        sender: String,
        /// Receipt time (ms since epoch)
        received_at: u64,
        /// Raw payload (sensitive)
        #[serde(with = "base64_bytes")]
        bytes: Vec<u8>,
        /// SIM slot the message arrived on, if known
        #[serde(default)]
        sim_slot: Option<u8>,
    },

    /// MMS notification. Only the subject is sensitive; the rest is routing
    /// and size metadata.
    MultimediaNotice {
        /// Originating address
        sender: String,
        /// Receipt time (ms since epoch)
        received_at: u64,
        /// Carrier-assigned message id
        message_id: String,
        /// Carrier transaction id
        transaction_id: String,
        /// Subject line (sensitive)
        #[serde(default)]
        subject: Option<String>,
        /// Declared message size
        size_bytes: u64,
        /// MMS content class
        content_class: String,
        /// SIM slot the notice arrived on, if known
        #[serde(default)]
        sim_slot: Option<u8>,
    },
}

impl InboundMessage {
    /// Content kind.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::BinaryData { .. } => MessageKind::BinaryData,
            Self::MultimediaNotice { .. } => MessageKind::MultimediaNotice,
        }
    }

    /// Originating address.
    pub fn sender(&self) -> &str {
        match self {
            Self::Text { sender, .. }
            | Self::BinaryData { sender, .. }
            | Self::MultimediaNotice { sender, .. } => sender,
        }
    }

    /// Receipt time in milliseconds since the Unix epoch.
    pub fn received_at(&self) -> u64 {
        match self {
            Self::Text { received_at, .. }
            | Self::BinaryData { received_at, .. }
            | Self::MultimediaNotice { received_at, .. } => *received_at,
        }
    }

    /// SIM slot, if the adapter reported one.
    pub fn sim_slot(&self) -> Option<u8> {
        match self {
            Self::Text { sim_slot, .. }
            | Self::BinaryData { sim_slot, .. }
            | Self::MultimediaNotice { sim_slot, .. } => *sim_slot,
        }
    }

    /// Best-effort correlation id. See [`MessageId`].
    pub fn message_id(&self) -> MessageId {
        MessageId::derive(self)
    }

    /// Drop the message, wiping its sensitive content first.
    pub fn discard(self) {
        match self {
            Self::Text { body, .. } => drop(Zeroizing::new(body)),
            Self::BinaryData { bytes, .. } => drop(Zeroizing::new(bytes)),
            Self::MultimediaNotice { subject, .. } => drop(subject.map(Zeroizing::new)),
        }
    }
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { sender, received_at, body, sim_slot } => f
                .debug_struct("Text")
                .field("sender", sender)
                .field("received_at", received_at)
                .field("body", &Redacted(body.len()))
                .field("sim_slot", sim_slot)
                .finish(),
            Self::BinaryData { sender, received_at, bytes, sim_slot } => f
                .debug_struct("BinaryData")
                .field("sender", sender)
                .field("received_at", received_at)
                .field("bytes", &Redacted(bytes.len()))
                .field("sim_slot", sim_slot)
                .finish(),
            Self::MultimediaNotice {
                sender,
                received_at,
                message_id,
                transaction_id,
                subject,
                size_bytes,
                content_class,
                sim_slot,
            } => f
                .debug_struct("MultimediaNotice")
                .field("sender", sender)
                .field("received_at", received_at)
                .field("message_id", message_id)
                .field("transaction_id", transaction_id)
                .field("subject", &subject.as_ref().map(|s| Redacted(s.len())))
                .field("size_bytes", size_bytes)
                .field("content_class", content_class)
                .field("sim_slot", sim_slot)
                .finish(),
        }
    }
}

/// Serde adapter: `Vec<u8>` as a standard base64 string.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}
