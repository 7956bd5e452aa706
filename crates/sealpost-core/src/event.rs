//! Outbound events and message identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{envelope::EncryptedEnvelope, message::InboundMessage};

/// Event kinds accepted by the emission port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Text SMS forwarded
    #[serde(rename = "sms:received")]
    SmsReceived,
    /// Binary SMS forwarded
    #[serde(rename = "sms:data-received")]
    SmsDataReceived,
    /// MMS notice forwarded
    #[serde(rename = "mms:received")]
    MmsReceived,
}

impl EventKind {
    /// Wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmsReceived => "sms:received",
            Self::SmsDataReceived => "sms:data-received",
            Self::MmsReceived => "mms:received",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort message correlation id.
///
/// The first 64 bits of SHA-256 over the kind, sender, receipt time, SIM
/// slot and, for MMS, the carrier message and transaction ids. Two distinct
/// messages from the same sender in the same millisecond collide; treat the
/// id as a hint, never as a unique key.
///
/// Content (body, bytes, subject) is not hashed, so an id cannot confirm a
/// guessed plaintext.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MessageId(u64);

impl MessageId {
    /// Derive the id of `message`.
    pub fn derive(message: &InboundMessage) -> Self {
        let mut hasher = Sha256::new();

        hash_field(&mut hasher, message.kind().as_str().as_bytes());
        hash_field(&mut hasher, message.sender().as_bytes());
        hasher.update(message.received_at().to_be_bytes());
        match message.sim_slot() {
            Some(slot) => hasher.update([1u8, slot]),
            None => hasher.update([0u8]),
        }

        if let InboundMessage::MultimediaNotice { message_id, transaction_id, .. } = message {
            hash_field(&mut hasher, message_id.as_bytes());
            hash_field(&mut hasher, transaction_id.as_bytes());
        }

        let digest = hasher.finalize();
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        Self(u64::from_be_bytes(prefix))
    }

    /// Raw 64-bit value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Length-prefix variable fields so ("ab","c") and ("a","bc") differ.
fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({self})")
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for MessageId {
    type Error = std::num::ParseIntError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        u64::from_str_radix(&text, 16).map(Self)
    }
}

/// Event handed to the emission port.
///
/// Mirrors [`InboundMessage`] but every sensitive field is an
/// [`EncryptedEnvelope`]. The relay obtains these only from
/// [`EncryptionGate::seal`]; the variants stay public so collectors can
/// deserialize them.
///
/// [`EncryptionGate::seal`]: crate::EncryptionGate::seal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OutboundEvent {
    /// Forwarded text SMS
    Sms {
        /// Correlation hint
        message_id: MessageId,
        /// Originating address
        sender: String,
        /// Receipt time (ms since epoch)
        received_at: u64,
        /// SIM slot, if known
        sim_slot: Option<u8>,
        /// Encrypted message text
        body: EncryptedEnvelope,
    },

    /// Forwarded binary SMS
    SmsData {
        /// Correlation hint
        message_id: MessageId,
        /// Originating address
        sender: String,
        /// Receipt time (ms since epoch)
        received_at: u64,
        /// SIM slot, if known
        sim_slot: Option<u8>,
        /// Encrypted base64 of the payload bytes
        data: EncryptedEnvelope,
    },

    /// Forwarded MMS notice
    Mms {
        /// Correlation hint
        message_id: MessageId,
        /// Originating address
        sender: String,
        /// Receipt time (ms since epoch)
        received_at: u64,
        /// SIM slot, if known
        sim_slot: Option<u8>,
        /// Carrier-assigned message id
        carrier_message_id: String,
        /// Carrier transaction id
        transaction_id: String,
        /// Encrypted subject, when the notice had one
        subject: Option<EncryptedEnvelope>,
        /// Declared message size
        size_bytes: u64,
        /// MMS content class
        content_class: String,
    },
}

impl OutboundEvent {
    /// Emission kind for this event.
    pub fn event_kind(&self) -> EventKind {
        match self {
            Self::Sms { .. } => EventKind::SmsReceived,
            Self::SmsData { .. } => EventKind::SmsDataReceived,
            Self::Mms { .. } => EventKind::MmsReceived,
        }
    }

    /// Correlation hint.
    pub fn message_id(&self) -> MessageId {
        match self {
            Self::Sms { message_id, .. }
            | Self::SmsData { message_id, .. }
            | Self::Mms { message_id, .. } => *message_id,
        }
    }

    /// Originating address.
    pub fn sender(&self) -> &str {
        match self {
            Self::Sms { sender, .. } | Self::SmsData { sender, .. } | Self::Mms { sender, .. } => {
                sender
            },
        }
    }

    /// Receipt time of the originating message (ms since epoch).
    pub fn received_at(&self) -> u64 {
        match self {
            Self::Sms { received_at, .. }
            | Self::SmsData { received_at, .. }
            | Self::Mms { received_at, .. } => *received_at,
        }
    }

    /// Every envelope carried by this event.
    pub fn envelopes(&self) -> Vec<&EncryptedEnvelope> {
        match self {
            Self::Sms { body, .. } => vec![body],
            Self::SmsData { data, .. } => vec![data],
            Self::Mms { subject, .. } => subject.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(sender: &str, received_at: u64, body: &str) -> InboundMessage {
        InboundMessage::Text {
            sender: sender.to_string(),
            received_at,
            body: body.to_string(),
            sim_slot: None,
        }
    }

    #[test]
    fn message_id_is_stable() {
        let a = text("+15550000", 42, "hello");
        assert_eq!(a.message_id(), a.clone().message_id());
    }

    #[test]
    fn message_id_ignores_content() {
        assert_eq!(
            text("+15550000", 42, "OTP 111111").message_id(),
            text("+15550000", 42, "OTP 222222").message_id()
        );
    }

    #[test]
    fn message_id_separates_identity_fields() {
        let base = text("+15550000", 42, "x").message_id();

        assert_ne!(base, text("+15550001", 42, "x").message_id());
        assert_ne!(base, text("+15550000", 43, "x").message_id());
    }

    #[test]
    fn message_id_hex_roundtrip() {
        let id = text("+1", 1, "x").message_id();
        let encoded = String::from(id);

        assert_eq!(encoded.len(), 16);
        assert_eq!(MessageId::try_from(encoded).unwrap(), id);
    }

    #[test]
    fn event_kind_wire_names() {
        assert_eq!(serde_json::to_string(&EventKind::SmsReceived).unwrap(), "\"sms:received\"");
        assert_eq!(
            serde_json::to_string(&EventKind::SmsDataReceived).unwrap(),
            "\"sms:data-received\""
        );
        assert_eq!(EventKind::MmsReceived.to_string(), "mms:received");
    }

    #[test]
    fn mms_without_subject_carries_no_envelopes() {
        let event = OutboundEvent::Mms {
            message_id: MessageId(1),
            sender: "+1".to_string(),
            received_at: 1,
            sim_slot: None,
            carrier_message_id: "m".to_string(),
            transaction_id: "t".to_string(),
            subject: None,
            size_bytes: 1,
            content_class: "text".to_string(),
        };

        assert!(event.envelopes().is_empty());
        assert_eq!(event.event_kind(), EventKind::MmsReceived);
    }

    #[test]
    fn event_json_shape() {
        let event = OutboundEvent::Sms {
            message_id: MessageId(0xAB),
            sender: "+15550000".to_string(),
            received_at: 7,
            sim_slot: Some(2),
            body: EncryptedEnvelope::from_ciphertext(b"ct"),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "sms");
        assert_eq!(json["messageId"], "00000000000000ab");
        assert_eq!(json["simSlot"], 2);
        assert_eq!(json["body"]["ciphertext"], "Y3Q=");
    }

    #[test]
    fn collectors_decode_emitted_events() {
        let event = OutboundEvent::SmsData {
            message_id: MessageId(9),
            sender: "+15550000".to_string(),
            received_at: 7,
            sim_slot: None,
            data: EncryptedEnvelope::from_ciphertext(b"ct"),
        };

        let json = serde_json::to_string(&event).unwrap();
        let decoded: OutboundEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, event);
        assert_eq!(decoded.envelopes().len(), 1);
    }
}
