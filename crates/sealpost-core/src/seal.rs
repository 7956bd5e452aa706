//! Turning an inbound message into an outbound event.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use zeroize::Zeroizing;

use crate::{
    error::GateError,
    event::{MessageId, OutboundEvent},
    gate::EncryptionGate,
    message::InboundMessage,
};

impl EncryptionGate {
    /// Encrypt the sensitive content of `message` and build its event.
    ///
    /// Consumes the message. Plaintext is moved into zeroizing buffers and
    /// wiped before this returns, whether sealing succeeded or not.
    ///
    /// Content selected per kind:
    /// - `Text`: the body
    /// - `BinaryData`: base64 of the bytes
    /// - `MultimediaNotice`: the subject, if any. Without a subject nothing
    ///   is encrypted, but the key must still parse
    ///
    /// CPU-bound (RSA); run it off any I/O scheduling pool.
    ///
    /// # Errors
    ///
    /// Any [`GateError`]. No event, partial or otherwise, exists on error.
    pub fn seal(&self, message: InboundMessage) -> Result<OutboundEvent, GateError> {
        let message_id = MessageId::derive(&message);

        match message {
            InboundMessage::Text { sender, received_at, body, sim_slot } => {
                let body = Zeroizing::new(body);
                let body = self.encrypt(&body)?;
                Ok(OutboundEvent::Sms { message_id, sender, received_at, sim_slot, body })
            },

            InboundMessage::BinaryData { sender, received_at, bytes, sim_slot } => {
                let bytes = Zeroizing::new(bytes);
                let encoded = Zeroizing::new(STANDARD.encode(bytes.as_slice()));
                let data = self.encrypt(&encoded)?;
                Ok(OutboundEvent::SmsData { message_id, sender, received_at, sim_slot, data })
            },

            InboundMessage::MultimediaNotice {
                sender,
                received_at,
                message_id: carrier_message_id,
                transaction_id,
                subject,
                size_bytes,
                content_class,
                sim_slot,
            } => {
                let subject = match subject.map(Zeroizing::new) {
                    Some(subject) => Some(self.encrypt(&subject)?),
                    None => {
                        self.check_key()?;
                        None
                    },
                };

                Ok(OutboundEvent::Mms {
                    message_id,
                    sender,
                    received_at,
                    sim_slot,
                    carrier_message_id,
                    transaction_id,
                    subject,
                    size_bytes,
                    content_class,
                })
            },
        }
    }
}
