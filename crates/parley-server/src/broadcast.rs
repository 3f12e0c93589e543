//! Broadcast engine — fan-out of one frame to everyone except its sender.
//!
//! Delivery is best-effort: no acknowledgement, no retry, no backpressure.
//! Each peer's write is attempted independently, so one dead or slow peer
//! never blocks delivery to the rest.

use std::sync::Arc;

use parley_core::cipher;
use parley_core::frame::{EventKind, Frame};

use crate::registry::ClientRegistry;

#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ClientRegistry>,
    shift: u8,
}

impl Broadcaster {
    pub fn new(registry: Arc<ClientRegistry>, shift: u8) -> Self {
        Self { registry, shift }
    }

    pub fn shift(&self) -> u8 {
        self.shift
    }

    /// Relay a chat message to every session except the sender.
    ///
    /// The body is ciphered here, once, before the frame is composed;
    /// returns the ciphered text so the caller can log what went out.
    pub async fn chat(&self, body: &str, sender_id: u64, sender_name: &str) -> String {
        let ciphered = cipher::encode(body, self.shift);
        let frame = Frame::Chat {
            sender: sender_name.to_string(),
            sender_id,
            body: ciphered.clone(),
        };
        self.send_excluding(&frame, sender_id).await;
        ciphered
    }

    /// Announce a join or leave to every session except the subject.
    pub async fn event(&self, kind: EventKind, session_id: u64, text: &str) {
        let frame = Frame::Event {
            kind,
            session_id,
            text: text.to_string(),
        };
        self.send_excluding(&frame, session_id).await;
    }

    async fn send_excluding(&self, frame: &Frame, exclude_id: u64) {
        // One encode; the Bytes payload is shared across all recipients.
        let payload = frame.encode();
        for peer in self.registry.snapshot() {
            if peer.id() == exclude_id {
                continue;
            }
            if let Err(e) = peer.send(&payload).await {
                // Best-effort: the peer's own session handler will notice
                // the broken stream and clean up.
                tracing::debug!(peer_id = peer.id(), error = %e, "dropping undeliverable frame");
            }
        }
    }
}
