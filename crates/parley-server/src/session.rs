//! Per-connection session handler.
//!
//! Lifecycle: Connecting → Handshake → Active → Closing → Terminated.
//! The handler is inserted into the registry before its name is known;
//! the first frame on the connection is the display name, and the handshake
//! completes with a join announcement. From there the active loop relays
//! chat frames until the exit token, a stream error, or shutdown.
//!
//! A leave announcement is sent ONLY for the explicit exit token. An abrupt
//! disconnect (EOF, read error, oversize frame) tears the session down
//! silently — asserted as current behavior by the integration tests.

use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::broadcast;

use parley_core::frame::{self, EventKind, FrameError, FrameReader, EXIT_TOKEN};

use crate::broadcast::Broadcaster;
use crate::registry::{ClientHandle, ClientRegistry};

pub struct SessionHandler {
    handle: Arc<ClientHandle>,
    reader: FrameReader<OwnedReadHalf>,
    registry: Arc<ClientRegistry>,
    broadcaster: Broadcaster,
    max_name_len: usize,
    shutdown: broadcast::Receiver<()>,
}

impl SessionHandler {
    pub fn new(
        handle: Arc<ClientHandle>,
        reader: FrameReader<OwnedReadHalf>,
        registry: Arc<ClientRegistry>,
        broadcaster: Broadcaster,
        max_name_len: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            handle,
            reader,
            registry,
            broadcaster,
            max_name_len,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let id = self.handle.id();

        // ── Handshake ────────────────────────────────────────────────────
        let name = tokio::select! {
            _ = self.shutdown.recv() => {
                self.terminate(id);
                return;
            }
            line = self.reader.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!(session_id = id, "peer left before handshake");
                    self.terminate(id);
                    return;
                }
                Err(e) => {
                    tracing::warn!(session_id = id, error = %e, "handshake read failed");
                    self.terminate(id);
                    return;
                }
            }
        };

        if let Err(e) = frame::validate_name(&name, self.max_name_len) {
            tracing::warn!(session_id = id, error = %e, "rejecting session");
            self.terminate(id);
            return;
        }

        self.registry.set_name(id, &name);
        self.broadcaster
            .event(EventKind::Join, id, &format!("{name} has joined"))
            .await;
        tracing::info!(session_id = id, name, "joined");

        // ── Active ───────────────────────────────────────────────────────
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::debug!(session_id = id, "session shutting down");
                    self.terminate(id);
                    return;
                }
                line = self.reader.next_line() => match line {
                    Ok(Some(line)) if line == EXIT_TOKEN => {
                        // Closing: graceful departure, announced.
                        self.broadcaster
                            .event(EventKind::Leave, id, &format!("{name} has left"))
                            .await;
                        tracing::info!(session_id = id, name, "left");
                        self.terminate(id);
                        return;
                    }
                    Ok(Some(body)) => {
                        let ciphered = self.broadcaster.chat(&body, id, &name).await;
                        tracing::info!(session_id = id, name, ciphered, "chat");
                    }
                    Ok(None) => {
                        // Abrupt disconnect: no announcement.
                        tracing::info!(session_id = id, name, "disconnected");
                        self.terminate(id);
                        return;
                    }
                    Err(FrameError::Oversize { len, max }) => {
                        tracing::warn!(session_id = id, name, len, max, "oversize frame, closing session");
                        self.terminate(id);
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(session_id = id, name, error = %e, "read failed, closing session");
                        self.terminate(id);
                        return;
                    }
                }
            }
        }
    }

    /// Terminated: drop the registry entry. The stream closes when the last
    /// handle clone goes away.
    fn terminate(&self, id: u64) {
        self.registry.remove(id);
    }
}
