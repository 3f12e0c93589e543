//! Connection acceptor — binds the chat port and spawns a session per
//! connection.
//!
//! The server context owns the registry, broadcaster, and limits; nothing
//! here is process-global. Bind and accept failures are fatal and propagate
//! out of `run`. A connection arriving while the registry is full is closed
//! immediately — rejected, never queued.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use parley_core::config::ParleyConfig;
use parley_core::frame::FrameReader;

use crate::broadcast::Broadcaster;
use crate::registry::{ClientHandle, ClientRegistry, RegistryError};
use crate::session::SessionHandler;

pub struct ChatServer {
    listener: TcpListener,
    registry: Arc<ClientRegistry>,
    broadcaster: Broadcaster,
    max_frame_len: usize,
    max_name_len: usize,
}

impl ChatServer {
    /// Bind the chat listener. Port 0 asks the OS for a free port — the
    /// integration tests rely on that.
    pub async fn bind(config: &ParleyConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.network.bind_addr, config.network.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind chat listener on {addr}"))?;

        let registry = ClientRegistry::new(config.limits.max_clients);
        let broadcaster = Broadcaster::new(registry.clone(), config.cipher.shift);

        Ok(Self {
            listener,
            registry,
            broadcaster,
            max_frame_len: config.limits.max_frame_len,
            max_name_len: config.limits.max_name_len,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("listener has no local addr")
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        self.registry.clone()
    }

    /// Accept loop. Runs until the shutdown channel fires or accept fails.
    pub async fn run(self, shutdown: broadcast::Sender<()>) -> Result<()> {
        let mut shutdown_rx = shutdown.subscribe();
        tracing::info!(
            addr = %self.local_addr()?,
            capacity = self.registry.capacity(),
            "chat server listening"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("acceptor shutting down");
                    return Ok(());
                }

                accepted = self.listener.accept() => {
                    let (stream, peer_addr) = accepted.context("accept failed")?;
                    let id = self.registry.next_id();
                    let (read_half, write_half) = stream.into_split();
                    let handle = Arc::new(ClientHandle::new(id, write_half));

                    match self.registry.insert(handle.clone()) {
                        Ok(()) => {
                            tracing::info!(session_id = id, peer = %peer_addr, "connection accepted");
                            let session = SessionHandler::new(
                                handle,
                                FrameReader::with_max_len(read_half, self.max_frame_len),
                                self.registry.clone(),
                                self.broadcaster.clone(),
                                self.max_name_len,
                                shutdown.subscribe(),
                            );
                            tokio::spawn(session.run());
                        }
                        Err(e @ RegistryError::AtCapacity(_)) => {
                            // Dropping both halves closes the socket.
                            tracing::warn!(peer = %peer_addr, error = %e, "rejecting connection");
                        }
                        Err(e) => {
                            tracing::error!(session_id = id, error = %e, "registry insert failed");
                        }
                    }
                }
            }
        }
    }
}
