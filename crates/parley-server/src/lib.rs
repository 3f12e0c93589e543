//! parley-server — the chat relay: registry, sessions, broadcast, acceptor.
//!
//! Everything here is runnable in-process; `parleyd` is a thin binary over
//! [`ChatServer`], and the integration tests drive one over loopback.

pub mod broadcast;
pub mod registry;
pub mod server;
pub mod session;

pub use broadcast::Broadcaster;
pub use registry::{ClientHandle, ClientRegistry, RegistryError};
pub use server::ChatServer;
