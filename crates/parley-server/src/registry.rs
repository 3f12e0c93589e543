//! Client registry — the shared set of active sessions.
//!
//! One lock guards the whole table, and broadcast snapshots are taken under
//! that same lock. That ordering is the registry's single most important
//! property: a broadcast can never iterate an entry whose stream is mid-
//! teardown. The lock is never held across an await — socket writes go
//! through the per-handle async mutex on handles cloned out of a snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;

/// Placeholder name between accept and handshake completion.
const UNNAMED: &str = "anonymous";

/// One connected participant: id, display name, and the write half of its
/// stream. The read half stays with the session handler.
pub struct ClientHandle {
    id: u64,
    name: Mutex<String>,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
}

impl ClientHandle {
    pub fn new(id: u64, writer: OwnedWriteHalf) -> Self {
        Self {
            id,
            name: Mutex::new(UNNAMED.to_string()),
            writer: tokio::sync::Mutex::new(writer),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> String {
        self.name.lock().expect("name lock poisoned").clone()
    }

    fn set_name(&self, name: &str) {
        *self.name.lock().expect("name lock poisoned") = name.to_string();
    }

    /// Write one encoded frame to this client's stream.
    pub async fn send(&self, frame: &Bytes) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(frame).await
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry is at capacity ({0} sessions)")]
    AtCapacity(usize),

    #[error("session id {0} is already registered")]
    DuplicateId(u64),
}

/// Bounded, internally synchronized session table keyed by session id.
pub struct ClientRegistry {
    capacity: usize,
    next_id: AtomicU64,
    clients: Mutex<HashMap<u64, Arc<ClientHandle>>>,
}

impl ClientRegistry {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            next_id: AtomicU64::new(1),
            clients: Mutex::new(HashMap::new()),
        })
    }

    /// Assign the next session id. Starts at 1, never reused.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a freshly accepted session. Fails without mutating when the
    /// table is full — the caller closes the connection.
    pub fn insert(&self, handle: Arc<ClientHandle>) -> Result<(), RegistryError> {
        let mut clients = self.lock();
        if clients.len() >= self.capacity {
            return Err(RegistryError::AtCapacity(self.capacity));
        }
        if clients.contains_key(&handle.id()) {
            return Err(RegistryError::DuplicateId(handle.id()));
        }
        clients.insert(handle.id(), handle);
        Ok(())
    }

    /// Set a session's display name. No-op if the session is already gone.
    pub fn set_name(&self, id: u64, name: &str) {
        if let Some(handle) = self.lock().get(&id) {
            handle.set_name(name);
        }
    }

    /// Remove a session. No-op if absent.
    pub fn remove(&self, id: u64) -> Option<Arc<ClientHandle>> {
        self.lock().remove(&id)
    }

    /// Clone out the live handles for broadcast iteration.
    ///
    /// Taken under the same lock as every mutation, so the returned set is a
    /// consistent point-in-time view of the table.
    pub fn snapshot(&self) -> Vec<Arc<ClientHandle>> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Arc<ClientHandle>>> {
        self.clients.lock().expect("registry lock poisoned")
    }
}
