//! Parley integration test harness.
//!
//! Every test runs a real [`ChatServer`] in-process on a loopback port
//! chosen by the OS, then drives it with plain TCP clients. No external
//! processes and no fixed ports — tests are safe to run in parallel.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use parley_core::config::ParleyConfig;
use parley_core::frame::{max_relayed_len, FrameReader, MAX_FRAME_LEN, MAX_NAME_LEN};
use parley_server::{ChatServer, ClientRegistry};

mod capacity;
mod sessions;

/// The shift every test server and assertion uses.
pub const SHIFT: u8 = 3;

/// How long to wait for an expected frame.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to listen before declaring that no frame arrives.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(300);

// ── Harness ───────────────────────────────────────────────────────────────────

pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<ClientRegistry>,
    // Dropping the sender would shut the server down mid-test.
    _shutdown: broadcast::Sender<()>,
}

/// Bind and run a chat server on 127.0.0.1 with an OS-assigned port.
pub async fn start_server(max_clients: usize) -> Result<TestServer> {
    let mut config = ParleyConfig::default();
    config.network.bind_addr = "127.0.0.1".to_string();
    config.network.port = 0;
    config.limits.max_clients = max_clients;
    config.cipher.shift = SHIFT;

    let server = ChatServer::bind(&config).await?;
    let addr = server.local_addr()?;
    let registry = server.registry();

    let (shutdown, _) = broadcast::channel::<()>(1);
    tokio::spawn(server.run(shutdown.clone()));

    Ok(TestServer {
        addr,
        registry,
        _shutdown: shutdown,
    })
}

pub struct TestClient {
    pub reader: FrameReader<OwnedReadHalf>,
    pub writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .context("write failed")?;
        Ok(())
    }

    /// Receive one frame line, failing the test if none arrives in time.
    pub async fn recv_line(&mut self) -> Result<String> {
        match tokio::time::timeout(RECV_TIMEOUT, self.reader.next_line()).await {
            Ok(Ok(Some(line))) => Ok(line),
            Ok(Ok(None)) => bail!("connection closed while expecting a frame"),
            Ok(Err(e)) => bail!("read failed: {e}"),
            Err(_) => bail!("timed out waiting for a frame"),
        }
    }

    /// Assert that no frame arrives within the silence window.
    pub async fn expect_silence(&mut self) -> Result<()> {
        match tokio::time::timeout(SILENCE_WINDOW, self.reader.next_line()).await {
            Err(_) => Ok(()),
            Ok(Ok(Some(line))) => bail!("expected silence, got frame: {line}"),
            Ok(Ok(None)) => bail!("expected silence, connection closed"),
            Ok(Err(e)) => bail!("expected silence, read failed: {e}"),
        }
    }

    /// Wait for the server to close this connection.
    pub async fn expect_closed(&mut self) -> Result<()> {
        match tokio::time::timeout(RECV_TIMEOUT, self.reader.next_line()).await {
            Ok(Ok(None)) => Ok(()),
            Ok(Ok(Some(line))) => bail!("expected EOF, got frame: {line}"),
            Ok(Err(e)) => bail!("expected EOF, read failed: {e}"),
            Err(_) => bail!("timed out waiting for EOF"),
        }
    }
}

/// Connect and complete the name handshake.
pub async fn connect(addr: SocketAddr, name: &str) -> Result<TestClient> {
    let mut client = connect_raw(addr).await?;
    client.send_line(name).await?;
    Ok(client)
}

/// Connect without handshaking. Test clients read with the same relayed-frame
/// allowance the real client uses: body limit plus `name|id|` framing.
pub async fn connect_raw(addr: SocketAddr) -> Result<TestClient> {
    let stream = TcpStream::connect(addr).await.context("connect failed")?;
    let (read_half, write_half) = stream.into_split();
    Ok(TestClient {
        reader: FrameReader::with_max_len(read_half, max_relayed_len(MAX_FRAME_LEN, MAX_NAME_LEN)),
        writer: write_half,
    })
}

/// Poll until the registry holds exactly `expected` sessions.
pub async fn wait_for_len(registry: &ClientRegistry, expected: usize) -> Result<()> {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    loop {
        if registry.len() == expected {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            bail!(
                "registry never reached {expected} sessions (currently {})",
                registry.len()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
