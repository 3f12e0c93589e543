//! parley-client — interactive chat client.
//!
//! Connects, sends the display name as the handshake frame, authenticates
//! locally, then runs concurrent send and receive loops. Ctrl-C and the
//! `#exit` line both take the graceful-departure path; both loops are
//! joined with a bounded timeout on the way out.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use parley_core::cipher;
use parley_core::config::ParleyConfig;
use parley_core::credentials::CredentialStore;
use parley_core::frame::{self, Frame, FrameReader, EXIT_TOKEN};

mod auth;
mod ui;

/// How long to wait for the send/receive loops to stop before aborting them.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

type SharedWriter = Arc<tokio::sync::Mutex<OwnedWriteHalf>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout belongs to the chat.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = ParleyConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        ParleyConfig::default()
    });

    let addr = format!("{}:{}", config.client.server_addr, config.network.port);
    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    let (read_half, write_half) = stream.into_split();
    let writer: SharedWriter = Arc::new(tokio::sync::Mutex::new(write_half));

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    // Handshake: the first frame on the connection is the display name.
    let name = loop {
        ui::prompt("Enter your name : ");
        let candidate = lines
            .next_line()
            .await
            .context("failed to read stdin")?
            .context("stdin closed")?
            .trim()
            .to_string();
        match frame::validate_name(&candidate, config.limits.max_name_len) {
            Ok(()) => break candidate,
            Err(e) => println!("{e}"),
        }
    };
    writer
        .lock()
        .await
        .write_all(format!("{name}\n").as_bytes())
        .await
        .context("failed to send handshake")?;

    ui::banner();

    let store = CredentialStore::new(&config.client.credentials_path, config.cipher.shift);
    auth::authenticate(&mut lines, &store).await?;

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

    {
        let writer = writer.clone();
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            send_exit(&writer).await;
            let _ = shutdown.send(());
        });
    }

    // ── Send / receive loops ─────────────────────────────────────────────────
    let mut send_task = tokio::spawn(send_loop(
        lines,
        writer.clone(),
        shutdown_tx.clone(),
        shutdown_tx.subscribe(),
    ));
    let mut recv_task = tokio::spawn(recv_loop(
        read_half,
        config.limits.max_frame_len,
        config.limits.max_name_len,
        config.cipher.shift,
        shutdown_tx.clone(),
        shutdown_tx.subscribe(),
    ));

    let _ = shutdown_rx.recv().await;

    // Cancellable tasks, joined with a bounded timeout — never abandoned.
    if tokio::time::timeout(JOIN_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
    if tokio::time::timeout(JOIN_TIMEOUT, &mut recv_task).await.is_err() {
        recv_task.abort();
    }

    Ok(())
}

async fn send_exit(writer: &SharedWriter) {
    let mut w = writer.lock().await;
    let _ = w.write_all(format!("{EXIT_TOKEN}\n").as_bytes()).await;
}

/// Read stdin lines and write them as frames. `#exit` departs gracefully.
async fn send_loop<R>(
    mut lines: tokio::io::Lines<R>,
    writer: SharedWriter,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    R: AsyncBufRead + Unpin,
{
    loop {
        ui::prompt_you();
        tokio::select! {
            _ = shutdown_rx.recv() => return,
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        // stdin gone: depart gracefully.
                        send_exit(&writer).await;
                        let _ = shutdown_tx.send(());
                        return;
                    }
                };
                if line == EXIT_TOKEN {
                    send_exit(&writer).await;
                    let _ = shutdown_tx.send(());
                    return;
                }
                let mut w = writer.lock().await;
                if let Err(e) = w.write_all(format!("{line}\n").as_bytes()).await {
                    tracing::warn!(error = %e, "send failed");
                    let _ = shutdown_tx.send(());
                    return;
                }
            }
        }
    }
}

/// Read frames from the server, decode chat bodies, and render.
async fn recv_loop(
    read_half: OwnedReadHalf,
    max_frame_len: usize,
    max_name_len: usize,
    shift: u8,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    // Relayed frames carry `name|id|` framing on top of the body, so the
    // receive limit must be wider than the bare body limit.
    let limit = frame::max_relayed_len(max_frame_len, max_name_len);
    let mut reader = FrameReader::with_max_len(read_half, limit);
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => return,
            line = reader.next_line() => match line {
                Ok(Some(line)) => match Frame::parse(&line) {
                    Ok(Frame::Chat { sender, sender_id, body }) => {
                        ui::render_chat(&sender, sender_id, &cipher::decode(&body, shift));
                    }
                    Ok(Frame::Event { session_id, text, .. }) => {
                        ui::render_status(session_id, &text);
                    }
                    // Framing errors degrade to raw status output rather
                    // than failing the connection.
                    Err(_) => ui::render_raw(&line),
                },
                Ok(None) => {
                    println!("Disconnected from server.");
                    let _ = shutdown_tx.send(());
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "receive failed");
                    let _ = shutdown_tx.send(());
                    return;
                }
            }
        }
    }
}
