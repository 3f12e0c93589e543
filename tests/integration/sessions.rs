use crate::*;

use parley_core::frame::EXIT_TOKEN;

/// Graceful departure: the exit token produces exactly one leave event.
#[tokio::test]
async fn exit_token_broadcasts_a_leave_event() -> Result<()> {
    let server = start_server(10).await?;

    let mut a = connect(server.addr, "A").await?;
    wait_for_len(&server.registry, 1).await?;
    let mut b = connect(server.addr, "B").await?;
    assert_eq!(a.recv_line().await?, "#join|2|B has joined");

    b.send_line(EXIT_TOKEN).await?;

    assert_eq!(a.recv_line().await?, "#leave|2|B has left");
    wait_for_len(&server.registry, 1).await?;

    // Exactly one frame — no stray announcement parts follow.
    a.expect_silence().await?;
    Ok(())
}

/// The documented asymmetry: an abrupt disconnect is cleaned up without
/// any announcement frames.
#[tokio::test]
async fn abrupt_disconnect_announces_nothing() -> Result<()> {
    let server = start_server(10).await?;

    let mut a = connect(server.addr, "A").await?;
    wait_for_len(&server.registry, 1).await?;
    let b = connect(server.addr, "B").await?;
    assert_eq!(a.recv_line().await?, "#join|2|B has joined");

    // Hard close, no exit token.
    drop(b);

    wait_for_len(&server.registry, 1).await?;
    a.expect_silence().await?;
    Ok(())
}

/// An oversize frame is rejected and ends only the offending session;
/// the server keeps serving everyone else.
#[tokio::test]
async fn oversize_frame_closes_only_the_offender() -> Result<()> {
    let server = start_server(10).await?;

    let mut a = connect(server.addr, "A").await?;
    wait_for_len(&server.registry, 1).await?;
    let mut b = connect(server.addr, "B").await?;
    assert_eq!(a.recv_line().await?, "#join|2|B has joined");

    // Default max frame length is 200 bytes.
    b.send_line(&"x".repeat(500)).await?;

    b.expect_closed().await?;
    wait_for_len(&server.registry, 1).await?;

    // Not an exit-token departure, so no announcement either.
    a.expect_silence().await?;

    // The server is still healthy: a new session joins and is announced.
    let _c = connect(server.addr, "C").await?;
    assert_eq!(a.recv_line().await?, "#join|3|C has joined");
    Ok(())
}

/// A handshake name carrying reserved characters is rejected silently.
#[tokio::test]
async fn invalid_name_rejects_the_session() -> Result<()> {
    let server = start_server(10).await?;

    let mut a = connect(server.addr, "A").await?;
    wait_for_len(&server.registry, 1).await?;

    let mut bad = connect_raw(server.addr).await?;
    bad.send_line("not|allowed").await?;

    bad.expect_closed().await?;
    wait_for_len(&server.registry, 1).await?;
    a.expect_silence().await?;
    Ok(())
}

/// Session ids keep climbing across departures — never reused.
#[tokio::test]
async fn session_ids_are_never_reused() -> Result<()> {
    let server = start_server(10).await?;

    let mut a = connect(server.addr, "A").await?;
    wait_for_len(&server.registry, 1).await?;

    let mut b = connect(server.addr, "B").await?;
    assert_eq!(a.recv_line().await?, "#join|2|B has joined");
    b.send_line(EXIT_TOKEN).await?;
    assert_eq!(a.recv_line().await?, "#leave|2|B has left");
    wait_for_len(&server.registry, 1).await?;

    // The next arrival gets id 3, not B's old id 2.
    let _c = connect(server.addr, "C").await?;
    assert_eq!(a.recv_line().await?, "#join|3|C has joined");
    Ok(())
}
