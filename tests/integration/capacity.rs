use crate::*;

use parley_core::cipher;
use parley_core::frame::EXIT_TOKEN;

/// Spec scenario: capacity 2. A third connection is closed immediately,
/// leaves the registry untouched, and never appears in any broadcast's
/// recipient set.
#[tokio::test]
async fn third_connection_is_rejected_at_capacity() -> Result<()> {
    let server = start_server(2).await?;

    let mut a = connect(server.addr, "A").await?;
    wait_for_len(&server.registry, 1).await?;
    let mut b = connect(server.addr, "B").await?;
    assert_eq!(a.recv_line().await?, "#join|2|B has joined");
    wait_for_len(&server.registry, 2).await?;

    // Third connection: rejected, not queued.
    let mut rejected = connect_raw(server.addr).await?;
    rejected.expect_closed().await?;
    assert_eq!(server.registry.len(), 2, "rejection must not mutate the registry");

    // Later broadcasts only reach the two live sessions.
    a.send_line("still two of us").await?;
    assert_eq!(
        b.recv_line().await?,
        format!("A|1|{}", cipher::encode("still two of us", SHIFT))
    );
    Ok(())
}

/// A rejected connection burns an id but frees no slot; a slot freed by a
/// departure can be taken by a newcomer.
#[tokio::test]
async fn slot_freed_by_departure_is_reusable() -> Result<()> {
    let server = start_server(2).await?;

    let mut a = connect(server.addr, "A").await?;
    wait_for_len(&server.registry, 1).await?;
    let mut b = connect(server.addr, "B").await?;
    assert_eq!(a.recv_line().await?, "#join|2|B has joined");

    b.send_line(EXIT_TOKEN).await?;
    assert_eq!(a.recv_line().await?, "#leave|2|B has left");
    wait_for_len(&server.registry, 1).await?;

    let _c = connect(server.addr, "C").await?;
    assert_eq!(a.recv_line().await?, "#join|3|C has joined");
    wait_for_len(&server.registry, 2).await?;
    Ok(())
}
