use crate::traits::*;

use futures::io::{AsyncReadExt, AsyncWriteExt};
use futures::task::SpawnExt;
use std::io::Result as IoResult;
use std::time::{Duration, Instant};

// Test "sleep" with a tiny delay, and make sure that at least that
// much delay happens.
async fn small_delay<R: Runtime>(runtime: R) -> IoResult<()> {
    let i1 = Instant::now();
    let one_msec = Duration::from_millis(1);
    runtime.sleep(one_msec).await;
    let i2 = Instant::now();
    assert!(i2 >= i1 + one_msec);
    Ok(())
}

// Connect to a listener of our own, and talk both ways.
async fn ping_pong<R: Runtime>(runtime: R) -> IoResult<()> {
    let listener = runtime.listen(&"127.0.0.1:0".parse().unwrap()).await?;
    let addr = listener.local_addr()?;

    let server = async {
        let (mut con, peer) = listener.accept().await?;
        let mut ping = [0_u8; 4];
        con.read_exact(&mut ping[..]).await?;
        assert_eq!(&ping, b"ping");
        con.write_all(b"pong").await?;
        IoResult::Ok(peer)
    };
    let client = async {
        let mut con = runtime.connect(&addr).await?;
        con.write_all(b"ping").await?;
        let mut pong = Vec::new();
        con.read_to_end(&mut pong).await?;
        IoResult::Ok(pong)
    };

    let (peer, pong) = futures::join!(server, client);
    assert!(peer?.ip().is_loopback());
    assert_eq!(&pong?[..], b"pong");
    Ok(())
}

// Make sure that spawned tasks run, and that we can get their output.
async fn spawn_and_join<R: Runtime>(runtime: R) -> IoResult<()> {
    let handle = runtime
        .spawn_with_handle(async { 6_u32 * 7 })
        .expect("spawn failed");
    assert_eq!(handle.await, 42);
    Ok(())
}

// Resolving a literal address shouldn't need a resolver at all.
async fn resolve_literal<R: Runtime>(runtime: R) -> IoResult<()> {
    let addrs = runtime.resolve("127.0.0.1", 8080).await?;
    assert_eq!(addrs, vec!["127.0.0.1:8080".parse().unwrap()]);
    let addrs = runtime.resolve("::1", 22).await?;
    assert_eq!(addrs, vec!["[::1]:22".parse().unwrap()]);
    Ok(())
}

#[test]
fn tokio_small_delay() -> IoResult<()> {
    crate::test_with_runtime(small_delay)
}

#[test]
fn tokio_ping_pong() -> IoResult<()> {
    crate::test_with_runtime(ping_pong)
}

#[test]
fn tokio_spawn_and_join() -> IoResult<()> {
    crate::test_with_runtime(spawn_and_join)
}

#[test]
fn tokio_resolve_literal() -> IoResult<()> {
    crate::test_with_runtime(resolve_literal)
}
