//! Accept incoming connections and hand each one to a [`Bridge`].
//!
//! A proxy is launched with [`run_proxy()`], which binds a listener and
//! then runs an [`Acceptor`] on it until accepting fails for good.

use futures::channel::mpsc;
use futures::stream::StreamExt;
use futures::task::SpawnExt;
use std::io::Result as IoResult;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use tcproxy_cipher::CipherConfig;
use tcproxy_rtcompat::{Runtime, TcpListener};

use crate::{Bridge, Error, Result, Upstream};

/// What an [`Acceptor`] does when accepting a connection fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcceptErrorPolicy {
    /// Close the listener and accept nothing more.
    ///
    /// Bridges that are already running carry on, and the accept loop
    /// ends once they have all finished.
    Stop,
    /// Wait for `delay`, then try accepting again.
    Retry {
        /// How long to wait before the next accept.
        delay: Duration,
    },
}

impl Default for AcceptErrorPolicy {
    fn default() -> Self {
        AcceptErrorPolicy::Stop
    }
}

/// An accept loop: takes connections from a listener, one at a time,
/// and runs a [`Bridge`] for each on its own task.
pub struct Acceptor<R: Runtime, L> {
    /// Runtime used to spawn bridges and to sleep between retries.
    runtime: R,
    /// Where connections come from.
    listener: L,
    /// Where every bridge connects to.
    upstream: Arc<Upstream>,
    /// Used to build each bridge's pair of ciphers.
    ciphers: CipherConfig,
    /// What to do when `accept()` fails.
    on_error: AcceptErrorPolicy,
}

impl<R, L> Acceptor<R, L>
where
    R: Runtime,
    L: TcpListener,
{
    /// Make a new Acceptor that takes connections from `listener` and
    /// relays them to `upstream`.
    pub fn new(
        runtime: R,
        listener: L,
        upstream: Upstream,
        ciphers: CipherConfig,
        on_error: AcceptErrorPolicy,
    ) -> Self {
        Acceptor {
            runtime,
            listener,
            upstream: Arc::new(upstream),
            ciphers,
            on_error,
        }
    }

    /// Return the address our listener is bound to.
    pub fn local_addr(&self) -> IoResult<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails and our policy says to
    /// stop, then wait for every bridge we launched to finish.
    ///
    /// Errors from individual bridges are logged, never returned.  This
    /// only fails if the runtime won't spawn a task.
    pub async fn accept_connections(self) -> Result<()> {
        let Acceptor {
            runtime,
            listener,
            upstream,
            ciphers,
            on_error,
        } = self;

        // Every running bridge holds a clone of `live_tx`.  Nothing is
        // ever sent: we only care about when the last clone goes away.
        let (live_tx, mut live_rx) = mpsc::channel::<()>(0);

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Error: {}", e);
                    match on_error {
                        AcceptErrorPolicy::Stop => break,
                        AcceptErrorPolicy::Retry { delay } => {
                            runtime.sleep(delay).await;
                            continue;
                        }
                    }
                }
            };
            info!("Accepted from {} {}", peer.ip(), peer.port());

            let bridge = Bridge::new(stream, peer, &ciphers);
            let rt = runtime.clone();
            let upstream = Arc::clone(&upstream);
            let live = live_tx.clone();
            runtime.spawn(async move {
                match bridge.start(&rt, &upstream).await {
                    Ok(report) => debug!(
                        "{}: bridge finished ({} up, {} down)",
                        report.peer, report.upstream_bytes, report.downstream_bytes
                    ),
                    Err(e) => warn!("{}: {}", peer, e),
                }
                drop(live);
            })?;
        }

        drop(listener);
        drop(live_tx);
        info!("No longer accepting connections.");
        while live_rx.next().await.is_some() {}
        debug!("All bridges have finished.");
        Ok(())
    }
}

/// Listen on `listen`, and relay every connection we get there to
/// `upstream`, obfuscated as `ciphers` says.
///
/// Returns an error if we can't listen.  Otherwise runs until accepting
/// stops under `on_error` and the last bridge has finished.
pub async fn run_proxy<R: Runtime>(
    runtime: R,
    listen: SocketAddr,
    upstream: Upstream,
    ciphers: CipherConfig,
    on_error: AcceptErrorPolicy,
) -> Result<()> {
    let listener = runtime
        .listen(&listen)
        .await
        .map_err(|source| Error::Bind {
            addr: listen,
            source,
        })?;
    let acceptor = Acceptor::new(runtime, listener, upstream, ciphers, on_error);
    let local = acceptor.local_addr().unwrap_or(listen);
    info!("Listening on {}, forwarding to {}.", local, acceptor.upstream);
    if acceptor.ciphers.is_keyed() {
        info!("Obfuscating traffic with {}.", acceptor.ciphers.kind());
    }
    acceptor.accept_connections().await
}
