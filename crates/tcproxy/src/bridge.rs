//! A bridge between one client connection and one upstream connection.
//!
//! Once the upstream connection is up, a bridge runs two forwarding
//! tasks: one relays client→server (the "upstream" direction) and the
//! other server→client ("downstream").  Each task repeatedly reads up to
//! [`BUFFER_LEN`] bytes, runs them through its own cipher, and writes
//! them out, never starting a read before the previous write is done.
//!
//! When a read or write fails (end-of-stream counts as a failed read),
//! the task records a [`HalfClose`] and stops relaying.  The bridge as a
//! whole is torn down only once the recorded half-closes make up one of
//! the pairs listed in [`HalfCloseFlags::should_close()`]; until then the
//! other direction keeps going.
//!
//! Teardown happens exactly once.  Both sockets and both ciphers are
//! dropped then, and not before: a direction that has already failed
//! keeps hold of its halves until the whole bridge closes.

use crate::{Error, Result};

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use futures::task::SpawnExt;
use std::fmt;
use std::io::{Error as IoError, ErrorKind};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

use tcproxy_cipher::{CipherConfig, StreamCipher};
use tcproxy_rtcompat::Runtime;

/// How many bytes a forwarding task reads at a time.
pub const BUFFER_LEN: usize = 8192;

/// The remote server that a proxy forwards its connections to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upstream {
    /// Host name or IP address of the server.
    host: String,
    /// TCP port of the server.
    port: u16,
}

impl Upstream {
    /// Describe the server at `host`:`port`.
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Upstream {
            host: host.into(),
            port,
        }
    }

    /// Return the host name or address of this server.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Return the port of this server.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// One of the four ways a bridge can stop relaying in one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalfClose {
    /// Reading from the client failed or hit end-of-stream.
    ClientRead,
    /// Reading from the server failed or hit end-of-stream.
    ServerRead,
    /// Writing to the client failed.
    ClientWrite,
    /// Writing to the server failed.
    ServerWrite,
}

impl fmt::Display for HalfClose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HalfClose::ClientRead => "client read side closed",
            HalfClose::ServerRead => "server read side closed",
            HalfClose::ClientWrite => "client write side closed",
            HalfClose::ServerWrite => "server write side closed",
        };
        write!(f, "{}", s)
    }
}

/// The set of half-closes a bridge has seen so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HalfCloseFlags {
    /// True if we can no longer read from the client.
    pub client_read: bool,
    /// True if we can no longer read from the server.
    pub server_read: bool,
    /// True if we can no longer write to the client.
    pub client_write: bool,
    /// True if we can no longer write to the server.
    pub server_write: bool,
}

impl HalfCloseFlags {
    /// Record that `which` has happened.
    pub fn set(&mut self, which: HalfClose) {
        match which {
            HalfClose::ClientRead => self.client_read = true,
            HalfClose::ServerRead => self.server_read = true,
            HalfClose::ClientWrite => self.client_write = true,
            HalfClose::ServerWrite => self.server_write = true,
        }
    }

    /// Return true if the bridge should be torn down.
    ///
    /// That's the case when both ends have stopped producing data, when
    /// both ends have stopped accepting it, or when either socket is
    /// unusable in both directions.  No single flag is ever enough.
    pub fn should_close(&self) -> bool {
        (self.client_read && self.server_read)
            || (self.client_write && self.server_write)
            || (self.server_read && self.server_write)
            || (self.client_read && self.client_write)
    }
}

/// Which way a forwarding task moves data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    /// Client to server.
    Upstream,
    /// Server to client.
    Downstream,
}

impl Direction {
    /// Return the half-close that a failed read means in this direction.
    fn read_closed(self) -> HalfClose {
        match self {
            Direction::Upstream => HalfClose::ClientRead,
            Direction::Downstream => HalfClose::ServerRead,
        }
    }

    /// Return the half-close that a failed write means in this direction.
    fn write_closed(self) -> HalfClose {
        match self {
            Direction::Upstream => HalfClose::ServerWrite,
            Direction::Downstream => HalfClose::ClientWrite,
        }
    }
}

/// What a bridge did, returned once it has been torn down.
#[derive(Clone, Debug)]
pub struct BridgeReport {
    /// Address of the client.
    pub peer: SocketAddr,
    /// Bytes relayed from the client to the server.
    pub upstream_bytes: u64,
    /// Bytes relayed from the server to the client.
    pub downstream_bytes: u64,
    /// The half-closes that led to teardown.
    pub flags: HalfCloseFlags,
}

/// Lock-protected part of [`BridgeShared`].
struct CloseState {
    /// Half-closes seen so far.
    flags: HalfCloseFlags,
    /// True once teardown has begun.
    closed: bool,
    /// Fired at teardown, to tell any direction still running to stop.
    teardown: Option<oneshot::Sender<()>>,
}

/// The part of a bridge shared by both of its forwarding tasks.
struct BridgeShared {
    /// Address of the client, for logging.
    peer: SocketAddr,
    /// Everything the close path needs.  Nothing else takes this lock.
    state: Mutex<CloseState>,
}

impl BridgeShared {
    /// Record `which`, and begin teardown if that completes a closing
    /// pair.
    ///
    /// Return true if this call is the one that tore the bridge down.
    fn half_close(&self, which: HalfClose) -> bool {
        let mut state = self.state.lock().expect("Poisoned lock for bridge state");
        state.flags.set(which);
        debug!("{}: {}", self.peer, which);
        if !state.flags.should_close() || state.closed {
            return false;
        }
        state.closed = true;
        if let Some(tx) = state.teardown.take() {
            // If nobody is listening, everybody has already stopped.
            let _ = tx.send(());
        }
        true
    }

    /// Return the half-closes seen so far.
    fn flags(&self) -> HalfCloseFlags {
        self.state
            .lock()
            .expect("Poisoned lock for bridge state")
            .flags
    }
}

/// Why a forwarding loop stopped.
enum Stopped {
    /// A read failed, or returned end-of-stream (`None`).
    Read(Option<IoError>),
    /// A write failed.
    Write(IoError),
}

impl fmt::Display for Stopped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stopped::Read(None) => write!(f, "end of stream"),
            Stopped::Read(Some(e)) => write!(f, "read failed: {}", e),
            Stopped::Write(e) => write!(f, "write failed: {}", e),
        }
    }
}

/// A client connection waiting to be bridged to the upstream server.
///
/// Create one with [`Bridge::new()`] for every accepted connection, and
/// then run it with [`Bridge::start()`].
pub struct Bridge<S> {
    /// The client connection.
    client: S,
    /// The client's address.
    peer: SocketAddr,
    /// Cipher for data moving client→server.
    upstream_cipher: StreamCipher,
    /// Cipher for data moving server→client.
    downstream_cipher: StreamCipher,
}

impl<S> Bridge<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Make a new bridge for `client`, connected from `peer`.
    ///
    /// Each direction gets its own cipher built from `ciphers`.
    pub fn new(client: S, peer: SocketAddr, ciphers: &CipherConfig) -> Self {
        Bridge {
            client,
            peer,
            upstream_cipher: ciphers.instance(),
            downstream_cipher: ciphers.instance(),
        }
    }

    /// Return the address of this bridge's client.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Connect to `upstream`, then relay data until the bridge is torn
    /// down.
    ///
    /// If we can't reach `upstream`, the client connection is closed
    /// without anything being read from it, and an error is returned.
    /// Otherwise, return a report once both directions have stopped.
    pub async fn start<R: Runtime>(self, runtime: &R, upstream: &Upstream) -> Result<BridgeReport> {
        let server = match connect_upstream(runtime, upstream).await {
            Ok(s) => s,
            Err(e) => {
                // Dropping ourself closes the client and the ciphers.
                drop(self);
                return Err(e);
            }
        };
        debug!("{}: connected to {}", self.peer, upstream);
        self.relay(runtime, server).await
    }

    /// Relay data between our client and `server` until teardown.
    async fn relay<R, T>(self, runtime: &R, server: T) -> Result<BridgeReport>
    where
        R: Runtime,
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let Bridge {
            client,
            peer,
            upstream_cipher,
            downstream_cipher,
        } = self;

        let (teardown_tx, teardown_rx) = oneshot::channel();
        let shared = Arc::new(BridgeShared {
            peer,
            state: Mutex::new(CloseState {
                flags: HalfCloseFlags::default(),
                closed: false,
                teardown: Some(teardown_tx),
            }),
        });
        let teardown = teardown_rx.shared();

        let (client_r, client_w) = client.split();
        let (server_r, server_w) = server.split();

        // This is the only place both directions start at once.
        let up = runtime.spawn_with_handle(forward(
            Direction::Upstream,
            client_r,
            server_w,
            upstream_cipher,
            Arc::clone(&shared),
            teardown.clone(),
        ))?;
        let down = runtime.spawn_with_handle(forward(
            Direction::Downstream,
            server_r,
            client_w,
            downstream_cipher,
            Arc::clone(&shared),
            teardown,
        ))?;

        let (upstream_bytes, downstream_bytes) = futures::join!(up, down);
        let report = BridgeReport {
            peer,
            upstream_bytes,
            downstream_bytes,
            flags: shared.flags(),
        };
        debug!(
            "{}: closed after relaying {} bytes up and {} bytes down",
            peer, upstream_bytes, downstream_bytes
        );
        Ok(report)
    }
}

/// Resolve `upstream`, and connect to the first of its addresses that
/// will have us.
async fn connect_upstream<R: Runtime>(runtime: &R, upstream: &Upstream) -> Result<R::TcpStream> {
    let addrs = runtime
        .resolve(upstream.host(), upstream.port())
        .await
        .map_err(|source| Error::Resolve {
            target: upstream.clone(),
            source,
        })?;

    let mut last_err = None;
    for addr in addrs.iter() {
        match runtime.connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                trace!("Connection to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(source) => Err(Error::Connect {
            target: upstream.clone(),
            source,
        }),
        None => Err(Error::NoAddress(upstream.clone())),
    }
}

/// Run one direction of a bridge: relay from `src` to `dst` through
/// `cipher` until something fails, then wait for teardown.
///
/// Return the number of bytes relayed.
async fn forward<Rd, Wr>(
    dir: Direction,
    mut src: Rd,
    mut dst: Wr,
    mut cipher: StreamCipher,
    shared: Arc<BridgeShared>,
    teardown: Shared<oneshot::Receiver<()>>,
) -> u64
where
    Rd: AsyncRead + Unpin,
    Wr: AsyncWrite + Unpin,
{
    let mut buf = vec![0_u8; BUFFER_LEN].into_boxed_slice();
    let mut relayed = 0_u64;

    let stopped = {
        let relaying = pump(&mut src, &mut dst, &mut cipher, &mut buf[..], &mut relayed).fuse();
        futures::pin_mut!(relaying);
        let mut torn_down = teardown.clone().fuse();
        futures::select! {
            stopped = relaying => Some(stopped),
            _ = torn_down => None,
        }
    };

    match stopped {
        Some(why) => {
            trace!("{}: {:?} direction stopped: {}", shared.peer, dir, why);
            let which = match why {
                Stopped::Read(_) => dir.read_closed(),
                Stopped::Write(_) => dir.write_closed(),
            };
            if !shared.half_close(which) {
                // The other direction is still relaying.  Hold on to our
                // halves until the bridge closes.
                let _ = teardown.await;
            }
        }
        None => trace!("{}: {:?} direction cancelled by teardown", shared.peer, dir),
    }

    relayed
}

/// Copy from `src` to `dst` through `cipher`, one buffer at a time,
/// until a read or a write fails.
///
/// Adds the number of bytes written to `relayed` as we go.
async fn pump<Rd, Wr>(
    src: &mut Rd,
    dst: &mut Wr,
    cipher: &mut StreamCipher,
    buf: &mut [u8],
    relayed: &mut u64,
) -> Stopped
where
    Rd: AsyncRead + Unpin,
    Wr: AsyncWrite + Unpin,
{
    loop {
        let n = match src.read(buf).await {
            Ok(0) => return Stopped::Read(None),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Stopped::Read(Some(e)),
        };
        cipher.transform(&mut buf[..n]);
        if let Err(e) = dst.write_all(&buf[..n]).await {
            return Stopped::Write(e);
        }
        if let Err(e) = dst.flush().await {
            return Stopped::Write(e);
        }
        *relayed += n as u64;
    }
}
