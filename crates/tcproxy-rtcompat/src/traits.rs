//! Declarations for traits that we need our runtimes to implement.

use async_trait::async_trait;
use futures::{AsyncRead, AsyncWrite, Future};
use std::io::Result as IoResult;
use std::net::SocketAddr;
use std::time::Duration;

pub use futures::task::Spawn;

/// A runtime that tcproxy can run on.
///
/// Everything the proxy needs from its environment comes through here:
/// launching tasks, waiting, and making and accepting TCP connections.
pub trait Runtime:
    Send + Sync + Clone + Spawn + SleepProvider + TcpProvider + 'static
{
}

impl<T> Runtime for T where
    T: Send + Sync + Clone + Spawn + SleepProvider + TcpProvider + 'static
{
}

/// Trait for a runtime that can wait until a timer has expired.
pub trait SleepProvider {
    /// A future returned by [`SleepProvider::sleep()`]
    type SleepFuture: Future<Output = ()> + Send + 'static;
    /// Return a future that will be ready after `duration` has
    /// elapsed.
    #[must_use = "sleep() returns a future, which does nothing unless used"]
    fn sleep(&self, duration: Duration) -> Self::SleepFuture;
}

/// Trait for a runtime that can make and receive TCP connections.
// async_trait boxes every returned future here; these calls are rare
// next to reads and writes.
#[async_trait]
pub trait TcpProvider {
    /// The type for the TCP connections returned by [`Self::connect()`].
    type TcpStream: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static;
    /// The type for the TCP listeners returned by [`Self::listen()`].
    type TcpListener: TcpListener<TcpStream = Self::TcpStream> + Send + Sync + Unpin + 'static;

    /// Launch a TCP connection to a given socket address.
    async fn connect(&self, addr: &SocketAddr) -> IoResult<Self::TcpStream>;

    /// Open a TCP listener on a given socket address.
    async fn listen(&self, addr: &SocketAddr) -> IoResult<Self::TcpListener>;

    /// Look up the addresses for `host`, attaching `port` to each.
    ///
    /// An IP address literal resolves to itself.
    async fn resolve(&self, host: &str, port: u16) -> IoResult<Vec<SocketAddr>>;
}

/// Trait for a local socket that accepts incoming TCP streams.
#[async_trait]
pub trait TcpListener {
    /// The type of TCP connections returned by [`Self::accept()`].
    type TcpStream: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static;

    /// Wait for an incoming stream; return it along with its address.
    async fn accept(&self) -> IoResult<(Self::TcpStream, SocketAddr)>;

    /// Return the local address that this listener is bound to.
    fn local_addr(&self) -> IoResult<SocketAddr>;
}
