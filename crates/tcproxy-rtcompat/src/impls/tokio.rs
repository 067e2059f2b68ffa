//! Implement our runtime traits on top of tokio.
//!
//! Tokio has its own I/O traits; we wrap every stream in
//! [`tokio_util::compat::Compat`] so that callers only ever see the
//! `futures` ones.

use crate::traits::{SleepProvider, TcpListener, TcpProvider};

use async_trait::async_trait;
use futures::task::{FutureObj, Spawn, SpawnError};
use futures::Future;
use std::io::Result as IoResult;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::time::Duration;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

/// A TCP stream, as returned by our tokio runtime.
pub type TcpStream = Compat<tokio_crate::net::TcpStream>;

/// Wrapper for tokio's TcpListener type.
pub struct TokioListener {
    /// The underlying listener.
    lis: tokio_crate::net::TcpListener,
}

#[async_trait]
impl TcpListener for TokioListener {
    type TcpStream = TcpStream;

    async fn accept(&self) -> IoResult<(Self::TcpStream, SocketAddr)> {
        let (stream, addr) = self.lis.accept().await?;
        Ok((stream.compat(), addr))
    }

    fn local_addr(&self) -> IoResult<SocketAddr> {
        self.lis.local_addr()
    }
}

/// A cloneable handle to a running tokio runtime.
///
/// This is the type that implements [`crate::Runtime`].  It doesn't own
/// the runtime: see [`TokioRuntime`] for that.
#[derive(Clone, Debug)]
pub struct TokioRuntimeHandle {
    /// The underlying tokio handle.
    handle: tokio_crate::runtime::Handle,
}

impl TokioRuntimeHandle {
    /// Wrap a tokio [`Handle`](tokio_crate::runtime::Handle) as a
    /// [`crate::Runtime`].
    pub fn new(handle: tokio_crate::runtime::Handle) -> Self {
        TokioRuntimeHandle { handle }
    }
}

impl Spawn for TokioRuntimeHandle {
    fn spawn_obj(&self, future: FutureObj<'static, ()>) -> Result<(), SpawnError> {
        // We never join tokio's handle; callers who care use
        // SpawnExt::spawn_with_handle().
        drop(self.handle.spawn(future));
        Ok(())
    }
}

impl SleepProvider for TokioRuntimeHandle {
    type SleepFuture = Pin<Box<tokio_crate::time::Sleep>>;
    fn sleep(&self, duration: Duration) -> Self::SleepFuture {
        // tokio timers need to be created inside the runtime.
        let _guard = self.handle.enter();
        Box::pin(tokio_crate::time::sleep(duration))
    }
}

#[async_trait]
impl TcpProvider for TokioRuntimeHandle {
    type TcpStream = TcpStream;
    type TcpListener = TokioListener;

    async fn connect(&self, addr: &SocketAddr) -> IoResult<Self::TcpStream> {
        let s = tokio_crate::net::TcpStream::connect(addr).await?;
        Ok(s.compat())
    }

    async fn listen(&self, addr: &SocketAddr) -> IoResult<Self::TcpListener> {
        let lis = tokio_crate::net::TcpListener::bind(*addr).await?;
        Ok(TokioListener { lis })
    }

    async fn resolve(&self, host: &str, port: u16) -> IoResult<Vec<SocketAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }
        let addrs = tokio_crate::net::lookup_host((host, port)).await?;
        Ok(addrs.collect())
    }
}

/// An owned tokio runtime.
///
/// Dropping this shuts the runtime down, cancelling every task on it.
#[derive(Debug)]
pub struct TokioRuntime {
    /// The runtime itself.
    runtime: tokio_crate::runtime::Runtime,
}

impl TokioRuntime {
    /// Return a [`crate::Runtime`] handle for this runtime.
    pub fn handle(&self) -> TokioRuntimeHandle {
        TokioRuntimeHandle::new(self.runtime.handle().clone())
    }

    /// Run `future` to completion on this runtime, blocking the current
    /// thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Build a new multi-threaded tokio runtime with I/O and timers enabled.
pub(crate) fn create_runtime() -> IoResult<TokioRuntime> {
    let runtime = tokio_crate::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    Ok(TokioRuntime { runtime })
}
