//! A listener whose incoming connections are supplied by the test.

// Note: this module only exists for writing unit tests.  Let's resist the
// temptation to add things we don't need.

use crate::TcpListener;

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::io::{AsyncRead, AsyncWrite};
use futures::lock::Mutex as AsyncMutex;
use futures::stream::StreamExt;
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::net::SocketAddr;

/// One item handed to a [`MockListener`]: a connection, or a failure.
type Incoming<S> = IoResult<(S, SocketAddr)>;

/// A [`TcpListener`] that yields whatever its [`MockListenerHandle`]
/// sends it.
///
/// Once every handle is gone and the queue is empty, `accept()` fails
/// with [`ErrorKind::BrokenPipe`].
pub struct MockListener<S> {
    /// The address we pretend to be listening on.
    addr: SocketAddr,
    /// Queue of pending connections and errors.
    receiver: AsyncMutex<mpsc::UnboundedReceiver<Incoming<S>>>,
}

/// The test's end of a [`MockListener`].
pub struct MockListenerHandle<S> {
    /// Where to send new connections and errors.
    sender: mpsc::UnboundedSender<Incoming<S>>,
}

impl<S> Clone for MockListenerHandle<S> {
    fn clone(&self) -> Self {
        MockListenerHandle {
            sender: self.sender.clone(),
        }
    }
}

/// Create a new [`MockListener`] claiming to listen on `addr`, along
/// with the handle used to feed it.
pub fn mock_listener<S>(addr: SocketAddr) -> (MockListener<S>, MockListenerHandle<S>) {
    let (sender, receiver) = mpsc::unbounded();
    let listener = MockListener {
        addr,
        receiver: AsyncMutex::new(receiver),
    };
    (listener, MockListenerHandle { sender })
}

impl<S> MockListenerHandle<S> {
    /// Queue `stream` to be accepted as a connection from `peer`.
    ///
    /// Fails if the listener has been dropped.
    pub fn push_connection(&self, stream: S, peer: SocketAddr) -> IoResult<()> {
        self.push(Ok((stream, peer)))
    }

    /// Queue an error of type `kind` to be returned from `accept()`.
    ///
    /// Fails if the listener has been dropped.
    pub fn push_error(&self, kind: ErrorKind) -> IoResult<()> {
        self.push(Err(IoError::new(kind, "injected accept failure")))
    }

    /// Return true if the listener has been dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Helper: queue `item` for the listener.
    fn push(&self, item: Incoming<S>) -> IoResult<()> {
        self.sender
            .unbounded_send(item)
            .map_err(|_| IoError::new(ErrorKind::NotConnected, "listener is closed"))
    }
}

#[async_trait]
impl<S> TcpListener for MockListener<S>
where
    S: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
{
    type TcpStream = S;

    async fn accept(&self) -> IoResult<(S, SocketAddr)> {
        let mut receiver = self.receiver.lock().await;
        match receiver.next().await {
            Some(item) => item,
            None => Err(IoError::new(ErrorKind::BrokenPipe, "no more connections")),
        }
    }

    fn local_addr(&self) -> IoResult<SocketAddr> {
        Ok(self.addr)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::io::Cursor;

    type Stream = Cursor<Vec<u8>>;

    #[test]
    fn feed_listener() {
        let addr: SocketAddr = "192.0.2.1:9000".parse().unwrap();
        let peer: SocketAddr = "198.51.100.7:4444".parse().unwrap();
        let (lis, handle) = mock_listener::<Stream>(addr);
        assert_eq!(lis.local_addr().unwrap(), addr);

        handle
            .push_connection(Cursor::new(b"hi".to_vec()), peer)
            .unwrap();
        handle.push_error(ErrorKind::Other).unwrap();

        futures::executor::block_on(async {
            let (s, a) = lis.accept().await.unwrap();
            assert_eq!(a, peer);
            assert_eq!(s.into_inner(), b"hi".to_vec());

            let e = lis.accept().await.err().unwrap();
            assert_eq!(e.kind(), ErrorKind::Other);

            drop(handle);
            let e = lis.accept().await.err().unwrap();
            assert_eq!(e.kind(), ErrorKind::BrokenPipe);
        });
    }

    #[test]
    fn closed_after_drop() {
        let addr: SocketAddr = "192.0.2.1:9000".parse().unwrap();
        let (lis, handle) = mock_listener::<Stream>(addr);
        assert!(!handle.is_closed());
        drop(lis);
        assert!(handle.is_closed());
        assert!(handle.push_error(ErrorKind::Other).is_err());
    }
}
