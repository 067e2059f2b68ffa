//! Declare MockNetRuntime.

use crate::traits::*;

use async_trait::async_trait;
use futures::task::{FutureObj, Spawn, SpawnError};
use std::collections::{HashMap, HashSet};
use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A wrapper Runtime that overrides name resolution, and can refuse
/// connections, for the underlying runtime.
///
/// Only names registered with [`MockNetRuntime::add_host`] (and IP
/// literals) resolve.  Connections to addresses passed to
/// [`MockNetRuntime::refuse`] fail with [`ErrorKind::ConnectionRefused`];
/// everything else is handed to the wrapped runtime.
#[derive(Clone)]
pub struct MockNetRuntime<R: Runtime> {
    /// The underlying runtime. Most calls get delegated here.
    runtime: R,
    /// Our simulated view of the network.
    net: Arc<MockNetState>,
}

/// Shared part of a MockNetRuntime.
#[derive(Default)]
struct MockNetState {
    /// Map from host name to the addresses it resolves to.
    hosts: Mutex<HashMap<String, Vec<IpAddr>>>,
    /// Addresses to which every connection attempt is refused.
    refused: Mutex<HashSet<SocketAddr>>,
}

impl<R: Runtime> MockNetRuntime<R> {
    /// Create a new runtime that wraps `runtime`, with no names and no
    /// refused addresses.
    pub fn new(runtime: R) -> Self {
        MockNetRuntime {
            runtime,
            net: Arc::new(MockNetState::default()),
        }
    }

    /// Make `name` resolve to `addrs`, in order.
    pub fn add_host(&self, name: &str, addrs: &[IpAddr]) {
        self.net
            .hosts
            .lock()
            .expect("Poisoned lock for hosts")
            .insert(name.to_lowercase(), addrs.to_vec());
    }

    /// Refuse every later connection attempt to `addr`.
    pub fn refuse(&self, addr: SocketAddr) {
        self.net
            .refused
            .lock()
            .expect("Poisoned lock for refused addresses")
            .insert(addr);
    }
}

impl<R: Runtime> Spawn for MockNetRuntime<R> {
    fn spawn_obj(&self, future: FutureObj<'static, ()>) -> Result<(), SpawnError> {
        self.runtime.spawn_obj(future)
    }
}

impl<R: Runtime> SleepProvider for MockNetRuntime<R> {
    type SleepFuture = R::SleepFuture;
    fn sleep(&self, dur: Duration) -> Self::SleepFuture {
        self.runtime.sleep(dur)
    }
}

#[async_trait]
impl<R: Runtime> TcpProvider for MockNetRuntime<R> {
    type TcpStream = R::TcpStream;
    type TcpListener = R::TcpListener;

    async fn connect(&self, addr: &SocketAddr) -> IoResult<Self::TcpStream> {
        let refused = self
            .net
            .refused
            .lock()
            .expect("Poisoned lock for refused addresses")
            .contains(addr);
        if refused {
            return Err(IoError::new(
                ErrorKind::ConnectionRefused,
                "connection refused by mock network",
            ));
        }
        self.runtime.connect(addr).await
    }

    async fn listen(&self, addr: &SocketAddr) -> IoResult<Self::TcpListener> {
        self.runtime.listen(addr).await
    }

    async fn resolve(&self, host: &str, port: u16) -> IoResult<Vec<SocketAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }
        let hosts = self.net.hosts.lock().expect("Poisoned lock for hosts");
        match hosts.get(&host.to_lowercase()) {
            Some(ips) => Ok(ips.iter().map(|ip| SocketAddr::new(*ip, port)).collect()),
            None => Err(IoError::new(
                ErrorKind::NotFound,
                format!("no such host {:?}", host),
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_with_runtime;

    #[test]
    fn resolve_names() {
        test_with_runtime(|rt| async move {
            let rt = MockNetRuntime::new(rt);
            let ip: IpAddr = "192.0.2.55".parse().unwrap();
            rt.add_host("Upstream.Example", &[ip]);

            let a = rt.resolve("upstream.example", 80).await.unwrap();
            assert_eq!(a, vec![SocketAddr::new(ip, 80)]);

            let a = rt.resolve("10.0.0.1", 443).await.unwrap();
            assert_eq!(a, vec!["10.0.0.1:443".parse().unwrap()]);

            let e = rt.resolve("nowhere.example", 80).await.err().unwrap();
            assert_eq!(e.kind(), ErrorKind::NotFound);
        });
    }

    #[test]
    fn refuse_connections() {
        test_with_runtime(|rt| async move {
            let rt = MockNetRuntime::new(rt);
            let lis = rt.listen(&"127.0.0.1:0".parse().unwrap()).await.unwrap();
            let addr = lis.local_addr().unwrap();

            // Reachable until we say otherwise.
            assert!(rt.connect(&addr).await.is_ok());
            rt.refuse(addr);
            let e = rt.connect(&addr).await.err().unwrap();
            assert_eq!(e.kind(), ErrorKind::ConnectionRefused);
        });
    }
}
