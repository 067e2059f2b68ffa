//! Declare an error type for tcproxy

use crate::bridge::Upstream;

use futures::task::SpawnError;
use std::io::Error as IoError;
use std::net::SocketAddr;
use thiserror::Error;

/// An error returned while running a proxy or one of its bridges.
#[derive(Error, Debug)]
pub enum Error {
    /// We couldn't look up the address of the upstream server.
    #[error("unable to resolve {target}: {source}")]
    Resolve {
        /// The upstream we were looking for.
        target: Upstream,
        /// What went wrong.
        source: IoError,
    },

    /// The upstream server's name resolved, but to nothing.
    #[error("{0} resolved to no addresses")]
    NoAddress(Upstream),

    /// Every address of the upstream server refused us.
    ///
    /// `source` is the error from the last address we tried.
    #[error("unable to connect to {target}: {source}")]
    Connect {
        /// The upstream we tried to reach.
        target: Upstream,
        /// What went wrong.
        source: IoError,
    },

    /// We couldn't open the listening socket.
    #[error("unable to listen on {addr}: {source}")]
    Bind {
        /// The address we tried to bind.
        addr: SocketAddr,
        /// What went wrong.
        source: IoError,
    },

    /// The listening address wasn't an IP address.
    #[error("invalid listening address {0:?}")]
    BadAddress(String),

    /// The runtime wouldn't launch a task for us.
    #[error("unable to spawn task: {0}")]
    Spawn(#[from] SpawnError),
}
