//! A TCP proxy that relays connections to one fixed upstream server.
//!
//! Every connection accepted on the listening socket is paired with a
//! fresh connection to the upstream server; the pair is a [`Bridge`].
//! Bytes are relayed both ways without interpretation, optionally run
//! through a stream cipher (see [`tcproxy_cipher`]) on the way.
//!
//! The accept loop lives in [`proxy`], and the per-connection state
//! machine in [`bridge`].  Both are written against the
//! [`tcproxy_rtcompat::Runtime`] traits rather than a particular
//! executor.

#![deny(missing_docs)]
#![deny(clippy::await_holding_lock)]
#![warn(clippy::clone_on_ref_ptr)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod bridge;
pub mod config;
mod err;
pub mod proxy;

pub use bridge::{Bridge, BridgeReport, HalfClose, HalfCloseFlags, Upstream, BUFFER_LEN};
pub use err::Error;
pub use proxy::{run_proxy, AcceptErrorPolicy, Acceptor};
pub use tcproxy_cipher::{CipherConfig, CipherKind};

/// A Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
