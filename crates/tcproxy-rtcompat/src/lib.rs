//! Compatibility between tcproxy and its async runtime.
//!
//! The rest of tcproxy never talks to tokio directly.  Instead it uses
//! the handful of traits declared here, [`Runtime`] and its parts, so that
//! tests can substitute a network whose failures they control (see
//! [`mock`]).
//!
//! Streams are exposed through the `futures` I/O traits, so code written
//! against a [`Runtime`] only ever sees `futures::io::AsyncRead` and
//! `futures::io::AsyncWrite`.

#![deny(missing_docs)]
#![deny(clippy::await_holding_lock)]
#![warn(clippy::clone_on_ref_ptr)]
#![deny(clippy::missing_docs_in_private_items)]

pub(crate) mod impls;
pub mod mock;
pub mod tokio;
mod traits;

#[cfg(test)]
mod test;

pub use traits::{Runtime, SleepProvider, Spawn, TcpListener, TcpProvider};

pub use crate::tokio::{create_runtime, test_with_runtime};
