//! Implementations of our runtime traits for particular runtimes.
//!
//! Currently only tokio is provided.

pub(crate) mod tokio;
