//! Declare an error type for tcproxy-cipher

use thiserror::Error;

/// An error returned while configuring a stream cipher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Somebody tried to build a key out of zero bytes.
    ///
    /// Both keyed ciphers index the key modulo its length, so an empty
    /// key can never be used.
    #[error("cipher key must not be empty")]
    EmptyKey,

    /// A cipher name didn't match any cipher we know about.
    #[error("unrecognized cipher {0:?}")]
    UnknownCipher(String),
}
