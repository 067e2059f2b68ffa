//! Keystream ciphers used to obfuscate relayed TCP streams.
//!
//! A proxy that wants to keep its traffic from being readable at a glance
//! can run every direction of every connection through a
//! [`StreamCipher`].  Two keyed variants exist, cyclic XOR and RC4,
//! together with a pass-through variant for when no key is configured.
//!
//! None of this is real cryptography.  There is no authentication and no
//! integrity protection, and both keyed ciphers are weak.  Use it to
//! obfuscate, never to protect.
//!
//! Keys live in [`Key`], which can't be empty; the cipher types are in
//! [`cipher`].

#![deny(missing_docs)]
#![deny(clippy::await_holding_lock)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::cognitive_complexity)]
#![deny(clippy::debug_assert_with_mut_call)]
#![deny(clippy::expl_impl_clone_on_copy)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod cipher;
mod err;
mod key;

pub use crate::cipher::{CipherConfig, CipherKind, Rc4, StreamCipher, XorCipher};
pub use err::Error;
pub use key::Key;

/// A Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
