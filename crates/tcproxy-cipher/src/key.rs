//! Key material for the keyed stream ciphers.

use crate::{Error, Result};

use std::fmt;

/// Key material for a keyed stream cipher.
///
/// A `Key` is never empty: that is checked once, here, so that the
/// ciphers themselves can't fail.
#[derive(Clone, PartialEq, Eq)]
pub struct Key(Vec<u8>);

impl Key {
    /// Construct a new key from `bytes`.
    ///
    /// Returns [`Error::EmptyKey`] if `bytes` is empty.
    pub fn new<B: Into<Vec<u8>>>(bytes: B) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::EmptyKey);
        }
        Ok(Key(bytes))
    }

    /// Return the bytes of this key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key([{} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_key_rejected() {
        assert_eq!(Key::new(Vec::new()), Err(Error::EmptyKey));
        assert_eq!(Key::new(""), Err(Error::EmptyKey));
    }

    #[test]
    fn key_contents() {
        let k = Key::new("hello").unwrap();
        assert_eq!(k.as_bytes(), b"hello");
        // Don't leak key material into logs.
        assert_eq!(format!("{:?}", k), "Key([5 bytes])");
    }
}
