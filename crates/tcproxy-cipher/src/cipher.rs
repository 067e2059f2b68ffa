//! Stream ciphers used to obfuscate relayed data.
//!
//! Every cipher here is a keystream XORed against the data, so running
//! the same keystream over the output a second time gives back the input.
//! The two directions of a connection each get their own instance, seeded
//! from the same key: an instance's position in the keystream depends on
//! how many bytes it has seen, and nothing else.
//!
//! Both keyed ciphers implement the `cipher` crate's `StreamCipher`.  Neither
//! keystream ever runs out, so `try_apply_keystream` never fails.

use crate::{Error, Key};

use ::cipher::errors::LoopError;
use ::cipher::StreamCipher as _;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A cipher that XORs its input against the key, repeated forever.
#[derive(Clone)]
pub struct XorCipher {
    /// The key to cycle through.
    key: Key,
    /// Index of the key byte to use next.
    idx: usize,
}

impl XorCipher {
    /// Create a new XorCipher positioned at the start of `key`.
    pub fn new(key: &Key) -> Self {
        XorCipher {
            key: key.clone(),
            idx: 0,
        }
    }
}

impl ::cipher::StreamCipher for XorCipher {
    fn try_apply_keystream(&mut self, data: &mut [u8]) -> Result<(), LoopError> {
        let key = self.key.as_bytes();
        for b in data.iter_mut() {
            *b ^= key[self.idx];
            self.idx = (self.idx + 1) % key.len();
        }
        Ok(())
    }
}

impl fmt::Debug for XorCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XorCipher").finish()
    }
}

/// The RC4 keystream generator.
#[derive(Clone)]
pub struct Rc4 {
    /// The permutation state.
    s: [u8; 256],
    /// First index into `s`.
    i: u8,
    /// Second index into `s`.
    j: u8,
}

impl Rc4 {
    /// Create a new RC4 instance by running the key schedule over `key`.
    pub fn new(key: &Key) -> Self {
        let key = key.as_bytes();
        let mut s = [0_u8; 256];
        for (i, v) in s.iter_mut().enumerate() {
            *v = i as u8;
        }
        let mut j = 0_u8;
        for i in 0..256 {
            j = j.wrapping_add(key[i % key.len()]).wrapping_add(s[i]);
            s.swap(i, j as usize);
        }
        Rc4 { s, i: 0, j: 0 }
    }

    /// Produce the next byte of keystream.
    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let idx = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[idx as usize]
    }
}

impl ::cipher::StreamCipher for Rc4 {
    fn try_apply_keystream(&mut self, data: &mut [u8]) -> Result<(), LoopError> {
        for b in data.iter_mut() {
            *b ^= self.next_byte();
        }
        Ok(())
    }
}

impl fmt::Debug for Rc4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rc4").finish()
    }
}

/// Which keyed cipher to use when a key is configured.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CipherKind {
    /// Cyclic XOR against the key.  See [`XorCipher`].
    Xor,
    /// RC4.  See [`Rc4`].
    Rc4,
}

impl Default for CipherKind {
    fn default() -> Self {
        CipherKind::Rc4
    }
}

impl FromStr for CipherKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "xor" => Ok(CipherKind::Xor),
            "rc4" => Ok(CipherKind::Rc4),
            _ => Err(Error::UnknownCipher(s.to_string())),
        }
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherKind::Xor => write!(f, "xor"),
            CipherKind::Rc4 => write!(f, "rc4"),
        }
    }
}

/// One direction's worth of cipher state.
#[derive(Clone, Debug)]
pub enum StreamCipher {
    /// Leave the data alone.
    PassThrough,
    /// Cyclic XOR.
    Xor(XorCipher),
    /// RC4.
    Rc4(Rc4),
}

impl StreamCipher {
    /// Build a fresh cipher of type `kind` from `key`.
    ///
    /// With no key, this is [`StreamCipher::PassThrough`] whatever `kind`
    /// says.
    pub fn new(kind: CipherKind, key: Option<&Key>) -> Self {
        match (kind, key) {
            (_, None) => StreamCipher::PassThrough,
            (CipherKind::Xor, Some(k)) => StreamCipher::Xor(XorCipher::new(k)),
            (CipherKind::Rc4, Some(k)) => StreamCipher::Rc4(Rc4::new(k)),
        }
    }

    /// Transform every byte of `buf` in place, in order.
    pub fn transform(&mut self, buf: &mut [u8]) {
        match self {
            StreamCipher::PassThrough => {}
            StreamCipher::Xor(c) => c.apply_keystream(buf),
            StreamCipher::Rc4(c) => c.apply_keystream(buf),
        }
    }
}

/// Instructions for building the cipher of every new stream direction.
///
/// A proxy holds one of these and calls [`CipherConfig::instance`] twice
/// per connection: once for each direction.
#[derive(Clone, Debug, Default)]
pub struct CipherConfig {
    /// Which keyed cipher to build.
    kind: CipherKind,
    /// The key to use, if any.
    key: Option<Key>,
}

impl CipherConfig {
    /// Make a new CipherConfig that builds `kind` ciphers from `key`.
    pub fn new(kind: CipherKind, key: Option<Key>) -> Self {
        CipherConfig { kind, key }
    }

    /// Make a new CipherConfig from a key given as a string.
    ///
    /// An empty string means "no key", and yields pass-through ciphers.
    pub fn from_key_str(kind: CipherKind, key: &str) -> Self {
        // Key::new only fails on empty input, which is exactly "no key".
        CipherConfig::new(kind, Key::new(key).ok())
    }

    /// Return a freshly keyed cipher at the start of its keystream.
    pub fn instance(&self) -> StreamCipher {
        StreamCipher::new(self.kind, self.key.as_ref())
    }

    /// Return true if this configuration has a key.
    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }

    /// Return the kind of cipher we build when keyed.
    pub fn kind(&self) -> CipherKind {
        self.kind
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ::cipher::StreamCipher as _;

    fn key(s: &str) -> Key {
        Key::new(s).unwrap()
    }

    #[test]
    fn xor_cycles_key() {
        let mut c = XorCipher::new(&key("ab"));
        let mut data = [0_u8; 5];
        c.apply_keystream(&mut data[..]);
        assert_eq!(&data, b"ababa");
        // The index carries over between calls.
        let mut data = [0_u8; 3];
        c.apply_keystream(&mut data[..]);
        assert_eq!(&data, b"bab");
    }

    #[test]
    fn passthrough_without_key() {
        let cfg = CipherConfig::from_key_str(CipherKind::Rc4, "");
        assert!(!cfg.is_keyed());
        let mut c = cfg.instance();
        assert!(matches!(c, StreamCipher::PassThrough));
        let mut data = *b"unchanged";
        c.transform(&mut data[..]);
        assert_eq!(&data, b"unchanged");
    }

    #[test]
    fn instances_are_independent() {
        let cfg = CipherConfig::from_key_str(CipherKind::Rc4, "Secret");
        let mut a = cfg.instance();
        let mut b = cfg.instance();

        let mut d1 = *b"first chunk";
        a.transform(&mut d1[..]);
        // Advancing `a` must not move `b`.
        let mut d2 = *b"first chunk";
        b.transform(&mut d2[..]);
        assert_eq!(d1, d2);
    }

    #[test]
    fn kind_names() {
        assert_eq!("rc4".parse::<CipherKind>().unwrap(), CipherKind::Rc4);
        assert_eq!("XOR".parse::<CipherKind>().unwrap(), CipherKind::Xor);
        assert_eq!(
            "aes".parse::<CipherKind>(),
            Err(Error::UnknownCipher("aes".into()))
        );
        assert_eq!(CipherKind::Xor.to_string(), "xor");
        assert_eq!(CipherKind::default(), CipherKind::Rc4);
    }
}
