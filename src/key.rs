//! Record key contract and the shipped content-hash key.
//!
//! A key identifies "the same logical item" across inserts. Duplicate keys may
//! occupy several tree nodes (insertion never merges), so search deduplicates
//! by key and the contract below is exactly what that needs: total order,
//! equality, hashing, and a binary form that survives the node stream.

use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

use thiserror::Error;

/// Capability contract for record keys.
///
/// Implementations must provide a total order (`Ord`), equality, and hashing,
/// plus a binary encoding that is either fixed-length or self-delimiting so
/// the decoder knows where the key ends inside the node stream.
pub trait IndexKey: Clone + Eq + Ord + std::hash::Hash + fmt::Debug {
    /// Writes the key's binary form.
    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    /// Reads a key back from its binary form.
    fn decode<R: Read>(reader: &mut R) -> io::Result<Self>
    where
        Self: Sized;
}

/// Length in bytes of a [`ContentHash`] digest.
pub const CONTENT_HASH_LEN: usize = 20;

/// A 20-byte content digest used as the shipped key type.
///
/// Typically a commit or blob digest from a version-control system. Ordering
/// and equality are byte-wise; the stream form is the raw 20 bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; CONTENT_HASH_LEN]);

impl ContentHash {
    /// Creates a hash from raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; CONTENT_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CONTENT_HASH_LEN] {
        &self.0
    }

    /// Parses a 40-character hex string, case insensitive.
    pub fn from_hex(hex: &str) -> Result<Self, ParseHashError> {
        let expected = CONTENT_HASH_LEN * 2;
        if hex.len() != expected {
            return Err(ParseHashError::BadLength {
                expected,
                actual: hex.len(),
            });
        }
        let raw = hex.as_bytes();
        let mut bytes = [0u8; CONTENT_HASH_LEN];
        for (i, slot) in bytes.iter_mut().enumerate() {
            let hi = hex_digit(raw[2 * i])?;
            let lo = hex_digit(raw[2 * i + 1])?;
            *slot = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

fn hex_digit(byte: u8) -> Result<u8, ParseHashError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        other => Err(ParseHashError::BadDigit(other as char)),
    }
}

/// Error from parsing a hex string into a [`ContentHash`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseHashError {
    #[error("content hash must be {expected} hex characters, got {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("invalid hex digit {0:?} in content hash")]
    BadDigit(char),
}

impl IndexKey for ContentHash {
    fn encode<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.0)
    }

    fn decode<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut bytes = [0u8; CONTENT_HASH_LEN];
        reader.read_exact(&mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
