//! Content hashes with object-kind suffixes.

use crate::error::{GcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One-byte object-kind marker carried next to a digest.
///
/// The suffix takes part in equality: a catalog and a file object with the
/// same digest are different objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Suffix {
    /// Plain file data object (no suffix letter).
    #[default]
    None,
    /// Catalog file, suffix letter `C`.
    Catalog,
    /// Partial file chunk, suffix letter `P`.
    Partial,
    /// History database, suffix letter `H`.
    History,
}

impl Suffix {
    /// The suffix letter, or `None` for plain file objects.
    pub fn as_char(self) -> Option<char> {
        match self {
            Suffix::None => None,
            Suffix::Catalog => Some('C'),
            Suffix::Partial => Some('P'),
            Suffix::History => Some('H'),
        }
    }

    /// Parses a suffix letter.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'C' => Some(Suffix::Catalog),
            'P' => Some(Suffix::Partial),
            'H' => Some(Suffix::History),
            _ => None,
        }
    }
}

/// A 32-byte content digest plus its object-kind suffix.
///
/// The textual form is 64 lowercase hex characters followed by the suffix
/// letter when present. The storage-path form shards on the first two hex
/// characters: `ab/cdef…C`.
///
/// # Examples
///
/// ```
/// use strata_gc::{ObjectHash, Suffix};
///
/// let hash = ObjectHash::new([0xab; 32], Suffix::Catalog);
/// assert_eq!(hash.to_string(), format!("{}C", "ab".repeat(32)));
/// assert!(hash.storage_path().starts_with("ab/"));
/// assert_eq!(ObjectHash::from_storage_path(&hash.storage_path()).unwrap(), hash);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash {
    digest: [u8; 32],
    suffix: Suffix,
}

impl ObjectHash {
    /// Digest length in bytes.
    pub const LEN: usize = 32;

    /// Digest length as a hex string, excluding the suffix letter.
    pub const HEX_LEN: usize = 64;

    /// Creates a hash from raw digest bytes and a suffix.
    #[inline]
    pub fn new(digest: [u8; 32], suffix: Suffix) -> Self {
        Self { digest, suffix }
    }

    /// The distinguished null hash: all-zero digest, no suffix.
    pub fn null() -> Self {
        Self::new([0u8; 32], Suffix::None)
    }

    /// Whether the digest is all zeroes, regardless of suffix.
    pub fn is_null(&self) -> bool {
        self.digest.iter().all(|b| *b == 0)
    }

    /// Returns the raw digest bytes.
    #[inline]
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Returns the object-kind suffix.
    #[inline]
    pub fn suffix(&self) -> Suffix {
        self.suffix
    }

    /// Returns the same digest with a different suffix.
    pub fn with_suffix(&self, suffix: Suffix) -> Self {
        Self::new(self.digest, suffix)
    }

    /// The digest as a lowercase hex string, without the suffix letter.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Parses a hash from suffixed hex: 64 hex characters plus an optional
    /// trailing suffix letter.
    ///
    /// # Errors
    ///
    /// Returns `GcError::InvalidHex` for wrong lengths, unknown suffix
    /// letters, or non-hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let (digits, suffix) = match s.len() {
            len if len == Self::HEX_LEN => (s, Suffix::None),
            len if len == Self::HEX_LEN + 1 => {
                let c = s.chars().next_back().unwrap_or('\0');
                let suffix = Suffix::from_char(c)
                    .ok_or_else(|| GcError::InvalidHex(format!("unknown suffix '{}'", c)))?;
                (&s[..Self::HEX_LEN], suffix)
            }
            len => {
                return Err(GcError::InvalidHex(format!(
                    "expected {} hex chars, got {}",
                    Self::HEX_LEN,
                    len
                )))
            }
        };

        let bytes = hex::decode(digits).map_err(|e| GcError::InvalidHex(e.to_string()))?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| GcError::InvalidHex("invalid length".to_string()))?;

        Ok(Self::new(digest, suffix))
    }

    /// The sharded storage path: first two hex characters, a slash, the
    /// remaining hex characters, then the suffix letter when present.
    pub fn storage_path(&self) -> String {
        let hex = self.digest_hex();
        match self.suffix.as_char() {
            Some(c) => format!("{}/{}{}", &hex[..2], &hex[2..], c),
            None => format!("{}/{}", &hex[..2], &hex[2..]),
        }
    }

    /// Recovers a hash from its storage path.
    ///
    /// # Errors
    ///
    /// Returns `GcError::InvalidStoragePath` if the path does not match the
    /// `xx/yyyy…[suffix]` convention.
    pub fn from_storage_path(path: &str) -> Result<Self> {
        let bad = || GcError::InvalidStoragePath(path.to_string());

        let (shard, rest) = path.split_once('/').ok_or_else(bad)?;
        if shard.len() != 2 || rest.len() < Self::HEX_LEN - 2 {
            return Err(bad());
        }

        Self::from_hex(&format!("{}{}", shard, rest)).map_err(|_| bad())
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digest_hex())?;
        if let Some(c) = self.suffix.as_char() {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHash({}…{:?})", &self.digest_hex()[..12], self.suffix)
    }
}
