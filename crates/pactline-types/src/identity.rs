//! Identity types for Pactline
//!
//! Accounts and payment tokens are both identified by 20-byte addresses.
//! Digests are 32 bytes. Both render as `0x`-prefixed lowercase hex and
//! serialize as that string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Failure to parse a hex-encoded identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseHexError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Decode an optionally `0x`-prefixed hex string into exactly `N` bytes
pub fn decode_fixed_hex<const N: usize>(s: &str) -> Result<[u8; N], ParseHexError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|e| ParseHexError::InvalidHex(e.to_string()))?;
    if bytes.len() != N {
        return Err(ParseHexError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Macro to generate fixed-width byte identifiers with hex formatting
macro_rules! define_hex_type {
    ($name:ident, $len:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// The all-zero value
            pub const ZERO: Self = Self([0u8; $len]);

            /// Width in bytes
            pub const LEN: usize = $len;

            /// Wrap raw bytes
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Whether every byte is zero
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            /// Borrow the raw bytes
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Lowercase hex with `0x` prefix
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_fixed_hex::<$len>(s).map(Self)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_hex_type!(Address, 20, "A 20-byte account or token address");
define_hex_type!(DocumentHash, 32, "A 32-byte digest of an off-system terms document");

/// Opaque signature bytes, `r ‖ s ‖ v` when well-formed
///
/// An empty value means "not signed yet".
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SignatureBytes(pub Vec<u8>);

impl SignatureBytes {
    /// The unsigned placeholder
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for SignatureBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<[u8; 65]> for SignatureBytes {
    fn from(bytes: [u8; 65]) -> Self {
        Self(bytes.to_vec())
    }
}

impl FromStr for SignatureBytes {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(s)
            .map(Self)
            .map_err(|e| ParseHexError::InvalidHex(e.to_string()))
    }
}

impl fmt::Display for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({})", self.to_hex())
    }
}

impl Serialize for SignatureBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SignatureBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sequential agreement identifier; zero is reserved for "not found"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgreementId(pub u64);

impl AgreementId {
    /// The id carried by the zero-valued record
    pub const NONE: Self = Self(0);

    /// The first id ever assigned
    pub const FIRST: Self = Self(1);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// The id that follows this one, or `None` once the space is used up
    pub fn checked_next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for AgreementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AgreementId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parses_with_and_without_prefix() {
        let with: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        let without: Address = "00000000000000000000000000000000000000aa".parse().unwrap();
        assert_eq!(with, without);
        assert_eq!(with.0[19], 0xaa);
        assert_eq!(with.to_string(), "0x00000000000000000000000000000000000000aa");
    }

    #[test]
    fn address_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(err, ParseHexError::InvalidLength { expected: 20, actual: 2 });
    }

    #[test]
    fn zero_address_is_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::default().is_zero());
        assert!(!Address::new([1u8; 20]).is_zero());
    }

    #[test]
    fn document_hash_serializes_as_hex_string() {
        let hash = DocumentHash::new([0xab; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(32)));
        let back: DocumentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn empty_signature_is_empty() {
        let sig = SignatureBytes::empty();
        assert!(sig.is_empty());
        assert_eq!(sig.to_string(), "0x");
        let parsed: SignatureBytes = "0x".parse().unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn agreement_id_zero_means_none() {
        assert!(AgreementId::NONE.is_none());
        assert!(AgreementId::default().is_none());
        assert_eq!(AgreementId::FIRST.checked_next(), Some(AgreementId(2)));
    }

    #[test]
    fn agreement_ids_do_not_wrap() {
        assert_eq!(AgreementId(u64::MAX).checked_next(), None);
        assert_eq!(AgreementId(u64::MAX - 1).checked_next(), Some(AgreementId(u64::MAX)));
    }
}
