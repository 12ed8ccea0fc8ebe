//! secp256k1 signing identities
//!
//! A `PartyKey` holds the private key of one agreement party. The address
//! is the last 20 bytes of keccak-256 over the uncompressed public key
//! (without the `0x04` tag byte).

use crate::hash::signed_message_digest;
use crate::{keccak256, CryptoError, CryptoResult};
use k256::ecdsa::{SigningKey, VerifyingKey};
use pactline_types::{Address, DocumentHash, SignatureBytes};
use rand::rngs::OsRng;

const NAMED_KEY_CONTEXT: &str = "pactline party key v1";

/// Derive the account address of a secp256k1 public key
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let encoded = key.to_encoded_point(false);
    // bytes[0] == 0x04 (prefix), skip it
    let hash = keccak256(&encoded.as_bytes()[1..]);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    Address::new(addr)
}

/// A party's signing key (never exported except on explicit request)
#[derive(Clone)]
pub struct PartyKey {
    signing_key: SigningKey,
    address: Address,
}

impl PartyKey {
    /// Generate a new random key
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Create from 32 secret key bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Parse a hex-encoded secret key (with or without `0x`)
    pub fn from_secret_hex(s: &str) -> CryptoResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Deterministic key for a label, stable across runs
    pub fn for_name(name: &str) -> CryptoResult<Self> {
        let seed = blake3::derive_key(NAMED_KEY_CONTEXT, name.as_bytes());
        Self::from_secret_bytes(&seed)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_from_verifying_key(signing_key.verifying_key());
        Self { signing_key, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Secret key bytes as hex (for secure storage only!)
    pub fn secret_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.to_bytes()))
    }

    /// Sign a 32-byte prehash, returning `r ‖ s ‖ v` with `v ∈ {27, 28}`
    pub fn sign_prehash(&self, prehash: &[u8; 32]) -> CryptoResult<SignatureBytes> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(prehash)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let mut out = Vec::with_capacity(65);
        out.extend_from_slice(&signature.to_bytes());
        out.push(27 + recovery_id.to_byte());
        Ok(SignatureBytes::from(out))
    }

    /// Sign a terms hash under the signed-message convention
    pub fn sign_terms(&self, hash: &DocumentHash) -> CryptoResult<SignatureBytes> {
        self.sign_prehash(&signed_message_digest(hash))
    }
}

impl std::fmt::Debug for PartyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartyKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_key_derives_known_address() {
        // secret key 1 → generator point
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let key = PartyKey::from_secret_bytes(&secret).unwrap();
        assert_eq!(
            key.address().to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn named_keys_are_deterministic() {
        let a1 = PartyKey::for_name("alice").unwrap();
        let a2 = PartyKey::for_name("alice").unwrap();
        let b = PartyKey::for_name("bob").unwrap();
        assert_eq!(a1.address(), a2.address());
        assert_ne!(a1.address(), b.address());
    }

    #[test]
    fn secret_hex_round_trips() {
        let key = PartyKey::generate();
        let restored = PartyKey::from_secret_hex(&key.secret_hex()).unwrap();
        assert_eq!(restored.address(), key.address());
    }

    #[test]
    fn zero_secret_is_rejected() {
        assert!(matches!(
            PartyKey::from_secret_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn signatures_are_65_bytes_with_ethereum_v() {
        let key = PartyKey::for_name("signer").unwrap();
        let sig = key.sign_terms(&DocumentHash::new([3u8; 32])).unwrap();
        assert_eq!(sig.len(), 65);
        assert!(matches!(sig.as_slice()[64], 27 | 28));
    }

    #[test]
    fn debug_hides_secret() {
        let key = PartyKey::for_name("carol").unwrap();
        let rendered = format!("{:?}", key);
        assert!(rendered.contains(&key.address().to_string()));
        assert!(!rendered.contains(&key.secret_hex()[2..]));
    }
}
