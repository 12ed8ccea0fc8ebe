//! Signer recovery over terms hashes
//!
//! A signature is 65 bytes `r ‖ s ‖ v`. `v` may be 27/28 or the raw
//! recovery id 0/1. Malleable (high-`s`) signatures are rejected.

use crate::hash::signed_message_digest;
use crate::keys::address_from_verifying_key;
use crate::{CryptoError, CryptoResult};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::scalar::IsHigh;
use pactline_types::{Address, DocumentHash, SignatureBytes};

/// Expected signature width in bytes
pub const SIGNATURE_LEN: usize = 65;

/// Stateless signer recovery
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Recover the signer of a raw 32-byte prehash
    pub fn recover_prehash(prehash: &[u8; 32], signature: &SignatureBytes) -> CryptoResult<Address> {
        let bytes = signature.as_slice();
        if bytes.len() != SIGNATURE_LEN {
            return Err(CryptoError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                bytes.len()
            )));
        }

        let recovery_byte = match bytes[64] {
            v @ (27 | 28) => v - 27,
            v @ (0 | 1) => v,
            v => {
                return Err(CryptoError::InvalidSignature(format!("bad recovery id {}", v)));
            }
        };
        let recovery_id = RecoveryId::from_byte(recovery_byte)
            .ok_or_else(|| CryptoError::InvalidSignature("bad recovery id".to_string()))?;

        let sig = Signature::from_slice(&bytes[..64])
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        if bool::from(sig.s().is_high()) {
            return Err(CryptoError::InvalidSignature("malleable s value".to_string()));
        }

        let key = VerifyingKey::recover_from_prehash(prehash, &sig, recovery_id)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

        let address = address_from_verifying_key(&key);
        if address.is_zero() {
            return Err(CryptoError::InvalidSignature("recovered zero address".to_string()));
        }
        Ok(address)
    }

    /// Recover the signer of a terms hash under the signed-message convention
    pub fn recover(hash: &DocumentHash, signature: &SignatureBytes) -> CryptoResult<Address> {
        Self::recover_prehash(&signed_message_digest(hash), signature)
    }

    /// Check that `expected` signed `hash`
    pub fn verify(hash: &DocumentHash, signature: &SignatureBytes, expected: &Address) -> CryptoResult<()> {
        let recovered = Self::recover(hash, signature)?;
        if &recovered != expected {
            tracing::debug!(%recovered, %expected, "signature recovered to a different signer");
            return Err(CryptoError::SignerMismatch {
                expected: *expected,
                recovered,
            });
        }
        Ok(())
    }
}
