//! Pactline Crypto - Cryptographic primitives for signed service agreements
//!
//! This crate provides:
//! - Keccak-256 hashing and the signed-message digest convention
//! - secp256k1 party keys with Ethereum-compatible addresses
//! - Signer recovery from 65-byte `r ‖ s ‖ v` signatures

pub mod hash;
pub mod keys;
pub mod signature;

pub use hash::*;
pub use keys::*;
pub use signature::*;

use pactline_types::{Address, AgreementError};
use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Signature recovered to {recovered}, expected {expected}")]
    SignerMismatch { expected: Address, recovered: Address },

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

impl From<CryptoError> for AgreementError {
    fn from(_: CryptoError) -> Self {
        AgreementError::InvalidSignature
    }
}
