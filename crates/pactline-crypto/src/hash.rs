//! Keccak hashing and the signed-message digest convention

use pactline_types::DocumentHash;
use sha3::{Digest, Keccak256};

/// Prefix applied to a 32-byte hash before it is signed as a message
pub const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Compute keccak-256 of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Compute keccak-256 of data and return as `0x` hex
pub fn keccak256_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(keccak256(data)))
}

/// Hash an off-system terms document into the digest both parties sign
pub fn terms_document_hash(document: &[u8]) -> DocumentHash {
    DocumentHash::new(keccak256(document))
}

/// The digest signatures over a terms hash are actually computed over
pub fn signed_message_digest(hash: &DocumentHash) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(SIGNED_MESSAGE_PREFIX);
    hasher.update(hash.as_bytes());
    hasher.finalize().into()
}
