//! Pactline Types - Canonical domain types for escrowed service agreements
//!
//! This crate contains the foundational types for Pactline with zero
//! dependencies on other pactline crates:
//!
//! - Identity types (Address, DocumentHash, SignatureBytes, AgreementId)
//! - The Agreement record, its proposal payload and lifecycle status
//! - Events emitted by committed operations
//! - The error taxonomy shared by every layer

pub mod identity;
pub mod agreement;
pub mod event;
pub mod error;

pub use identity::*;
pub use agreement::*;
pub use event::*;
pub use error::*;
