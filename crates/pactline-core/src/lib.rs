//! Pactline Core - Lifecycle engine for escrowed service agreements
//!
//! A service provider proposes terms and signs their hash; the client
//! countersigns the same hash and, in the same step, deposits the payment
//! into custody. The engine then tracks the agreement until fulfillment.
//!
//! - [`AgreementManager`]: records, transitions, custody transfer
//! - [`PaymentTokenRegistry`]: admin-gated allow-list of payment tokens
//! - [`AccessGate`]: administrator capability consumed by the registry
//! - [`Clock`]: time source for deadlines and creation timestamps
//!
//! # Invariants
//!
//! 1. A client never equals its service provider, and is never the zero address
//! 2. Only `status` and `client_sig` change after creation
//! 3. Ids start at 1, grow by one per creation, and are never reused
//! 4. An operation either commits every effect or none

pub mod access;
pub mod clock;
pub mod registry;
pub mod manager;

pub use access::*;
pub use clock::*;
pub use registry::*;
pub use manager::*;
