//! Error types for Pactline
//!
//! Every failure aborts the operation that raised it; no partial effects
//! survive an error.

use crate::{Address, AgreementId, AgreementStatus};
use thiserror::Error;

/// Result type for Pactline operations
pub type Result<T> = std::result::Result<T, AgreementError>;

/// Pactline error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgreementError {
    // ========================================================================
    // Input Validation
    // ========================================================================

    #[error("Deadline must be in the future")]
    DeadlineMustBeInFuture,

    #[error("Payment token {token} is not accepted")]
    PaymentTokenNotAccepted { token: Address },

    #[error("Payment amount cannot be zero")]
    PaymentAmountCannotBeZero,

    #[error("Client cannot be the service provider")]
    ClientCannotBeServiceProvider,

    #[error("Invalid address")]
    InvalidAddress,

    // ========================================================================
    // Authorization
    // ========================================================================

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Sender {sender} is not entitled to act on agreement {id}")]
    SenderShouldBeParty { id: AgreementId, sender: Address },

    #[error("{caller} is not the administrator")]
    NotAdministrator { caller: Address },

    // ========================================================================
    // State / Lifecycle
    // ========================================================================

    #[error("Agreement {id} not found")]
    AgreementNotFound { id: AgreementId },

    #[error("Agreement {id} is not in Draft (status: {status})")]
    AgreementNotInDraft { id: AgreementId, status: AgreementStatus },

    #[error("Agreement {id} is not Accepted (status: {status})")]
    AgreementNotAccepted { id: AgreementId, status: AgreementStatus },

    #[error("Agreement {id} is not in Execution (status: {status})")]
    AgreementNotInExecution { id: AgreementId, status: AgreementStatus },

    #[error("No agreement ids left to assign")]
    AgreementIdsExhausted,

    // ========================================================================
    // Resource Sufficiency
    // ========================================================================

    #[error("Insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: u128, required: u128 },

    #[error("Insufficient allowance: have {available}, need {required}")]
    InsufficientAllowance { available: u128, required: u128 },

    #[error("Escrow transfer rejected: {reason}")]
    EscrowTransferFailed { reason: String },
}

impl AgreementError {
    /// Short, stable name of the variant (matches the event/ABI vocabulary)
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeadlineMustBeInFuture => "DeadlineMustBeInFuture",
            Self::PaymentTokenNotAccepted { .. } => "PaymentTokenNotAccepted",
            Self::PaymentAmountCannotBeZero => "PaymentAmountCannotBeZero",
            Self::ClientCannotBeServiceProvider => "ClientCannotBeServiceProvider",
            Self::InvalidAddress => "InvalidAddress",
            Self::InvalidSignature => "InvalidSignature",
            Self::SenderShouldBeParty { .. } => "SenderShouldBeParty",
            Self::NotAdministrator { .. } => "NotAdministrator",
            Self::AgreementNotFound { .. } => "AgreementNotFound",
            Self::AgreementNotInDraft { .. } => "AgreementNotInDraft",
            Self::AgreementNotAccepted { .. } => "AgreementNotAccepted",
            Self::AgreementNotInExecution { .. } => "AgreementNotInExecution",
            Self::AgreementIdsExhausted => "AgreementIdsExhausted",
            Self::InsufficientBalance { .. } => "InsufficientBalance",
            Self::InsufficientAllowance { .. } => "InsufficientAllowance",
            Self::EscrowTransferFailed { .. } => "EscrowTransferFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = AgreementError::AgreementNotInDraft {
            id: AgreementId(7),
            status: AgreementStatus::Accepted,
        };
        assert_eq!(err.to_string(), "Agreement 7 is not in Draft (status: Accepted)");
        assert_eq!(err.code(), "AgreementNotInDraft");
    }
}
