//! Agreement records and the lifecycle status they move through
//!
//! An agreement is proposed by a service provider, countersigned and funded
//! by a client, and then tracked until fulfillment:
//!
//! ```text
//! Draft → Accepted → Execution → Fulfilled
//! ```
//!
//! `Dispute` and `Closed` exist in the status set but nothing transitions
//! into them.

use crate::{Address, AgreementId, DocumentHash, SignatureBytes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an agreement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementStatus {
    /// Proposed by the service provider, awaiting the client
    #[default]
    Draft,
    /// Countersigned by the client, payment held in custody
    Accepted,
    /// Service provider has started the work
    Execution,
    /// Work completed
    Fulfilled,
    /// Reserved
    Dispute,
    /// Reserved
    Closed,
}

impl AgreementStatus {
    /// Whether no further transition can leave this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Fulfilled | Self::Closed)
    }
}

impl fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "Draft",
            Self::Accepted => "Accepted",
            Self::Execution => "Execution",
            Self::Fulfilled => "Fulfilled",
            Self::Dispute => "Dispute",
            Self::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// Terms submitted by the proposer when creating an agreement
///
/// `service_provider` is informational only: the stored record always binds
/// the service provider to the caller that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementProposal {
    pub client: Address,
    #[serde(default)]
    pub service_provider: Address,
    pub deadline: DateTime<Utc>,
    pub payment_token: Address,
    pub payment_amount: u128,
    pub terms_cid: String,
    pub terms_document_hash: DocumentHash,
}

impl AgreementProposal {
    pub fn new(
        client: Address,
        payment_token: Address,
        payment_amount: u128,
        deadline: DateTime<Utc>,
        terms_cid: impl Into<String>,
        terms_document_hash: DocumentHash,
    ) -> Self {
        Self {
            client,
            service_provider: Address::ZERO,
            deadline,
            payment_token,
            payment_amount,
            terms_cid: terms_cid.into(),
            terms_document_hash,
        }
    }

    /// Claim a service provider in the payload (ignored at creation)
    pub fn with_service_provider(mut self, service_provider: Address) -> Self {
        self.service_provider = service_provider;
        self
    }
}

/// A persisted agreement record
///
/// Only `status` and `client_sig` change after creation.
/// `Agreement::default()` is the zero-valued record handed out for
/// unknown ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub id: AgreementId,
    pub client: Address,
    pub service_provider: Address,
    pub deadline: DateTime<Utc>,
    pub payment_token: Address,
    pub payment_amount: u128,
    pub terms_cid: String,
    pub terms_document_hash: DocumentHash,
    pub creation_timestamp: DateTime<Utc>,
    pub status: AgreementStatus,
    pub service_provider_sig: SignatureBytes,
    pub client_sig: SignatureBytes,
}

impl Agreement {
    /// Build a fresh Draft record from a proposal
    pub fn draft(
        id: AgreementId,
        service_provider: Address,
        proposal: AgreementProposal,
        service_provider_sig: SignatureBytes,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client: proposal.client,
            service_provider,
            deadline: proposal.deadline,
            payment_token: proposal.payment_token,
            payment_amount: proposal.payment_amount,
            terms_cid: proposal.terms_cid,
            terms_document_hash: proposal.terms_document_hash,
            creation_timestamp: created_at,
            status: AgreementStatus::Draft,
            service_provider_sig,
            client_sig: SignatureBytes::empty(),
        }
    }

    /// Existence is tested by a nonzero id
    pub fn exists(&self) -> bool {
        !self.id.is_none()
    }

    /// Whether `who` is the client or the service provider
    pub fn is_party(&self, who: &Address) -> bool {
        &self.client == who || &self.service_provider == who
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn proposal() -> AgreementProposal {
        AgreementProposal::new(
            Address::new([2u8; 20]),
            Address::new([9u8; 20]),
            500,
            Utc::now() + Duration::hours(1),
            "bafyterms",
            DocumentHash::new([7u8; 32]),
        )
    }

    #[test]
    fn zero_record_does_not_exist() {
        let record = Agreement::default();
        assert!(!record.exists());
        assert_eq!(record.status, AgreementStatus::Draft);
        assert!(record.client_sig.is_empty());
    }

    #[test]
    fn draft_binds_caller_as_service_provider() {
        let caller = Address::new([1u8; 20]);
        let spoofed = proposal().with_service_provider(Address::new([3u8; 20]));
        let now = Utc::now();

        let record = Agreement::draft(AgreementId(4), caller, spoofed, SignatureBytes::empty(), now);

        assert_eq!(record.service_provider, caller);
        assert_eq!(record.id, AgreementId(4));
        assert_eq!(record.status, AgreementStatus::Draft);
        assert_eq!(record.creation_timestamp, now);
        assert!(record.is_party(&caller));
        assert!(record.is_party(&Address::new([2u8; 20])));
        assert!(!record.is_party(&Address::new([3u8; 20])));
    }

    #[test]
    fn only_fulfilled_and_closed_are_terminal() {
        assert!(AgreementStatus::Fulfilled.is_terminal());
        assert!(AgreementStatus::Closed.is_terminal());
        assert!(!AgreementStatus::Execution.is_terminal());
        assert!(!AgreementStatus::Dispute.is_terminal());
    }
}
