//! Append-only events emitted by committed operations

use crate::{Address, Agreement, AgreementId, DocumentHash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event observed by off-system consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum AgreementEvent {
    AgreementCreated {
        id: AgreementId,
        client: Address,
        service_provider: Address,
        payment_token: Address,
        #[serde(with = "amount_string")]
        payment_amount: u128,
        deadline: DateTime<Utc>,
        terms_cid: String,
        terms_document_hash: DocumentHash,
    },
    AgreementAccepted {
        id: AgreementId,
    },
    AgreementInExecution {
        id: AgreementId,
    },
    AgreementCompleted {
        id: AgreementId,
    },
    PaymentTokenAdded {
        token: Address,
    },
    PaymentTokenRemoved {
        token: Address,
    },
}

impl AgreementEvent {
    /// The creation event carrying the full set of terms
    pub fn created(agreement: &Agreement) -> Self {
        Self::AgreementCreated {
            id: agreement.id,
            client: agreement.client,
            service_provider: agreement.service_provider,
            payment_token: agreement.payment_token,
            payment_amount: agreement.payment_amount,
            deadline: agreement.deadline,
            terms_cid: agreement.terms_cid.clone(),
            terms_document_hash: agreement.terms_document_hash,
        }
    }

    /// The agreement this event refers to, if any
    pub fn agreement_id(&self) -> Option<AgreementId> {
        match self {
            Self::AgreementCreated { id, .. }
            | Self::AgreementAccepted { id }
            | Self::AgreementInExecution { id }
            | Self::AgreementCompleted { id } => Some(*id),
            Self::PaymentTokenAdded { .. } | Self::PaymentTokenRemoved { .. } => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AgreementCreated { .. } => "AgreementCreated",
            Self::AgreementAccepted { .. } => "AgreementAccepted",
            Self::AgreementInExecution { .. } => "AgreementInExecution",
            Self::AgreementCompleted { .. } => "AgreementCompleted",
            Self::PaymentTokenAdded { .. } => "PaymentTokenAdded",
            Self::PaymentTokenRemoved { .. } => "PaymentTokenRemoved",
        }
    }
}

/// Amounts travel as decimal strings; tagged enums cannot buffer a `u128`
mod amount_string {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_name() {
        let event = AgreementEvent::AgreementAccepted { id: AgreementId(1) };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "AgreementAccepted");
        assert_eq!(json["id"], 1);
        assert_eq!(event.name(), "AgreementAccepted");
    }

    #[test]
    fn created_event_carries_full_width_amounts() {
        let event = AgreementEvent::AgreementCreated {
            id: AgreementId(7),
            client: Address::new([1u8; 20]),
            service_provider: Address::new([2u8; 20]),
            payment_token: Address::new([3u8; 20]),
            payment_amount: u128::MAX,
            deadline: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            terms_cid: "ipfs://terms".to_string(),
            terms_document_hash: DocumentHash::new([4u8; 32]),
        };

        let json = serde_json::to_string(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "AgreementCreated");
        assert_eq!(value["payment_amount"], u128::MAX.to_string());

        let back: AgreementEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn malformed_amounts_are_rejected() {
        let json = r#"{"event":"AgreementCreated","id":1,"client":"0x0101010101010101010101010101010101010101","service_provider":"0x0202020202020202020202020202020202020202","payment_token":"0x0303030303030303030303030303030303030303","payment_amount":"-5","deadline":"2023-11-14T22:13:20Z","terms_cid":"x","terms_document_hash":"0x0404040404040404040404040404040404040404040404040404040404040404"}"#;
        assert!(serde_json::from_str::<AgreementEvent>(json).is_err());
    }

    #[test]
    fn token_events_have_no_agreement() {
        let event = AgreementEvent::PaymentTokenAdded { token: Address::new([5u8; 20]) };
        assert_eq!(event.agreement_id(), None);
        assert_eq!(
            AgreementEvent::AgreementCompleted { id: AgreementId(3) }.agreement_id(),
            Some(AgreementId(3))
        );
    }
}
