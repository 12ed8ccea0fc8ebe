//! Allow-list of tokens accepted as payment currency
//!
//! Membership is a plain predicate. Removing a token does not touch
//! agreements already created against it.

use std::collections::BTreeSet;
use std::sync::Arc;

use pactline_types::{Address, AgreementError, AgreementEvent, Result};
use tracing::info;

use crate::access::AccessGate;

pub struct PaymentTokenRegistry {
    tokens: BTreeSet<Address>,
    gate: Arc<dyn AccessGate>,
}

impl PaymentTokenRegistry {
    pub fn new(gate: Arc<dyn AccessGate>) -> Self {
        Self {
            tokens: BTreeSet::new(),
            gate,
        }
    }

    /// Reload a persisted allow-list (not an administrative mutation)
    pub fn from_tokens(gate: Arc<dyn AccessGate>, tokens: impl IntoIterator<Item = Address>) -> Self {
        Self {
            tokens: tokens.into_iter().filter(|t| !t.is_zero()).collect(),
            gate,
        }
    }

    fn ensure_admin(&self, caller: &Address) -> Result<()> {
        if self.gate.is_admin(caller) {
            Ok(())
        } else {
            Err(AgreementError::NotAdministrator { caller: *caller })
        }
    }

    /// Allow every token in `tokens`, one event per token
    ///
    /// Re-adding an allowed token only re-emits its event. A zero address
    /// anywhere in the batch rejects the whole batch.
    pub fn add_payment_tokens(&mut self, caller: &Address, tokens: &[Address]) -> Result<Vec<AgreementEvent>> {
        self.ensure_admin(caller)?;
        if tokens.iter().any(Address::is_zero) {
            return Err(AgreementError::InvalidAddress);
        }

        let mut events = Vec::with_capacity(tokens.len());
        for token in tokens {
            self.tokens.insert(*token);
            info!(%token, "payment token added");
            events.push(AgreementEvent::PaymentTokenAdded { token: *token });
        }
        Ok(events)
    }

    /// Disallow `token`; returns an event only if it was allowed
    pub fn remove_payment_token(&mut self, caller: &Address, token: &Address) -> Result<Option<AgreementEvent>> {
        self.ensure_admin(caller)?;
        if self.tokens.remove(token) {
            info!(%token, "payment token removed");
            Ok(Some(AgreementEvent::PaymentTokenRemoved { token: *token }))
        } else {
            Ok(None)
        }
    }

    pub fn is_accepted(&self, token: &Address) -> bool {
        self.tokens.contains(token)
    }

    /// Allowed tokens in address order
    pub fn tokens(&self) -> Vec<Address> {
        self.tokens.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Debug for PaymentTokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentTokenRegistry")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::SingleOwnerGate;

    const ADMIN: Address = Address::new([0xad; 20]);
    const TOKEN_A: Address = Address::new([0x0a; 20]);
    const TOKEN_B: Address = Address::new([0x0b; 20]);

    fn registry() -> PaymentTokenRegistry {
        PaymentTokenRegistry::new(Arc::new(SingleOwnerGate::new(ADMIN).unwrap()))
    }

    #[test]
    fn admin_adds_tokens_with_one_event_each() {
        let mut reg = registry();
        let events = reg.add_payment_tokens(&ADMIN, &[TOKEN_A, TOKEN_B]).unwrap();
        assert_eq!(
            events,
            vec![
                AgreementEvent::PaymentTokenAdded { token: TOKEN_A },
                AgreementEvent::PaymentTokenAdded { token: TOKEN_B },
            ]
        );
        assert!(reg.is_accepted(&TOKEN_A));
        assert!(reg.is_accepted(&TOKEN_B));
    }

    #[test]
    fn re_adding_is_idempotent_but_re_emits() {
        let mut reg = registry();
        reg.add_payment_tokens(&ADMIN, &[TOKEN_A]).unwrap();
        let events = reg.add_payment_tokens(&ADMIN, &[TOKEN_A]).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn non_admin_cannot_mutate() {
        let mut reg = registry();
        let stranger = Address::new([0x55; 20]);
        assert_eq!(
            reg.add_payment_tokens(&stranger, &[TOKEN_A]).unwrap_err(),
            AgreementError::NotAdministrator { caller: stranger }
        );
        assert!(reg.is_empty());

        reg.add_payment_tokens(&ADMIN, &[TOKEN_A]).unwrap();
        assert!(reg.remove_payment_token(&stranger, &TOKEN_A).is_err());
        assert!(reg.is_accepted(&TOKEN_A));
    }

    #[test]
    fn zero_token_rejects_whole_batch() {
        let mut reg = registry();
        assert_eq!(
            reg.add_payment_tokens(&ADMIN, &[TOKEN_A, Address::ZERO]).unwrap_err(),
            AgreementError::InvalidAddress
        );
        assert!(!reg.is_accepted(&TOKEN_A));
    }

    #[test]
    fn remove_clears_membership() {
        let mut reg = registry();
        reg.add_payment_tokens(&ADMIN, &[TOKEN_A]).unwrap();
        let event = reg.remove_payment_token(&ADMIN, &TOKEN_A).unwrap();
        assert_eq!(event, Some(AgreementEvent::PaymentTokenRemoved { token: TOKEN_A }));
        assert!(!reg.is_accepted(&TOKEN_A));
        assert_eq!(reg.remove_payment_token(&ADMIN, &TOKEN_A).unwrap(), None);
    }
}
