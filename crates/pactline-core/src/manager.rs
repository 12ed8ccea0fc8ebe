//! Pactline Agreement Manager - signed proposals and escrowed acceptance
//!
//! The AgreementManager owns every agreement record and drives it through
//! its lifecycle:
//!
//! ```text
//! create  (service provider signs)        → Draft
//! accept  (client countersigns + funds)   → Accepted
//! execute (service provider)              → Execution
//! complete (either party)                 → Fulfilled
//! ```
//!
//! # Atomicity
//!
//! Each public operation is one unit: every precondition is checked before
//! anything is written, and the only step that can fail after a write is
//! the custody transfer during acceptance. The record is advanced *before*
//! the ledger is called, and restored if the ledger refuses. Events are
//! appended only once an operation has committed.

use std::collections::BTreeMap;
use std::sync::Arc;

use pactline_crypto::SignatureVerifier;
use pactline_ledger::{LedgerError, TokenLedger};
use pactline_types::{
    Address, Agreement, AgreementError, AgreementEvent, AgreementId, AgreementProposal,
    AgreementStatus, Result, SignatureBytes,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::access::AccessGate;
use crate::clock::{Clock, SystemClock};
use crate::registry::PaymentTokenRegistry;

/// Persisted manager state: records, counter, allow-list and event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerSnapshot {
    pub custody: Address,
    pub next_id: AgreementId,
    pub agreements: Vec<Agreement>,
    pub payment_tokens: Vec<Address>,
    #[serde(default)]
    pub events: Vec<AgreementEvent>,
}

/// The AgreementManager enforces the agreement lifecycle
pub struct AgreementManager<L: TokenLedger> {
    agreements: BTreeMap<AgreementId, Agreement>,
    next_id: AgreementId,
    registry: PaymentTokenRegistry,
    ledger: L,
    clock: Arc<dyn Clock>,
    /// Account holding escrowed payments
    custody: Address,
    events: Vec<AgreementEvent>,
}

fn reject<T>(operation: &'static str, err: AgreementError) -> Result<T> {
    debug!(operation, error = err.code(), "rejected: {}", err);
    Err(err)
}

impl<L: TokenLedger> AgreementManager<L> {
    /// Create an empty manager holding escrow under `custody`
    pub fn new(custody: Address, gate: Arc<dyn AccessGate>, ledger: L) -> Result<Self> {
        if custody.is_zero() {
            return Err(AgreementError::InvalidAddress);
        }
        Ok(Self {
            agreements: BTreeMap::new(),
            next_id: AgreementId::FIRST,
            registry: PaymentTokenRegistry::new(gate),
            ledger,
            clock: Arc::new(SystemClock),
            custody,
            events: Vec::new(),
        })
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Rebuild a manager from persisted state
    ///
    /// The counter never restarts below an id that is already in use.
    pub fn restore(snapshot: ManagerSnapshot, gate: Arc<dyn AccessGate>, ledger: L) -> Result<Self> {
        if snapshot.custody.is_zero() {
            return Err(AgreementError::InvalidAddress);
        }

        let mut agreements = BTreeMap::new();
        for agreement in snapshot.agreements {
            if !agreement.exists() {
                warn!("skipping zero-id record in snapshot");
                continue;
            }
            agreements.insert(agreement.id, agreement);
        }

        let floor = match agreements.keys().next_back() {
            Some(last) => last.checked_next().ok_or(AgreementError::AgreementIdsExhausted)?,
            None => AgreementId::FIRST,
        };
        let next_id = snapshot.next_id.max(floor);

        info!(
            agreements = agreements.len(),
            next_id = %next_id,
            tokens = snapshot.payment_tokens.len(),
            "manager restored"
        );

        Ok(Self {
            agreements,
            next_id,
            registry: PaymentTokenRegistry::from_tokens(gate, snapshot.payment_tokens),
            ledger,
            clock: Arc::new(SystemClock),
            custody: snapshot.custody,
            events: snapshot.events,
        })
    }

    /// Capture the persisted state
    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            custody: self.custody,
            next_id: self.next_id,
            agreements: self.agreements.values().cloned().collect(),
            payment_tokens: self.registry.tokens(),
            events: self.events.clone(),
        }
    }

    // ========================================================================
    // Agreement lifecycle
    // ========================================================================

    /// Register a signed proposal as a new Draft agreement
    ///
    /// The caller becomes the service provider regardless of what the
    /// proposal claims.
    pub fn create_agreement(
        &mut self,
        caller: &Address,
        proposal: AgreementProposal,
        signature: SignatureBytes,
    ) -> Result<AgreementId> {
        const OP: &str = "create_agreement";
        let now = self.clock.now();

        if proposal.deadline <= now {
            return reject(OP, AgreementError::DeadlineMustBeInFuture);
        }
        if !self.registry.is_accepted(&proposal.payment_token) {
            return reject(
                OP,
                AgreementError::PaymentTokenNotAccepted {
                    token: proposal.payment_token,
                },
            );
        }
        if proposal.payment_amount == 0 {
            return reject(OP, AgreementError::PaymentAmountCannotBeZero);
        }
        if &proposal.client == caller {
            return reject(OP, AgreementError::ClientCannotBeServiceProvider);
        }
        if proposal.client.is_zero() {
            return reject(OP, AgreementError::InvalidAddress);
        }
        if let Err(e) = SignatureVerifier::verify(&proposal.terms_document_hash, &signature, caller) {
            return reject(OP, e.into());
        }

        let id = self.next_id;
        let Some(next_id) = id.checked_next() else {
            return reject(OP, AgreementError::AgreementIdsExhausted);
        };
        self.next_id = next_id;

        let agreement = Agreement::draft(id, *caller, proposal, signature, now);
        let event = AgreementEvent::created(&agreement);
        info!(
            id = %id,
            client = %agreement.client,
            service_provider = %agreement.service_provider,
            token = %agreement.payment_token,
            amount = agreement.payment_amount,
            "agreement created"
        );
        self.agreements.insert(id, agreement);
        self.events.push(event);

        Ok(id)
    }

    /// Countersign a Draft agreement and move its payment into custody
    pub fn accept_agreement(&mut self, caller: &Address, id: AgreementId, signature: SignatureBytes) -> Result<()> {
        const OP: &str = "accept_agreement";

        let current = match self.find(id) {
            Some(a) => a,
            None => return reject(OP, AgreementError::AgreementNotFound { id }),
        };
        if current.status != AgreementStatus::Draft {
            let status = current.status;
            return reject(OP, AgreementError::AgreementNotInDraft { id, status });
        }
        if &current.client != caller {
            return reject(OP, AgreementError::SenderShouldBeParty { id, sender: *caller });
        }
        if let Err(e) = SignatureVerifier::verify(&current.terms_document_hash, &signature, caller) {
            return reject(OP, e.into());
        }

        let token = current.payment_token;
        let amount = current.payment_amount;

        let available = self.ledger.balance_of(&token, caller);
        if available < amount {
            return reject(
                OP,
                AgreementError::InsufficientBalance {
                    available,
                    required: amount,
                },
            );
        }
        let allowed = self.ledger.allowance(&token, caller, &self.custody);
        if allowed < amount {
            return reject(
                OP,
                AgreementError::InsufficientAllowance {
                    available: allowed,
                    required: amount,
                },
            );
        }

        // Advance the record before control leaves for the ledger
        let mut accepted = current.clone();
        accepted.client_sig = signature;
        accepted.status = AgreementStatus::Accepted;
        let previous = self.agreements.insert(id, accepted);

        let custody = self.custody;
        if let Err(e) = self.ledger.transfer_from(&token, &custody, caller, &custody, amount) {
            if let Some(previous) = previous {
                self.agreements.insert(id, previous);
            }
            warn!(id = %id, error = %e, "escrow transfer refused, acceptance rolled back");
            return Err(escrow_error(e));
        }

        info!(id = %id, client = %caller, token = %token, amount, "agreement accepted, payment escrowed");
        self.events.push(AgreementEvent::AgreementAccepted { id });
        Ok(())
    }

    /// Service provider starts work on an Accepted agreement
    pub fn execute_agreement(&mut self, caller: &Address, id: AgreementId) -> Result<bool> {
        const OP: &str = "execute_agreement";

        let current = match self.find(id) {
            Some(a) => a,
            None => return reject(OP, AgreementError::AgreementNotFound { id }),
        };
        if current.status != AgreementStatus::Accepted {
            let status = current.status;
            return reject(OP, AgreementError::AgreementNotAccepted { id, status });
        }
        if &current.service_provider != caller {
            return reject(OP, AgreementError::SenderShouldBeParty { id, sender: *caller });
        }

        self.set_status(id, AgreementStatus::Execution);
        info!(id = %id, "agreement in execution");
        self.events.push(AgreementEvent::AgreementInExecution { id });
        Ok(true)
    }

    /// Either party marks an agreement in Execution as fulfilled
    ///
    /// Escrowed funds stay in custody; no payout happens here.
    pub fn complete_agreement(&mut self, caller: &Address, id: AgreementId) -> Result<()> {
        const OP: &str = "complete_agreement";

        let current = match self.find(id) {
            Some(a) => a,
            None => return reject(OP, AgreementError::AgreementNotFound { id }),
        };
        if current.status != AgreementStatus::Execution {
            let status = current.status;
            return reject(OP, AgreementError::AgreementNotInExecution { id, status });
        }
        if !current.is_party(caller) {
            return reject(OP, AgreementError::SenderShouldBeParty { id, sender: *caller });
        }

        self.set_status(id, AgreementStatus::Fulfilled);
        info!(id = %id, by = %caller, "agreement fulfilled");
        self.events.push(AgreementEvent::AgreementCompleted { id });
        Ok(())
    }

    // ========================================================================
    // Payment token allow-list
    // ========================================================================

    pub fn add_payment_tokens(&mut self, caller: &Address, tokens: &[Address]) -> Result<()> {
        match self.registry.add_payment_tokens(caller, tokens) {
            Ok(events) => {
                self.events.extend(events);
                Ok(())
            }
            Err(e) => reject("add_payment_tokens", e),
        }
    }

    pub fn remove_payment_token(&mut self, caller: &Address, token: &Address) -> Result<()> {
        match self.registry.remove_payment_token(caller, token) {
            Ok(event) => {
                self.events.extend(event);
                Ok(())
            }
            Err(e) => reject("remove_payment_token", e),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The record for `id`, or the zero-valued record if there is none
    pub fn get_agreement(&self, id: AgreementId) -> Agreement {
        self.find(id).cloned().unwrap_or_default()
    }

    /// Agreements where `party` is client or service provider
    pub fn agreements_for(&self, party: &Address) -> Vec<&Agreement> {
        self.agreements.values().filter(|a| a.is_party(party)).collect()
    }

    pub fn agreements(&self) -> impl Iterator<Item = &Agreement> {
        self.agreements.values()
    }

    /// The id the next successful creation will receive
    pub fn next_id(&self) -> AgreementId {
        self.next_id
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn is_payment_token_accepted(&self, token: &Address) -> bool {
        self.registry.is_accepted(token)
    }

    pub fn registry(&self) -> &PaymentTokenRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access for holders acting outside the engine (approvals, minting)
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// Every event committed so far, oldest first
    pub fn events(&self) -> &[AgreementEvent] {
        &self.events
    }

    /// Take the committed events, leaving the log empty
    pub fn drain_events(&mut self) -> Vec<AgreementEvent> {
        std::mem::take(&mut self.events)
    }

    /// Release the ledger (e.g. to persist it)
    pub fn into_ledger(self) -> L {
        self.ledger
    }

    fn find(&self, id: AgreementId) -> Option<&Agreement> {
        self.agreements.get(&id).filter(|a| a.exists())
    }

    fn set_status(&mut self, id: AgreementId, status: AgreementStatus) {
        if let Some(agreement) = self.agreements.get_mut(&id) {
            agreement.status = status;
        }
    }
}

fn escrow_error(err: LedgerError) -> AgreementError {
    match err {
        LedgerError::InsufficientBalance { available, required } => {
            AgreementError::InsufficientBalance { available, required }
        }
        LedgerError::InsufficientAllowance { available, required } => {
            AgreementError::InsufficientAllowance { available, required }
        }
        other => AgreementError::EscrowTransferFailed {
            reason: other.to_string(),
        },
    }
}

impl<L: TokenLedger + std::fmt::Debug> std::fmt::Debug for AgreementManager<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgreementManager")
            .field("custody", &self.custody)
            .field("next_id", &self.next_id)
            .field("agreements", &self.agreements.len())
            .field("registry", &self.registry)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::SingleOwnerGate;
    use crate::clock::ManualClock;
    use chrono::{Duration, Utc};
    use pactline_crypto::{terms_document_hash, PartyKey};
    use pactline_ledger::InMemoryTokenLedger;
    use pactline_types::DocumentHash;

    const ADMIN: Address = Address::new([0xad; 20]);
    const CUSTODY: Address = Address::new([0xcc; 20]);
    const TOKEN: Address = Address::new([0x70; 20]);

    struct Fixture {
        manager: AgreementManager<InMemoryTokenLedger>,
        clock: Arc<ManualClock>,
        provider: PartyKey,
        client: PartyKey,
        terms: DocumentHash,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gate = Arc::new(SingleOwnerGate::new(ADMIN).unwrap());
        let mut ledger = InMemoryTokenLedger::new();
        ledger.register_token(TOKEN, "TST").unwrap();

        let mut manager = AgreementManager::new(CUSTODY, gate, ledger)
            .unwrap()
            .with_clock(clock.clone());
        manager.add_payment_tokens(&ADMIN, &[TOKEN]).unwrap();

        let provider = PartyKey::for_name("provider").unwrap();
        let client = PartyKey::for_name("client").unwrap();
        manager.ledger_mut().mint(&TOKEN, &client.address(), 1_000).unwrap();

        Fixture {
            manager,
            clock,
            provider,
            client,
            terms: terms_document_hash(b"build the thing"),
        }
    }

    impl Fixture {
        fn proposal(&self, amount: u128) -> AgreementProposal {
            AgreementProposal::new(
                self.client.address(),
                TOKEN,
                amount,
                self.clock.now() + Duration::seconds(100),
                "bafkreiterms",
                self.terms,
            )
        }

        fn create(&mut self, amount: u128) -> AgreementId {
            let proposal = self.proposal(amount);
            let sig = self.provider.sign_terms(&self.terms).unwrap();
            let provider = self.provider.address();
            self.manager.create_agreement(&provider, proposal, sig).unwrap()
        }

        fn approve(&mut self, amount: u128) {
            let client = self.client.address();
            self.manager
                .ledger_mut()
                .approve(&TOKEN, &client, &CUSTODY, amount)
                .unwrap();
        }

        fn accept(&mut self, id: AgreementId) -> Result<()> {
            let sig = self.client.sign_terms(&self.terms).unwrap();
            let client = self.client.address();
            self.manager.accept_agreement(&client, id, sig)
        }
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let mut f = fixture();
        assert_eq!(f.manager.next_id(), AgreementId(1));
        assert_eq!(f.create(10), AgreementId(1));
        assert_eq!(f.create(10), AgreementId(2));
        assert_eq!(f.manager.next_id(), AgreementId(3));
    }

    #[test]
    fn create_rejects_deadline_at_now() {
        let mut f = fixture();
        let mut proposal = f.proposal(10);
        proposal.deadline = f.clock.now();
        let sig = f.provider.sign_terms(&f.terms).unwrap();
        let err = f
            .manager
            .create_agreement(&f.provider.address(), proposal, sig)
            .unwrap_err();
        assert_eq!(err, AgreementError::DeadlineMustBeInFuture);
        assert_eq!(f.manager.next_id(), AgreementId(1));
    }

    #[test]
    fn create_checks_deadline_before_token() {
        let mut f = fixture();
        let mut proposal = f.proposal(0);
        proposal.deadline = f.clock.now() - Duration::seconds(1);
        proposal.payment_token = Address::new([0x99; 20]);
        let sig = f.provider.sign_terms(&f.terms).unwrap();
        let err = f
            .manager
            .create_agreement(&f.provider.address(), proposal, sig)
            .unwrap_err();
        assert_eq!(err, AgreementError::DeadlineMustBeInFuture);
    }

    #[test]
    fn create_checks_self_dealing_before_zero_client() {
        let mut f = fixture();
        let mut proposal = f.proposal(10);
        proposal.client = f.provider.address();
        let sig = f.provider.sign_terms(&f.terms).unwrap();
        let err = f
            .manager
            .create_agreement(&f.provider.address(), proposal, sig)
            .unwrap_err();
        assert_eq!(err, AgreementError::ClientCannotBeServiceProvider);
    }

    #[test]
    fn accept_moves_payment_into_custody() {
        let mut f = fixture();
        let id = f.create(10);
        f.approve(10);
        f.accept(id).unwrap();

        let record = f.manager.get_agreement(id);
        assert_eq!(record.status, AgreementStatus::Accepted);
        assert_eq!(record.client_sig.len(), 65);
        assert_eq!(f.manager.ledger().balance_of(&TOKEN, &f.client.address()), 990);
        assert_eq!(f.manager.ledger().balance_of(&TOKEN, &CUSTODY), 10);
        assert_eq!(f.manager.ledger().allowance(&TOKEN, &f.client.address(), &CUSTODY), 0);
    }

    #[test]
    fn events_only_for_committed_operations() {
        let mut f = fixture();
        let before = f.manager.events().len();
        let id = f.create(10);
        assert!(f.accept(id).is_err()); // no allowance
        let names: Vec<_> = f.manager.events()[before..].iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["AgreementCreated"]);
    }

    #[test]
    fn snapshot_restores_counter_and_records() {
        let mut f = fixture();
        let id = f.create(10);
        let snapshot = f.manager.snapshot();

        let json = serde_json::to_string(&snapshot).unwrap();
        let snapshot: ManagerSnapshot = serde_json::from_str(&json).unwrap();

        let gate = Arc::new(SingleOwnerGate::new(ADMIN).unwrap());
        let restored = AgreementManager::restore(snapshot, gate, InMemoryTokenLedger::new()).unwrap();
        assert_eq!(restored.next_id(), AgreementId(2));
        assert_eq!(restored.get_agreement(id), f.manager.get_agreement(id));
        assert!(restored.is_payment_token_accepted(&TOKEN));
    }

    #[test]
    fn restore_never_rewinds_counter() {
        let mut f = fixture();
        f.create(10);
        f.create(10);
        let mut snapshot = f.manager.snapshot();
        snapshot.next_id = AgreementId(1);

        let gate = Arc::new(SingleOwnerGate::new(ADMIN).unwrap());
        let restored = AgreementManager::restore(snapshot, gate, InMemoryTokenLedger::new()).unwrap();
        assert_eq!(restored.next_id(), AgreementId(3));
    }

    #[test]
    fn create_stops_when_ids_run_out() {
        let mut f = fixture();
        let mut snapshot = f.manager.snapshot();
        snapshot.next_id = AgreementId(u64::MAX);
        let gate = Arc::new(SingleOwnerGate::new(ADMIN).unwrap());
        f.manager = AgreementManager::restore(snapshot, gate, InMemoryTokenLedger::new())
            .unwrap()
            .with_clock(f.clock.clone());
        let events = f.manager.events().len();

        let proposal = f.proposal(10);
        let sig = f.provider.sign_terms(&f.terms).unwrap();
        let err = f
            .manager
            .create_agreement(&f.provider.address(), proposal, sig)
            .unwrap_err();
        assert_eq!(err, AgreementError::AgreementIdsExhausted);
        assert_eq!(f.manager.next_id(), AgreementId(u64::MAX));
        assert!(!f.manager.get_agreement(AgreementId(u64::MAX)).exists());
        assert!(!f.manager.get_agreement(AgreementId::NONE).exists());
        assert_eq!(f.manager.events().len(), events);
    }

    #[test]
    fn restore_rejects_record_at_last_id() {
        let mut f = fixture();
        let id = f.create(10);
        let mut snapshot = f.manager.snapshot();
        let mut record = f.manager.get_agreement(id);
        record.id = AgreementId(u64::MAX);
        snapshot.agreements.push(record);

        let gate = Arc::new(SingleOwnerGate::new(ADMIN).unwrap());
        let err = AgreementManager::restore(snapshot, gate, InMemoryTokenLedger::new()).unwrap_err();
        assert_eq!(err, AgreementError::AgreementIdsExhausted);
    }

    #[test]
    fn zero_custody_is_rejected() {
        let gate = Arc::new(SingleOwnerGate::new(ADMIN).unwrap());
        assert!(AgreementManager::new(Address::ZERO, gate, InMemoryTokenLedger::new()).is_err());
    }
}
