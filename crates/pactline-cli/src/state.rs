//! Persisted CLI state
//!
//! One JSON document holds the manager snapshot, the token ledger, the
//! administrator and the manual clock. Every command opens it, runs one
//! operation against an [`AgreementManager`], and writes it back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use pactline_core::{AgreementManager, Clock, ManagerSnapshot, ManualClock, SingleOwnerGate};
use pactline_crypto::{keccak256, PartyKey};
use pactline_ledger::InMemoryTokenLedger;
use pactline_types::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub admin: Address,
    pub clock: DateTime<Utc>,
    pub manager: ManagerSnapshot,
    pub ledger: InMemoryTokenLedger,
}

/// An open state file with a live manager on top of it
pub struct Session {
    path: PathBuf,
    admin: Address,
    clock: Arc<ManualClock>,
    pub manager: AgreementManager<InMemoryTokenLedger>,
}

impl Session {
    /// Start a fresh state file; refuses to overwrite unless `force`
    pub fn init(path: &Path, admin: Address, custody: Address, force: bool) -> anyhow::Result<Self> {
        if path.exists() && !force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let gate = Arc::new(SingleOwnerGate::new(admin)?);
        let manager = AgreementManager::new(custody, gate, InMemoryTokenLedger::new())?
            .with_clock(clock.clone());

        info!(path = %path.display(), %admin, %custody, "state initialised");
        Ok(Self {
            path: path.to_path_buf(),
            admin,
            clock,
            manager,
        })
    }

    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {} (run `pactline init` first)", path.display()))?;
        let state: StateFile =
            serde_json::from_str(&raw).with_context(|| format!("malformed state file {}", path.display()))?;

        let clock = Arc::new(ManualClock::new(state.clock));
        let gate = Arc::new(SingleOwnerGate::new(state.admin)?);
        let manager = AgreementManager::restore(state.manager, gate, state.ledger)?.with_clock(clock.clone());

        debug!(path = %path.display(), "state opened");
        Ok(Self {
            path: path.to_path_buf(),
            admin: state.admin,
            clock,
            manager,
        })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let state = StateFile {
            admin: self.admin,
            clock: self.clock.now(),
            manager: self.manager.snapshot(),
            ledger: self.manager.ledger().clone(),
        };
        let json = serde_json::to_string_pretty(&state)?;

        // Write-then-rename; readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("cannot write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| format!("cannot replace {}", self.path.display()))?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Resolve a token given by symbol or address
    pub fn token(&self, symbol_or_address: &str) -> anyhow::Result<Address> {
        if symbol_or_address.starts_with("0x") {
            return Ok(symbol_or_address.parse()?);
        }
        self.manager
            .ledger()
            .tokens()
            .find(|(_, book)| book.symbol.eq_ignore_ascii_case(symbol_or_address))
            .map(|(address, _)| *address)
            .with_context(|| format!("unknown token {}", symbol_or_address))
    }

    /// Symbol for display, falling back to the address
    pub fn symbol(&self, token: &Address) -> String {
        self.manager
            .ledger()
            .symbol(token)
            .map(str::to_string)
            .unwrap_or_else(|| token.to_string())
    }
}

/// Resolve a party given by name or `0x` address
pub fn party(name_or_address: &str) -> anyhow::Result<Address> {
    if name_or_address.starts_with("0x") {
        Ok(name_or_address.parse()?)
    } else {
        Ok(PartyKey::for_name(name_or_address)?.address())
    }
}

/// Deterministic address for a token deployed under `symbol`
pub fn token_address(symbol: &str) -> Address {
    let digest = keccak256(format!("pactline token {}", symbol.to_ascii_uppercase()).as_bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[12..]);
    Address::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactline_ledger::TokenLedger;

    fn temp_state(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pactline-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn state_survives_a_round_trip_through_disk() {
        let path = temp_state("roundtrip");
        let admin = party("admin").unwrap();
        let custody = party("custody").unwrap();
        let holder = party("alice").unwrap();
        let token = token_address("usdc");

        let mut session = Session::init(&path, admin, custody, true).unwrap();
        session.manager.ledger_mut().register_token(token, "USDC").unwrap();
        session.manager.ledger_mut().mint(&token, &holder, 500).unwrap();
        session.manager.add_payment_tokens(&admin, &[token]).unwrap();
        session.save().unwrap();

        let reopened = Session::open(&path).unwrap();
        assert_eq!(reopened.admin(), admin);
        assert_eq!(reopened.manager.custody(), custody);
        assert!(reopened.manager.is_payment_token_accepted(&token));
        assert_eq!(reopened.manager.ledger().balance_of(&token, &holder), 500);
        assert_eq!(reopened.token("usdc").unwrap(), token);
        assert_eq!(reopened.clock().now(), session.clock().now());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn accepted_agreement_survives_reopening() {
        use chrono::Duration;
        use pactline_crypto::terms_document_hash;
        use pactline_types::{AgreementProposal, AgreementStatus};

        let path = temp_state("accepted");
        let admin = party("admin").unwrap();
        let custody = party("custody").unwrap();
        let provider = PartyKey::for_name("provider").unwrap();
        let client = PartyKey::for_name("client").unwrap();
        let token = token_address("usdc");
        let hash = terms_document_hash(b"audit the escrow flow");

        let mut session = Session::init(&path, admin, custody, true).unwrap();
        session.manager.ledger_mut().register_token(token, "USDC").unwrap();
        session.manager.ledger_mut().mint(&token, &client.address(), 500).unwrap();
        session.manager.add_payment_tokens(&admin, &[token]).unwrap();

        let deadline = session.clock().now() + Duration::hours(24);
        let proposal = AgreementProposal::new(client.address(), token, 200, deadline, "ipfs://terms", hash);
        let id = session
            .manager
            .create_agreement(&provider.address(), proposal, provider.sign_terms(&hash).unwrap())
            .unwrap();
        session.manager.ledger_mut().approve(&token, &client.address(), &custody, 200).unwrap();
        session
            .manager
            .accept_agreement(&client.address(), id, client.sign_terms(&hash).unwrap())
            .unwrap();
        session.save().unwrap();

        let reopened = Session::open(&path).unwrap();
        let record = reopened.manager.get_agreement(id);
        assert_eq!(record.status, AgreementStatus::Accepted);
        assert_eq!(record.payment_amount, 200);
        assert_eq!(record, session.manager.get_agreement(id));
        assert_eq!(reopened.manager.events(), session.manager.events());
        assert_eq!(reopened.manager.next_id(), session.manager.next_id());
        assert_eq!(reopened.manager.ledger().balance_of(&token, &custody), 200);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn init_refuses_to_clobber_without_force() {
        let path = temp_state("clobber");
        let admin = party("admin").unwrap();
        let custody = party("custody").unwrap();
        Session::init(&path, admin, custody, true).unwrap().save().unwrap();
        assert!(Session::init(&path, admin, custody, false).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn parties_resolve_by_name_or_hex() {
        let alice = party("alice").unwrap();
        assert_eq!(party(&alice.to_string()).unwrap(), alice);
        assert_ne!(party("bob").unwrap(), alice);
    }
}
