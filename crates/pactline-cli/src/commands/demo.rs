//! Demo command - one agreement through its whole lifecycle, in memory

use std::sync::Arc;

use chrono::{Duration, Utc};
use colored::*;
use pactline_core::{AgreementManager, Clock, ManualClock, SingleOwnerGate};
use pactline_crypto::{terms_document_hash, PartyKey};
use pactline_ledger::{InMemoryTokenLedger, TokenLedger};
use pactline_types::{AgreementId, AgreementProposal, AgreementStatus, SignatureBytes};

use crate::display;
use crate::state::token_address;

const TERMS: &str = "Deliver a security review of the payments module within one week.";

pub fn run() -> anyhow::Result<()> {
    println!("{}", "Escrowed Agreement Lifecycle".bright_white().bold());
    println!();
    println!("  • service provider {} the terms hash", "signs".bright_green());
    println!("  • client {} and deposits in one step", "countersigns".bright_green());
    println!("  • payment is {} until fulfillment", "held in custody".bright_green());

    let admin = PartyKey::for_name("admin")?;
    let provider = PartyKey::for_name("provider")?;
    let client = PartyKey::for_name("client")?;
    let custody = PartyKey::for_name("custody")?.address();
    let token = token_address("USDC");

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let gate = Arc::new(SingleOwnerGate::new(admin.address())?);
    let mut ledger = InMemoryTokenLedger::new();
    ledger.register_token(token, "USDC")?;
    ledger.mint(&token, &client.address(), 10)?;

    let mut manager = AgreementManager::new(custody, gate, ledger)?.with_clock(clock.clone());

    display::section("Step 1: Allow-list the payment token");
    manager.add_payment_tokens(&admin.address(), &[token])?;
    display::success(&format!("USDC accepted ({})", token));

    display::section("Step 2: Service provider proposes");
    let hash = terms_document_hash(TERMS.as_bytes());
    let deadline = clock.now() + Duration::seconds(100);
    let proposal = AgreementProposal::new(client.address(), token, 1, deadline, "ipfs://terms-v1", hash);
    let id = manager.create_agreement(&provider.address(), proposal, provider.sign_terms(&hash)?)?;
    display::success(&format!("Agreement #{} created in {}", id, display::status(manager.get_agreement(id).status)));
    display::kv("terms hash", &hash.to_string());

    display::section("Step 3: Client approves custody and accepts");
    manager.ledger_mut().approve(&token, &client.address(), &custody, 1)?;
    let before = manager.ledger().balance_of(&token, &client.address());
    manager.accept_agreement(&client.address(), id, client.sign_terms(&hash)?)?;
    let after = manager.ledger().balance_of(&token, &client.address());
    display::success(&format!("Agreement #{} {}", id, display::status(manager.get_agreement(id).status)));
    display::kv("client balance", &format!("{} → {}", before, after));
    display::kv("custody balance", &manager.ledger().balance_of(&token, &custody).to_string());

    display::section("Step 4: Service provider starts work");
    let started = manager.execute_agreement(&provider.address(), id)?;
    display::success(&format!("execute returned {}", started));

    display::section("Step 5: Client confirms fulfillment");
    manager.complete_agreement(&client.address(), id)?;
    let record = manager.get_agreement(id);
    debug_assert_eq!(record.status, AgreementStatus::Fulfilled);
    display::success(&format!("Agreement #{} {}", id, display::status(record.status)));

    display::section("Rejections");
    match manager.accept_agreement(&client.address(), AgreementId::from(123), SignatureBytes::empty()) {
        Err(e) => display::info(&format!("accept #123: {}", e)),
        Ok(()) => display::warning("accept #123 unexpectedly succeeded"),
    }
    let forged = client.sign_terms(&terms_document_hash(b"different terms"))?;
    let stranger = PartyKey::for_name("mallory")?;
    let proposal = AgreementProposal::new(client.address(), token, 1, clock.now() + Duration::hours(1), "ipfs://x", hash);
    match manager.create_agreement(&stranger.address(), proposal, forged) {
        Err(e) => display::info(&format!("create with a foreign signature: {}", e)),
        Ok(id) => display::warning(&format!("forged proposal accepted as #{}", id)),
    }

    display::section("Event log");
    for (index, event) in manager.events().iter().enumerate() {
        display::event(index, event);
    }
    println!();
    Ok(())
}
