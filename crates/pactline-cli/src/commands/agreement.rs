//! Agreement commands - propose, countersign and advance agreements

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use colored::*;
use pactline_core::Clock;
use pactline_crypto::PartyKey;
use pactline_types::{AgreementId, AgreementProposal, SignatureBytes};

use super::TermsSource;
use crate::display;
use crate::state::{party, Session};

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Client (name or 0x address) who will fund the agreement
    #[arg(long)]
    pub client: String,

    /// Payment token (symbol or 0x address)
    #[arg(long)]
    pub token: String,

    /// Payment amount in token base units
    #[arg(long)]
    pub amount: u128,

    /// Hours from now until the deadline
    #[arg(long, default_value = "168", allow_negative_numbers = true)]
    pub deadline_hours: i64,

    /// Content identifier of the terms document
    #[arg(long)]
    pub terms_cid: String,

    #[command(flatten)]
    pub terms: TermsSource,

    /// Externally produced signature; signs with the acting identity if omitted
    #[arg(long, value_name = "HEX")]
    pub signature: Option<SignatureBytes>,
}

/// Propose an agreement as the acting identity
pub fn create(session: &mut Session, actor: &PartyKey, args: CreateArgs) -> anyhow::Result<AgreementId> {
    let client = party(&args.client)?;
    let token = session.token(&args.token)?;
    let hash = args.terms.resolve()?;
    let deadline = deadline_after(session.clock().now(), args.deadline_hours)?;

    let signature = match args.signature {
        Some(sig) => sig,
        None => actor.sign_terms(&hash)?,
    };

    let proposal = AgreementProposal::new(client, token, args.amount, deadline, args.terms_cid, hash);
    let id = session.manager.create_agreement(&actor.address(), proposal, signature)?;

    display::success(&format!("Agreement #{} proposed", id.to_string().bright_cyan()));
    display::kv("terms hash", &hash.to_string());
    display::kv("deadline", &deadline.to_rfc3339());
    display::info(&format!("Client accepts with: pactline --as {} accept {}", args.client, id));
    Ok(id)
}

fn deadline_after(now: DateTime<Utc>, hours: i64) -> anyhow::Result<DateTime<Utc>> {
    Duration::try_hours(hours)
        .and_then(|offset| now.checked_add_signed(offset))
        .with_context(|| format!("deadline {} hours from now is out of range", hours))
}

/// Countersign a Draft agreement and escrow its payment
pub fn accept(session: &mut Session, actor: &PartyKey, id: u64, signature: Option<SignatureBytes>) -> anyhow::Result<()> {
    let id = AgreementId::from(id);
    let record = session.manager.get_agreement(id);

    let signature = match signature {
        Some(sig) => sig,
        None => actor.sign_terms(&record.terms_document_hash)?,
    };
    session.manager.accept_agreement(&actor.address(), id, signature)?;

    let symbol = session.symbol(&record.payment_token);
    display::success(&format!("Agreement #{} accepted", id));
    display::kv("escrowed", &format!("{} {}", record.payment_amount, symbol));
    display::kv("custody", &session.manager.custody().to_string());
    Ok(())
}

pub fn execute(session: &mut Session, actor: &PartyKey, id: u64) -> anyhow::Result<()> {
    let id = AgreementId::from(id);
    session.manager.execute_agreement(&actor.address(), id)?;
    display::success(&format!("Agreement #{} in execution", id));
    Ok(())
}

pub fn complete(session: &mut Session, actor: &PartyKey, id: u64) -> anyhow::Result<()> {
    let id = AgreementId::from(id);
    session.manager.complete_agreement(&actor.address(), id)?;
    display::success(&format!("Agreement #{} fulfilled", id));
    display::info("Escrowed payment remains in custody");
    Ok(())
}

/// Show one record; an unknown id prints the zero-valued record
pub fn show(session: &Session, id: u64, json: bool) -> anyhow::Result<()> {
    let record = session.manager.get_agreement(AgreementId::from(id));
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    if !record.exists() {
        display::warning(&format!("No agreement #{}", id));
        return Ok(());
    }
    display::agreement(&record, &session.symbol(&record.payment_token));
    Ok(())
}

pub fn list(session: &Session, party_filter: Option<&str>, json: bool) -> anyhow::Result<()> {
    let records = match party_filter {
        Some(who) => session.manager.agreements_for(&party(who)?),
        None => session.manager.agreements().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("{}", "Agreements".bright_white().bold());
    println!("{}", "─".repeat(72));
    if records.is_empty() {
        println!("  {}", "(none)".bright_black());
    }
    for record in records {
        println!(
            "  #{:<4} {:<10} {} → {}  {} {}",
            record.id,
            display::status(record.status),
            record.service_provider,
            record.client,
            record.payment_amount,
            session.symbol(&record.payment_token)
        );
    }
    println!();
    display::labeled("Next id", &session.manager.next_id().to_string());
    Ok(())
}

pub fn events(session: &Session, id: Option<u64>, json: bool) -> anyhow::Result<()> {
    let filter = id.map(AgreementId::from);
    let events: Vec<_> = session
        .manager
        .events()
        .iter()
        .enumerate()
        .filter(|(_, e)| filter.is_none() || e.agreement_id() == filter)
        .collect();

    if json {
        let list: Vec<_> = events.iter().map(|(_, e)| *e).collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    println!("{}", "Events".bright_white().bold());
    println!("{}", "─".repeat(72));
    for (index, event) in events {
        display::event(index, event);
    }
    Ok(())
}
