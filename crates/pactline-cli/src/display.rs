//! Display utilities for the CLI

use colored::*;
use pactline_types::{Agreement, AgreementEvent, AgreementStatus};

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", "━".repeat(60).bright_black());
    println!(" {}", title.bright_white().bold());
    println!("{}", "━".repeat(60).bright_black());
}

/// Print a success message
pub fn success(message: &str) {
    println!("  {} {}", "✓".bright_green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("  {} {}", "✗".bright_red(), message.bright_red());
}

/// Print an info message
pub fn info(message: &str) {
    println!("  {} {}", "→".bright_blue(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("  {} {}", "⚠".yellow(), message.yellow());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("      {}: {}", key, value.bright_cyan());
}

/// Print a labeled value
pub fn labeled(label: &str, value: &str) {
    println!("  {}: {}", label.bright_white(), value.bright_cyan());
}

pub fn status(status: AgreementStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        AgreementStatus::Draft => text.bright_yellow(),
        AgreementStatus::Accepted => text.bright_blue(),
        AgreementStatus::Execution => text.bright_magenta(),
        AgreementStatus::Fulfilled => text.bright_green(),
        AgreementStatus::Dispute => text.bright_red(),
        AgreementStatus::Closed => text.bright_black(),
    }
}

/// Print an agreement record; `symbol` renders the payment token
pub fn agreement(record: &Agreement, symbol: &str) {
    labeled("Agreement", &format!("#{}", record.id));
    println!("      status: {}", status(record.status));
    kv("service provider", &record.service_provider.to_string());
    kv("client", &record.client.to_string());
    kv("payment", &format!("{} {}", record.payment_amount, symbol));
    kv("deadline", &record.deadline.to_rfc3339());
    kv("created", &record.creation_timestamp.to_rfc3339());
    kv("terms", &record.terms_cid);
    kv("terms hash", &record.terms_document_hash.to_string());
    kv("provider sig", &record.service_provider_sig.to_hex());
    if !record.client_sig.is_empty() {
        kv("client sig", &record.client_sig.to_hex());
    }
}

/// One-line rendering of an event
pub fn event(index: usize, event: &AgreementEvent) {
    let detail = match event {
        AgreementEvent::AgreementCreated {
            id,
            client,
            service_provider,
            payment_amount,
            ..
        } => format!("#{} {} → {} ({})", id, service_provider, client, payment_amount),
        AgreementEvent::AgreementAccepted { id }
        | AgreementEvent::AgreementInExecution { id }
        | AgreementEvent::AgreementCompleted { id } => format!("#{}", id),
        AgreementEvent::PaymentTokenAdded { token } | AgreementEvent::PaymentTokenRemoved { token } => {
            token.to_string()
        }
    };
    println!(
        "  {:>4}  {:<22} {}",
        index.to_string().bright_black(),
        event.name().bright_white(),
        detail
    );
}
