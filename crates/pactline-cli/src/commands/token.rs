//! Token commands - deploy, allow-list, fund and approve payment tokens

use anyhow::bail;
use colored::*;
use pactline_crypto::PartyKey;
use pactline_ledger::TokenLedger;
use pactline_types::Address;

use crate::display;
use crate::state::{party, token_address, Session};

/// Deploy any missing tokens and add them to the allow-list
pub fn add(session: &mut Session, actor: &PartyKey, symbols: &[String]) -> anyhow::Result<()> {
    let mut tokens = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let token = match session.token(symbol) {
            Ok(existing) => existing,
            Err(_) if symbol.starts_with("0x") => bail!("unknown token {}", symbol),
            Err(_) => token_address(symbol),
        };
        tokens.push((token, symbol.to_ascii_uppercase()));
    }

    let addresses: Vec<Address> = tokens.iter().map(|(t, _)| *t).collect();
    session.manager.add_payment_tokens(&actor.address(), &addresses)?;

    for (token, symbol) in tokens {
        if !session.manager.ledger().has_token(&token) {
            session.manager.ledger_mut().register_token(token, symbol.clone())?;
        }
        display::success(&format!("{} accepted for payment", symbol.bright_cyan()));
        display::kv("address", &token.to_string());
    }
    Ok(())
}

pub fn remove(session: &mut Session, actor: &PartyKey, symbol: &str) -> anyhow::Result<()> {
    let token = session.token(symbol)?;
    if !session.manager.is_payment_token_accepted(&token) {
        display::warning(&format!("{} is not on the allow-list", symbol));
    }
    session.manager.remove_payment_token(&actor.address(), &token)?;
    display::success(&format!("{} no longer accepted; existing agreements are unaffected", symbol));
    Ok(())
}

pub fn list(session: &Session) -> anyhow::Result<()> {
    println!("{}", "Payment Tokens".bright_white().bold());
    println!("{}", "─".repeat(72));
    for (token, book) in session.manager.ledger().tokens() {
        let marker = if session.manager.is_payment_token_accepted(token) {
            "accepted".bright_green()
        } else {
            "not accepted".bright_black()
        };
        println!(
            "  {:<8} {}  supply {:<12} {}",
            book.symbol.bright_cyan(),
            token,
            book.total_supply,
            marker
        );
    }
    Ok(())
}

/// Mint new units; administrator only
pub fn mint(session: &mut Session, actor: &PartyKey, symbol: &str, to: &str, amount: u128) -> anyhow::Result<()> {
    if actor.address() != session.admin() {
        bail!("only the administrator may mint");
    }
    let token = session.token(symbol)?;
    let holder = party(to)?;
    session.manager.ledger_mut().mint(&token, &holder, amount)?;
    display::success(&format!("Minted {} {} to {}", amount, session.symbol(&token), to));
    Ok(())
}

/// Let custody draw `amount` from the acting identity
pub fn approve(session: &mut Session, actor: &PartyKey, symbol: &str, amount: u128) -> anyhow::Result<()> {
    let token = session.token(symbol)?;
    let custody = session.manager.custody();
    session
        .manager
        .ledger_mut()
        .approve(&token, &actor.address(), &custody, amount)?;
    display::success(&format!("Custody may draw {} {}", amount, session.symbol(&token)));
    Ok(())
}

pub fn balance(session: &Session, actor: &PartyKey, symbol: &str, who: Option<&str>) -> anyhow::Result<()> {
    let token = session.token(symbol)?;
    let holder = match who {
        Some(name) => party(name)?,
        None => actor.address(),
    };
    let ledger = session.manager.ledger();
    let symbol = session.symbol(&token);

    display::labeled("Holder", &holder.to_string());
    display::kv("balance", &format!("{} {}", ledger.balance_of(&token, &holder), symbol));
    display::kv(
        "custody allowance",
        &format!("{} {}", ledger.allowance(&token, &holder, &session.manager.custody()), symbol),
    );
    Ok(())
}
