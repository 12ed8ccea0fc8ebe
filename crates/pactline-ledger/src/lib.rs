//! Pactline Ledger - Fungible token balances and allowances
//!
//! The agreement engine treats the token ledger as an external collaborator
//! with the usual fungible-token surface: balance and allowance queries,
//! `approve`, `transfer` and `transfer_from`. `InMemoryTokenLedger` is the
//! implementation used by the CLI and tests.
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. A mutating call either applies in full or leaves no trace
//! 3. Total supply only changes through `mint`

use std::collections::BTreeMap;

use pactline_types::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: u128, required: u128 },

    #[error("Insufficient allowance: have {available}, need {required}")]
    InsufficientAllowance { available: u128, required: u128 },

    #[error("Invalid address")]
    InvalidAddress,

    #[error("Balance overflow")]
    BalanceOverflow,

    #[error("Unknown token: {token}")]
    UnknownToken { token: Address },
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// The standard fungible-token surface the agreement engine relies on
pub trait TokenLedger {
    /// Balance of `holder` in `token`
    fn balance_of(&self, token: &Address, holder: &Address) -> u128;

    /// Amount `spender` may still move out of `owner`'s balance
    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> u128;

    /// Set `spender`'s allowance over `owner`'s balance
    fn approve(&mut self, token: &Address, owner: &Address, spender: &Address, amount: u128) -> Result<()>;

    /// Move `amount` from `from` to `to`
    fn transfer(&mut self, token: &Address, from: &Address, to: &Address, amount: u128) -> Result<()>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance
    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<()>;
}

/// Per-token book of balances and allowances
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBook {
    pub symbol: String,
    pub total_supply: u128,
    #[serde(default)]
    pub balances: BTreeMap<Address, u128>,
    /// owner -> spender -> remaining allowance
    #[serde(default)]
    pub allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
}

impl TokenBook {
    fn balance(&self, holder: &Address) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Check-then-apply balance move; nothing changes on error
    fn move_balance(&mut self, from: &Address, to: &Address, amount: u128) -> Result<()> {
        if from.is_zero() || to.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        let available = self.balance(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        if from != to {
            let credited = self
                .balance(to)
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOverflow)?;
            self.balances.insert(*from, available - amount);
            self.balances.insert(*to, credited);
        }
        Ok(())
    }
}

/// In-memory token ledger holding any number of tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryTokenLedger {
    tokens: BTreeMap<Address, TokenBook>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a token under `token` with a display symbol
    pub fn register_token(&mut self, token: Address, symbol: impl Into<String>) -> Result<()> {
        if token.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        let symbol = symbol.into();
        info!(%token, %symbol, "token registered");
        self.tokens.entry(token).or_default().symbol = symbol;
        Ok(())
    }

    /// Whether `token` has been deployed
    pub fn has_token(&self, token: &Address) -> bool {
        self.tokens.contains_key(token)
    }

    pub fn symbol(&self, token: &Address) -> Option<&str> {
        self.tokens.get(token).map(|b| b.symbol.as_str())
    }

    pub fn total_supply(&self, token: &Address) -> u128 {
        self.tokens.get(token).map(|b| b.total_supply).unwrap_or(0)
    }

    /// Deployed tokens with their books
    pub fn tokens(&self) -> impl Iterator<Item = (&Address, &TokenBook)> {
        self.tokens.iter()
    }

    /// Create new units of a deployed token
    pub fn mint(&mut self, token: &Address, to: &Address, amount: u128) -> Result<()> {
        if to.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        let book = self.book_mut(token)?;
        let supply = book
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        let balance = book
            .balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        book.total_supply = supply;
        book.balances.insert(*to, balance);
        info!(%token, %to, amount, "minted");
        Ok(())
    }

    fn book_mut(&mut self, token: &Address) -> Result<&mut TokenBook> {
        self.tokens
            .get_mut(token)
            .ok_or(LedgerError::UnknownToken { token: *token })
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn balance_of(&self, token: &Address, holder: &Address) -> u128 {
        self.tokens.get(token).map(|b| b.balance(holder)).unwrap_or(0)
    }

    fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> u128 {
        self.tokens
            .get(token)
            .map(|b| b.allowance(owner, spender))
            .unwrap_or(0)
    }

    fn approve(&mut self, token: &Address, owner: &Address, spender: &Address, amount: u128) -> Result<()> {
        if owner.is_zero() || spender.is_zero() {
            return Err(LedgerError::InvalidAddress);
        }
        let book = self.book_mut(token)?;
        book.allowances.entry(*owner).or_default().insert(*spender, amount);
        debug!(%token, %owner, %spender, amount, "approval set");
        Ok(())
    }

    fn transfer(&mut self, token: &Address, from: &Address, to: &Address, amount: u128) -> Result<()> {
        self.book_mut(token)?.move_balance(from, to, amount)?;
        info!(%token, %from, %to, amount, "transfer");
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: &Address,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<()> {
        let book = self.book_mut(token)?;

        let allowed = book.allowance(from, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                available: allowed,
                required: amount,
            });
        }

        book.move_balance(from, to, amount)?;

        // u128::MAX is an unlimited approval and is never drawn down
        if allowed != u128::MAX {
            book.allowances
                .entry(*from)
                .or_default()
                .insert(*spender, allowed - amount);
        }

        info!(%token, %spender, %from, %to, amount, "transfer_from");
        Ok(())
    }
}
