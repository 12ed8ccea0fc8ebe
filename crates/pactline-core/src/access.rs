//! Administrative access gating
//!
//! Token allow-list mutation is restricted to an administrator. The check
//! is a capability object handed to the registry, not a base type.

use pactline_types::{Address, AgreementError, Result};
use parking_lot::RwLock;
use tracing::info;

/// Answers "is this identity the administrator?"
pub trait AccessGate: Send + Sync {
    fn is_admin(&self, identity: &Address) -> bool;
}

/// A gate with exactly one administrator
#[derive(Debug)]
pub struct SingleOwnerGate {
    owner: RwLock<Address>,
}

impl SingleOwnerGate {
    pub fn new(owner: Address) -> Result<Self> {
        if owner.is_zero() {
            return Err(AgreementError::InvalidAddress);
        }
        Ok(Self {
            owner: RwLock::new(owner),
        })
    }

    pub fn owner(&self) -> Address {
        *self.owner.read()
    }

    /// Hand administration to `new_owner`; only the current owner may do this
    pub fn transfer_ownership(&self, caller: &Address, new_owner: Address) -> Result<()> {
        if new_owner.is_zero() {
            return Err(AgreementError::InvalidAddress);
        }
        let mut owner = self.owner.write();
        if *owner != *caller {
            return Err(AgreementError::NotAdministrator { caller: *caller });
        }
        info!(previous = %*owner, %new_owner, "ownership transferred");
        *owner = new_owner;
        Ok(())
    }
}

impl AccessGate for SingleOwnerGate {
    fn is_admin(&self, identity: &Address) -> bool {
        *self.owner.read() == *identity
    }
}
