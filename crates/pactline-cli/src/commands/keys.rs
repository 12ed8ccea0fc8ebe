//! Key commands - identities, signing and signer recovery

use pactline_crypto::{PartyKey, SignatureVerifier};
use pactline_types::{DocumentHash, SignatureBytes};

use super::TermsSource;
use crate::display;

pub fn whoami(name: &str, actor: &PartyKey, reveal: bool) {
    display::labeled("Identity", name);
    display::kv("address", &actor.address().to_string());
    if reveal {
        display::kv("secret", &actor.secret_hex());
    }
}

/// Sign a terms hash with the acting identity
pub fn sign(actor: &PartyKey, terms: &TermsSource) -> anyhow::Result<()> {
    let hash = terms.resolve()?;
    let signature = actor.sign_terms(&hash)?;
    display::kv("terms hash", &hash.to_string());
    display::kv("signer", &actor.address().to_string());
    println!("{}", signature.to_hex());
    Ok(())
}

/// Recover the signer of `signature` over `hash`
pub fn recover(hash: &DocumentHash, signature: &SignatureBytes) -> anyhow::Result<()> {
    let signer = SignatureVerifier::recover(hash, signature)?;
    display::kv("terms hash", &hash.to_string());
    println!("{}", signer);
    Ok(())
}
