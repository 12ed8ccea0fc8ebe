//! CLI command implementations

pub mod agreement;
pub mod clock;
pub mod demo;
pub mod keys;
pub mod token;

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use pactline_crypto::terms_document_hash;
use pactline_types::DocumentHash;

/// Where the terms document hash comes from
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct TermsSource {
    /// Terms text, hashed with Keccak-256
    #[arg(long)]
    pub terms: Option<String>,

    /// File whose bytes are hashed with Keccak-256
    #[arg(long, value_name = "PATH")]
    pub terms_file: Option<PathBuf>,

    /// Precomputed 32-byte terms hash
    #[arg(long, value_name = "HEX")]
    pub terms_hash: Option<DocumentHash>,
}

impl TermsSource {
    pub fn resolve(&self) -> anyhow::Result<DocumentHash> {
        if let Some(hash) = self.terms_hash {
            return Ok(hash);
        }
        if let Some(path) = &self.terms_file {
            let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
            return Ok(terms_document_hash(&bytes));
        }
        match &self.terms {
            Some(text) => Ok(terms_document_hash(text.as_bytes())),
            None => anyhow::bail!("one of --terms, --terms-file or --terms-hash is required"),
        }
    }
}
