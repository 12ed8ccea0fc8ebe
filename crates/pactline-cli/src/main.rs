//! Pactline CLI - propose, countersign and track escrowed service agreements
//!
//! Usage:
//!   pactline init                                   Create a state file
//!   pactline --as admin token add USDC              Allow a payment token
//!   pactline --as alice create --client bob ...     Propose an agreement
//!   pactline --as bob accept 1                      Countersign and escrow
//!   pactline demo                                   Full lifecycle in memory

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pactline_crypto::PartyKey;
use pactline_types::{DocumentHash, SignatureBytes};

mod commands;
mod config;
mod display;
mod state;

use crate::commands::agreement::CreateArgs;
use crate::commands::TermsSource;
use crate::config::PactlineConfig;
use crate::state::{party, Session};

#[derive(Parser)]
#[command(name = "pactline")]
#[command(author = "Pactline Contributors")]
#[command(version)]
#[command(about = "Escrowed service agreements: signed proposals, countersigned deposits")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    /// State file (overrides configuration)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Named identity to act as (defaults to the administrator)
    #[arg(long = "as", global = true, value_name = "NAME")]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new state file
    Init {
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Show the acting identity's address
    Whoami {
        /// Also print the secret key
        #[arg(long)]
        reveal: bool,
    },

    /// Payment token management
    Token {
        #[command(subcommand)]
        action: TokenCommands,
    },

    /// Propose an agreement as service provider
    Create(CreateArgs),

    /// Countersign a Draft agreement and escrow its payment
    Accept {
        id: u64,

        /// Externally produced client signature
        #[arg(long, value_name = "HEX")]
        signature: Option<SignatureBytes>,
    },

    /// Start work on an Accepted agreement
    Execute { id: u64 },

    /// Mark an agreement in execution as fulfilled
    Complete { id: u64 },

    /// Show one agreement
    Show {
        id: u64,

        #[arg(long)]
        json: bool,
    },

    /// List agreements
    List {
        /// Only agreements where this party is client or service provider
        #[arg(long)]
        party: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show the event log
    Events {
        /// Only events for this agreement
        #[arg(long)]
        id: Option<u64>,

        #[arg(long)]
        json: bool,
    },

    /// Sign a terms hash as the acting identity
    Sign {
        #[command(flatten)]
        terms: TermsSource,
    },

    /// Recover the signer of a terms hash signature
    Recover {
        #[arg(long, value_name = "HEX")]
        hash: DocumentHash,

        #[arg(long, value_name = "HEX")]
        signature: SignatureBytes,
    },

    /// Inspect or move the state clock
    Clock {
        #[command(subcommand)]
        action: ClockCommands,
    },

    /// Run the full lifecycle in memory
    Demo,
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Deploy (if needed) and allow tokens for payment
    Add {
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// Remove a token from the allow-list
    Remove { symbol: String },

    /// List deployed tokens
    List,

    /// Mint tokens to a holder
    Mint {
        symbol: String,
        to: String,
        amount: u128,
    },

    /// Let custody draw from the acting identity
    Approve { symbol: String, amount: u128 },

    /// Show a balance and its custody allowance
    Balance {
        symbol: String,

        /// Holder (defaults to the acting identity)
        who: Option<String>,
    },
}

#[derive(Subcommand)]
enum ClockCommands {
    /// Print the current state time
    Now,

    /// Move the state clock forward
    Advance {
        #[arg(long, default_value = "0")]
        hours: i64,

        #[arg(long, default_value = "0")]
        days: i64,
    },

    /// Catch the state clock up with wall-clock time
    Sync,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        display::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PactlineConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging)?;

    let state_path = cli.state.clone().unwrap_or_else(|| config.state_file.clone());
    let actor_name = cli.actor.clone().unwrap_or_else(|| config.admin_label.clone());
    let actor = PartyKey::for_name(&actor_name)?;

    match cli.command {
        Commands::Init { force } => {
            let admin = party(&config.admin_label)?;
            let custody = party(&config.custody_label)?;
            let session = Session::init(&state_path, admin, custody, force)?;
            session.save()?;
            display::success(&format!("Initialised {}", state_path.display()));
            display::kv("administrator", &admin.to_string());
            display::kv("custody", &custody.to_string());
        }

        Commands::Whoami { reveal } => commands::keys::whoami(&actor_name, &actor, reveal),

        Commands::Sign { terms } => commands::keys::sign(&actor, &terms)?,

        Commands::Recover { hash, signature } => commands::keys::recover(&hash, &signature)?,

        Commands::Demo => commands::demo::run()?,

        // Everything below runs against the state file
        command => {
            let mut session = Session::open(&state_path)?;
            let dirty = dispatch(&mut session, &actor, command)?;
            if dirty {
                session.save()?;
            }
        }
    }

    Ok(())
}

/// Run a stateful command; returns whether the state changed
fn dispatch(session: &mut Session, actor: &PartyKey, command: Commands) -> anyhow::Result<bool> {
    use crate::commands::{agreement, clock, token};

    match command {
        Commands::Token { action } => match action {
            TokenCommands::Add { symbols } => token::add(session, actor, &symbols)?,
            TokenCommands::Remove { symbol } => token::remove(session, actor, &symbol)?,
            TokenCommands::List => {
                token::list(session)?;
                return Ok(false);
            }
            TokenCommands::Mint { symbol, to, amount } => token::mint(session, actor, &symbol, &to, amount)?,
            TokenCommands::Approve { symbol, amount } => token::approve(session, actor, &symbol, amount)?,
            TokenCommands::Balance { symbol, who } => {
                token::balance(session, actor, &symbol, who.as_deref())?;
                return Ok(false);
            }
        },

        Commands::Create(args) => {
            agreement::create(session, actor, args)?;
        }
        Commands::Accept { id, signature } => agreement::accept(session, actor, id, signature)?,
        Commands::Execute { id } => agreement::execute(session, actor, id)?,
        Commands::Complete { id } => agreement::complete(session, actor, id)?,

        Commands::Show { id, json } => {
            agreement::show(session, id, json)?;
            return Ok(false);
        }
        Commands::List { party, json } => {
            agreement::list(session, party.as_deref(), json)?;
            return Ok(false);
        }
        Commands::Events { id, json } => {
            agreement::events(session, id, json)?;
            return Ok(false);
        }

        Commands::Clock { action } => match action {
            ClockCommands::Now => {
                clock::now(session);
                return Ok(false);
            }
            ClockCommands::Advance { hours, days } => clock::advance(session, hours, days)?,
            ClockCommands::Sync => clock::sync(session),
        },

        Commands::Init { .. }
        | Commands::Whoami { .. }
        | Commands::Sign { .. }
        | Commands::Recover { .. }
        | Commands::Demo => anyhow::bail!("command does not use the state file"),
    }

    Ok(true)
}

/// Logs go to stderr so command output stays pipeable
fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            subscriber
                .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
