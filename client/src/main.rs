#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]
#![allow(clippy::print_stdout)]

use std::sync::Arc;

use anyhow::{Context, Result};
use bureaudechange_client::{
    api::BureauApi,
    config::Config,
    dispatch::{Dispatcher, HttpDispatcher},
    lookup::{LookupSource, MembersByLoginOrName},
    session::CredentialStore,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Query the bureau de change API with the configured credentials.
#[derive(Debug, Parser)]
#[command(name = "bdc", version)]
struct Cli {
    /// YAML configuration file, overridden by BDC_* environment variables
    #[arg(long, default_value = "config.yaml")]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show one member
    Member { id: String },
    /// List countries
    Countries,
    /// List payment modes
    PaymentModes,
    /// Towns for a postal code
    Towns { zip: String },
    /// List associations
    Associations {
        /// Only approved associations
        #[arg(long)]
        approved: bool,
    },
    /// Search members by identifier or name
    Search { query: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration first (fail-fast)
    let config = Config::load_from(&cli.config).context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid logging.level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.api.base_url,
        "bdc starting up"
    );

    let store = CredentialStore::from_config(&config.session);
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(HttpDispatcher::from_config(&config, store));
    let api = BureauApi::new(dispatcher);

    match cli.cmd {
        Command::Member { id } => print_json(&api.member(&id).await?),
        Command::Countries => print_json(&api.countries().await?),
        Command::PaymentModes => print_json(&api.payment_modes().await?),
        Command::Towns { zip } => print_json(&api.towns(&zip).await?),
        Command::Associations { approved } => print_json(&api.associations(approved).await?),
        Command::Search { query } => {
            let source = MembersByLoginOrName::new(api, config.forms.prefix_chars());
            tracing::debug!(filter = ?source.filter_for(&query), "Searching members");
            print_json(&source.lookup(&query).await?)
        }
    }
}
