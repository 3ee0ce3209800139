//! Arena data CLI
//!
//! Reads and writes rows, calls functions, against a hosted store.
//!
//! Usage:
//!   arena --url https://xyz.supabase.co --key <anon-key> list assets --order-by title

use anyhow::{Context, Result};
use arena_cli::{Command, run};
use arena_data::{DataClient, DataConfig};
use arena_store::{RestStore, RestStoreConfig};
use clap::Parser;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "arena")]
#[command(about = "Arena data store client")]
struct Args {
    /// Project base URL
    #[arg(long, env = "ARENA_URL", default_value = "http://localhost:54321")]
    url: String,

    /// Public anon key
    #[arg(long, env = "ARENA_ANON_KEY", default_value = "")]
    key: String,

    /// User access token, sent instead of the anon key
    #[arg(long, env = "ARENA_ACCESS_TOKEN")]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let store = RestStore::new(RestStoreConfig {
        base_url: args.url.clone(),
        api_key: args.key,
        timeout_secs: args.timeout,
    })
    .context("failed to build HTTP client")?;
    if args.token.is_some() {
        store.set_access_token(args.token).await;
    }
    info!("using store at {}", args.url);

    let client = DataClient::from_backend(Arc::new(store), DataConfig::default());
    let output = run(args.command, &client).await?;
    println!("{output}");
    Ok(())
}
