//! notemirror CLI - keep a directory of plain-text notes in sync with the note service
//!
//! Every note lives in `<mirror>/<key>/text.txt`; edit it with any editor and
//! run `notemirror sync` to reconcile.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::clone::run_clone;
use crate::commands::common::Context;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::{run_delete, run_trash};
use crate::commands::list::run_list;
use crate::commands::show::run_show;
use crate::commands::sync::{run_sync, run_sync_note};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Cli {
        command,
        profile,
        mirror_dir,
        verbose,
    } = cli;
    let profile = profile.as_deref();
    let context = || Context::load(profile, mirror_dir.clone(), verbose);

    match command {
        Commands::Sync { prefer_local } => run_sync(prefer_local, &context()?).await,
        Commands::SyncNote { key, prefer_local } => {
            run_sync_note(&key, prefer_local, &context()?).await
        }
        Commands::Clone { overwrite } => run_clone(overwrite, &context()?).await,
        Commands::Add { content, tags } => run_add(&content, &tags, &context()?).await,
        Commands::List { json } => run_list(json, &context()?),
        Commands::Show { key, version, json } => {
            run_show(&key, version, json, &context()?).await
        }
        Commands::Trash { key } => run_trash(&key, &context()?).await,
        Commands::Delete { key } => run_delete(&key, &context()?).await,
        Commands::Auth { command } => run_auth(command, &context()?).await,
        Commands::Config { command } => run_config(command, profile, mirror_dir.clone()),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "notemirror=debug"
    } else {
        "notemirror=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
