//! NoteMark CLI - offline-first notes from the terminal
//!
//! Every write lands in the local store first; `notemark sync` pushes the
//! queued changes to the server.

mod cli;
mod cli_config;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::resolve_db_path;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::interval::run_interval;
use crate::commands::journal::{run_journal, run_requeue};
use crate::commands::list::run_list;
use crate::commands::sync::run_sync;
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

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("notemark=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Add { title, content } => run_add(title, &content, &db_path).await,
        Commands::List { limit, json } => run_list(limit, json, &db_path).await,
        Commands::Edit { id, title, content } => run_edit(&id, title, &content, &db_path).await,
        Commands::Delete { id } => run_delete(&id, &db_path).await,
        Commands::Sync { watch } => run_sync(watch, &db_path).await,
        Commands::Journal { json } => run_journal(json, &db_path).await,
        Commands::Requeue => run_requeue(&db_path).await,
        Commands::Interval { value } => run_interval(value, &db_path).await,
        Commands::Auth { command } => run_auth(command, &db_path).await,
        Commands::Config { command } => run_config(command),
    }
}
