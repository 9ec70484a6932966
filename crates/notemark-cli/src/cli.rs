use std::path::PathBuf;

use clap::{Parser, Subcommand};
use notemark_core::models::SyncInterval;

#[derive(Parser)]
#[command(name = "notemark")]
#[command(about = "Offline-first notes that sync when you are online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Note title (defaults to "Note Title")
        #[arg(short, long)]
        title: Option<String>,
        /// Note content; read from stdin or $EDITOR when omitted
        content: Vec<String>,
    },
    /// List notes, most recently edited first
    List {
        /// Number of notes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New content; opens $EDITOR when omitted and no title is given
        content: Vec<String>,
    },
    /// Delete a note
    Delete {
        /// Note ID or unique ID prefix
        id: String,
    },
    /// Push pending local changes to the server
    Sync {
        /// Keep running and sync on the configured interval until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Show pending and dead-lettered changes
    Journal {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move dead-lettered changes back into the queue
    Requeue,
    /// Show or set the automatic sync interval
    Interval {
        /// One of: manual, 15m, 30m, 1h
        value: Option<SyncInterval>,
    },
    /// Account commands
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Configure the CLI
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in and store the session locally
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and forget local notes and pending changes
    Logout {
        /// Sign out even when changes have not been synced yet
        #[arg(long)]
        force: bool,
    },
    /// Show the signed-in account and sync status
    Status,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update the CLI config file
    Init {
        /// Note service base URL
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Value sent in the X-User-Email header
        #[arg(long, value_name = "EMAIL")]
        user_email: Option<String>,
    },
}
