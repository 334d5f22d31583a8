use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "notemirror")]
#[command(about = "Mirror your notes into plain files and keep them in sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Mirror directory (overrides the profile setting)
    #[arg(long, global = true, value_name = "PATH")]
    pub mirror_dir: Option<PathBuf>,

    /// Report every note the engine touches
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile every note in the remote index with the mirror
    Sync {
        /// Keep local edits when both sides changed since the last sync
        #[arg(long)]
        prefer_local: bool,
    },
    /// Reconcile a single mirrored note
    SyncNote {
        /// Note key
        key: String,
        /// Keep the local edit when both sides changed since the last sync
        #[arg(long)]
        prefer_local: bool,
    },
    /// Check out every remote note into a fresh mirror
    Clone {
        /// Reuse an existing mirror directory and replace its entries
        #[arg(long)]
        overwrite: bool,
    },
    /// Create a note remotely and mirror it
    #[command(alias = "new")]
    Add {
        /// Note content (stdin or $EDITOR when omitted)
        content: Vec<String>,
        /// Tag to attach; repeatable
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// List mirrored notes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a note as stored remotely
    Show {
        /// Note key
        key: String,
        /// Historical version to fetch
        #[arg(long, value_name = "N")]
        version: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a note to the remote trash and drop it from the mirror
    Trash {
        /// Note key
        key: String,
    },
    /// Permanently delete a note remotely and drop it from the mirror
    Delete {
        /// Note key
        key: String,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage stored credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,
        /// Note service base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Seconds to wait after a remote write before listing the index
        #[arg(long, value_name = "SECS")]
        index_cooldown_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in and store the auth token in the keychain
    Login {
        /// Account email (defaults to the profile email)
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,
        /// Account password (or NOTEMIRROR_PASSWORD)
        #[arg(long, value_name = "PASSWORD")]
        password: Option<String>,
    },
    /// Show auth status for profile
    Status,
    /// Forget the stored auth token
    Logout,
}
