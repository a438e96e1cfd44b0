//! Clap derive structures for the `botdesk` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// botdesk -- manage chatbots from the command line
#[derive(Debug, Parser)]
#[command(
    name = "botdesk",
    version,
    about = "Manage bots on a botdesk backend from the command line",
    long_about = "Administer the bots of a botdesk bot-management backend.\n\n\
        Sessions are persisted between runs and refreshed automatically;\n\
        run `botdesk auth login` once per profile.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config profile to use
    #[arg(long, short = 'p', env = "BOTDESK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend base URL (overrides profile)
    #[arg(long, short = 'u', env = "BOTDESK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BOTDESK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "BOTDESK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "BOTDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Directory for the persisted session and settings
    #[arg(long, env = "BOTDESK_DATA_DIR", global = true, hide = true)]
    pub data_dir: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortDirection {
    Asc,
    Desc,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in, register, and inspect the current session
    Auth(AuthArgs),

    /// Manage bots
    #[command(alias = "b")]
    Bots(BotsArgs),

    /// View and change list settings
    Settings(SettingsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Deployment version checks and manifests
    Version(VersionArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Log in and persist the session (password from BOTDESK_PASSWORD or prompt)
    Login {
        /// Account email (defaults to the profile's email)
        #[arg(long, short = 'e')]
        email: Option<String>,
    },

    /// Create an account and log in
    Register {
        #[arg(long, short = 'e')]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,
    },

    /// Drop the persisted session
    Logout,

    /// Show the logged-in user, confirming the session with the backend
    Whoami,
}

// ── Bots ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BotsArgs {
    #[command(subcommand)]
    pub command: BotsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BotsCommand {
    /// List bots
    #[command(alias = "ls")]
    List(BotListArgs),

    /// Show a single bot
    Get {
        /// Bot ID
        id: String,
    },

    /// Create a bot
    Create {
        /// Display name (1-100 characters)
        #[arg(long, short = 'n')]
        name: String,

        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Create the bot disabled
        #[arg(long)]
        inactive: bool,
    },

    /// Update a bot; omitted fields are left unchanged
    Update {
        /// Bot ID
        id: String,

        #[arg(long, short = 'n')]
        name: Option<String>,

        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Enable or disable the bot
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a bot
    #[command(alias = "rm")]
    Delete {
        /// Bot ID
        id: String,
    },

    /// Delete several bots at once
    BulkDelete {
        /// Bot IDs
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Browse pages interactively; type to search, `n`/`p` to page, `q` to quit
    Browse(BotListArgs),
}

/// Pagination, search and sort arguments for bot lists.
#[derive(Debug, Args)]
pub struct BotListArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Results per page (defaults to the items-per-page setting)
    #[arg(long, short = 'l')]
    pub page_size: Option<u32>,

    /// Filter by name
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Sort field (e.g. name, createdAt)
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort direction
    #[arg(long, default_value = "desc")]
    pub order: SortDirection,
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Display the current settings
    Show,

    /// Change one or more settings
    #[command(arg_required_else_help = true)]
    Set {
        /// Bots shown per page (1-100)
        #[arg(long)]
        items_per_page: Option<u32>,

        /// Search debounce delay (e.g. "300ms", "1s")
        #[arg(long)]
        debounce: Option<String>,
    },

    /// Restore the defaults
    Reset,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,
}

// ── Version ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VersionArgs {
    #[command(subcommand)]
    pub command: VersionCommand,
}

#[derive(Debug, Subcommand)]
pub enum VersionCommand {
    /// Fetch the deployed version.json
    Check,

    /// Poll version.json and report when a new deployment appears
    Watch {
        /// Poll interval (e.g. "30s", "5m")
        #[arg(long, default_value = "5m")]
        interval: String,

        /// Exit after the first update instead of watching forever
        #[arg(long)]
        once: bool,
    },

    /// Write a version.json manifest for this build
    Manifest {
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Version to record (defaults to this build's version)
        #[arg(long)]
        set_version: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
