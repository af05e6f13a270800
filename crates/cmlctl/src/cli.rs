//! Clap derive structures for the `cmlctl` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// cmlctl -- command-line client for Cisco Modeling Labs
#[derive(Debug, Parser)]
#[command(
    name = "cmlctl",
    version,
    about = "Manage Cisco Modeling Labs from the command line",
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
    /// Controller profile to use
    #[arg(long, short = 'p', env = "CML_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller URL (overrides profile)
    #[arg(long, env = "CML_HOST", global = true)]
    pub host: Option<String>,

    /// Username for login (overrides profile)
    #[arg(long, short = 'u', env = "CML_USERNAME", global = true)]
    pub username: Option<String>,

    /// API token
    #[arg(long, env = "CML_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "CML_OUTPUT", default_value = "table", global = true)]
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CML_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CML_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// One identifier per line
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Color if stdout is a terminal
    Auto,
    Always,
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect and control labs
    #[command(alias = "lab", alias = "l")]
    Labs(LabsArgs),

    /// Inspect nodes of a lab
    #[command(alias = "node", alias = "n")]
    Nodes(NodesArgs),

    /// List user accounts
    Users(UsersArgs),

    /// List groups
    Groups(GroupsArgs),

    /// Node and image definitions
    #[command(alias = "definitions")]
    Defs(DefsArgs),

    /// Controller information
    #[command(alias = "sys")]
    System(SystemArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Labs ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LabsArgs {
    #[command(subcommand)]
    pub command: LabsCommand,
}

#[derive(Debug, Subcommand)]
pub enum LabsCommand {
    /// List labs visible to the user
    #[command(alias = "ls")]
    List {
        /// Include labs of all users (admin only)
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Show a lab by id or title
    Show {
        /// Lab id or title
        lab: String,

        /// Also fetch nodes, interfaces, addresses and links
        #[arg(long, short = 'd')]
        deep: bool,
    },

    /// Import a topology file and print the resulting lab
    Import {
        /// Topology file (YAML)
        file: PathBuf,
    },

    /// Start all nodes of a lab
    Start { lab: String },

    /// Stop all nodes of a lab
    Stop { lab: String },

    /// Wipe all node disks of a stopped lab
    Wipe { lab: String },

    /// Delete a lab
    #[command(alias = "rm")]
    Delete { lab: String },
}

// ── Nodes ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NodesArgs {
    #[command(subcommand)]
    pub command: NodesCommand,
}

#[derive(Debug, Subcommand)]
pub enum NodesCommand {
    /// List nodes of a lab
    #[command(alias = "ls")]
    List {
        /// Lab id or title
        lab: String,
    },

    /// Show a node by id or label
    Show {
        /// Lab id or title
        lab: String,
        /// Node id or label
        node: String,
    },
}

// ── Users / Groups ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List user accounts
    #[command(alias = "ls")]
    List,
}

#[derive(Debug, Args)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    /// List groups
    #[command(alias = "ls")]
    List,
}

// ── Definitions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DefsArgs {
    #[command(subcommand)]
    pub command: DefsCommand,
}

#[derive(Debug, Subcommand)]
pub enum DefsCommand {
    /// List image definitions
    Images,
    /// List node definitions
    Nodes,
}

// ── System ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SystemArgs {
    #[command(subcommand)]
    pub command: SystemCommand,
}

#[derive(Debug, Subcommand)]
pub enum SystemCommand {
    /// Controller version and readiness
    Info,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
