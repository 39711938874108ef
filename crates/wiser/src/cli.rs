//! Clap derive structures for the `wiser` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wiser -- inspect and control a Wiser home hub
#[derive(Debug, Parser)]
#[command(
    name = "wiser",
    version,
    about = "Inspect and control Wiser home hub lights and shutters",
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
    /// Hub profile to use
    #[arg(long, short = 'p', env = "WISER_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Hub address, host or host:port (overrides profile)
    #[arg(long, short = 'e', env = "WISER_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Hub secret (overrides profile)
    #[arg(long, env = "WISER_SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WISER_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "WISER_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one snapshot and list every family record
    #[command(alias = "snap")]
    Snapshot,

    /// List hub devices backed by a supported family
    Discover,

    /// Show one family record
    Get(RecordArgs),

    /// Send a raw RequestAction body
    Action(RawRequestArgs),

    /// Send a raw RequestOverride body
    Override(RawRequestArgs),

    /// Control a light
    Light(LightArgs),

    /// Control a shutter
    Shutter(ShutterArgs),

    /// Follow one device and print every state update
    Watch(RecordArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Record Addressing ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Family tag (Light, Shutter)
    pub tag: String,

    /// Family record id
    pub id: String,
}

#[derive(Debug, Args)]
pub struct RawRequestArgs {
    /// Family tag (Light, Shutter)
    pub tag: String,

    /// Family record id
    pub id: u64,

    /// JSON request body, e.g. '{"State":"On"}'
    pub body: String,
}

// ── Lights ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LightArgs {
    /// Light id
    pub id: u64,

    #[command(subcommand)]
    pub command: LightCommand,
}

#[derive(Debug, Subcommand)]
pub enum LightCommand {
    /// Switch the light on
    On,
    /// Switch the light off
    Off,
    /// Switch on at a brightness percentage
    #[command(alias = "dim")]
    Brightness {
        /// Percentage (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percentage: u8,
    },
}

// ── Shutters ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ShutterArgs {
    /// Shutter id
    pub id: u64,

    #[command(subcommand)]
    pub command: ShutterCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShutterCommand {
    /// Move to a lift percentage
    Lift {
        /// Percentage (0-100)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        percentage: u8,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,
    /// Show the resolved configuration (secrets redacted)
    Show,
    /// Add or replace a profile
    SetProfile {
        /// Profile name
        name: String,
        /// Hub address, host or host:port
        #[arg(long)]
        endpoint: String,
        /// Environment variable holding the hub secret
        #[arg(long)]
        secret_env: Option<String>,
        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },
    /// Store the hub secret for a profile in the system keyring
    SetSecret {
        /// Secret value
        secret: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
