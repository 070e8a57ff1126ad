//! Clap derive structures for the `iotas-bridge` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// iotas-bridge -- expose IOTAS smart-apartment devices as accessories
#[derive(Debug, Parser)]
#[command(
    name = "iotas-bridge",
    version,
    about = "Bridge IOTAS smart-apartment devices to an accessory host",
    long_about = "Discovers the rooms, devices and features of an IOTAS unit,\n\
        maps them to accessory services and keeps them in sync.\n\n\
        `run` is the long-lived headless bridge; the other commands are\n\
        one-shot tools for inspecting and driving the same mapping.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "IOTAS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "IOTAS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "IOTAS_OUTPUT",
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
}

// ── Output & Color Enums ─────────────────────────────────────────────

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

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge: restore, discover and rediscover until interrupted
    Run(RunArgs),

    /// Run one discovery pass against the accessory cache
    Sync(SyncArgs),

    /// List remote devices and the characteristics they map to
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Read one characteristic of an accessory
    Read(ReadArgs),

    /// Write one characteristic of an accessory
    Write(WriteArgs),

    /// Manage configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Bridge commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Accessory cache file (overrides the profile)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Seconds between rediscovery passes (0 discovers once)
    #[arg(long)]
    pub refresh_interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Accessory cache file (overrides the profile)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Report what would change without touching the cache
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices of the active unit
    #[command(alias = "ls")]
    List {
        /// Include devices without any usable feature
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Show one device with its characteristic bindings
    Get {
        /// Accessory UUID, device id or "<room> <device>" name
        identifier: String,
    },
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Accessory UUID, device id or "<room> <device>" name
    pub accessory: String,

    /// Characteristic name (e.g. on, brightness, target-temperature)
    pub characteristic: String,
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    /// Accessory UUID, device id or "<room> <device>" name
    pub accessory: String,

    /// Characteristic name (e.g. on, brightness, target-heating-cooling-state)
    pub characteristic: String,

    /// New value (on/off, a number, or off/heat/cool/auto)
    pub value: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Print the config file location
    Path,

    /// Show the resolved configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Store a profile's password in the system keyring
    SetPassword {
        /// Profile to update (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
