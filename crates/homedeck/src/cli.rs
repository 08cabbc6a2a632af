//! Clap derive structures for the `homedeck` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// homedeck -- control home devices from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "homedeck",
    version,
    about = "Control home automation devices from the command line",
    long_about = "Browse rooms and devices on a device server, change characteristics,\n\
        and keep an interactive control surface in sync with the server.\n\n\
        Edits are debounced and merged into one write per device; polled\n\
        state never overwrites a value that is still being written.",
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
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "HOMEDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device server URL (overrides profile)
    #[arg(long, short = 's', env = "HOMEDECK_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HOMEDECK_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "HOMEDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "HOMEDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Poll interval, e.g. "5s" or "1500ms" (overrides profile)
    #[arg(long, value_parser = humantime::parse_duration, global = true)]
    pub interval: Option<std::time::Duration>,

    /// Quiet period before edits are written, e.g. "200ms" (overrides profile)
    #[arg(long, value_parser = humantime::parse_duration, global = true)]
    pub debounce: Option<std::time::Duration>,

    /// Show the characteristic debug table under each device
    #[arg(long, global = true)]
    pub debug: bool,

    /// Record acknowledged writes into the named action
    #[arg(long, value_name = "ACTION", global = true)]
    pub record: Option<String>,
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List rooms on the device server
    #[command(alias = "r")]
    Rooms(RoomsArgs),

    /// List the devices of a room
    #[command(alias = "devs")]
    Devices(DevicesArgs),

    /// Inspect or change a single device
    #[command(alias = "dev", alias = "d")]
    Device(DeviceArgs),

    /// Interactive control surface kept in sync with the server
    #[command(alias = "ctl")]
    Control(ControlArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Rooms ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RoomsArgs {
    #[command(subcommand)]
    pub command: RoomsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RoomsCommand {
    /// List rooms and the devices they contain
    #[command(alias = "ls")]
    List,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List the devices of a room with their current values
    #[command(alias = "ls")]
    List {
        /// Room name
        room: String,
    },
}

// ── Device ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub command: DeviceCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeviceCommand {
    /// Show a device's characteristics
    Get {
        /// Device unique id
        device: String,
    },

    /// Write characteristic values immediately (no debounce)
    Set {
        /// Device unique id
        device: String,

        /// Assignments such as `On=1` or `Brightness=80`
        #[arg(required = true, value_name = "TYPE=VALUE")]
        values: Vec<String>,
    },
}

// ── Control ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ControlArgs {
    /// Devices to mount
    #[arg(required = true, value_name = "DEVICE")]
    pub devices: Vec<String>,

    /// Write logs to this file instead of the terminal
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a config file with one profile
    Init {
        /// Device server URL for the new profile
        #[arg(long)]
        url: String,

        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Overwrite an existing profile of the same name
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
