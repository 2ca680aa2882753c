//! Clap derive structures for the `boardlink` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// boardlink -- talk to the local board agent from the command line
#[derive(Debug, Parser)]
#[command(
    name = "boardlink",
    version,
    about = "Drive the local board agent from the command line",
    long_about = "Discovers the board agent running on this machine, lists serial and\n\
        network ports, downloads toolchains, uploads firmware and opens\n\
        serial monitors.",
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
    /// Origin probed for the agent (overrides config)
    #[arg(long, env = "BOARDLINK_ORIGIN", global = true)]
    pub origin: Option<String>,

    /// First candidate agent port
    #[arg(long, env = "BOARDLINK_FIRST_PORT", global = true)]
    pub first_port: Option<u16>,

    /// Last candidate agent port
    #[arg(long, env = "BOARDLINK_LAST_PORT", global = true)]
    pub last_port: Option<u16>,

    /// Latest agent version; older agents are asked to self-update
    #[arg(long, env = "BOARDLINK_AGENT_VERSION", global = true)]
    pub agent_version: Option<String>,

    /// Verify the agent's TLS certificate
    #[arg(long, global = true)]
    pub verify_tls: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BOARDLINK_OUTPUT",
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

#[derive(Debug, Clone, Copy, ValueEnum)]
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

#[derive(Debug, Clone, Copy, ValueEnum)]
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
    /// Discover the agent and show what it reports
    Info,

    /// List serial and network ports
    #[command(alias = "p")]
    Ports(PortsArgs),

    /// Download toolchains through the agent
    #[command(alias = "dl")]
    Download(DownloadArgs),

    /// List or install tools through the agent's HTTP tool API
    Tools(ToolsArgs),

    /// Upload a compiled sketch to a board
    #[command(alias = "up")]
    Upload(UploadArgs),

    /// Open a serial monitor; stdin lines are written to the port
    #[command(alias = "mon")]
    Monitor(MonitorArgs),

    /// Open a port, write one line, print the reply and close
    Send(SendArgs),

    /// Print the agent state as a serializable snapshot
    Export,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PORTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PortsArgs {
    /// Include network (OTA) ports
    #[arg(long, short = 'n')]
    pub network: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DOWNLOADS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Tool name (e.g., bossac)
    #[arg(required_unless_present = "defaults", requires = "tool_version")]
    pub tool: Option<String>,

    /// Tool version, or "latest"
    #[arg(id = "tool_version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Package that hosts the tool
    #[arg(long, default_value = "arduino")]
    pub package: String,

    /// Download the default toolset instead of a single tool
    #[arg(long, conflicts_with_all = ["tool", "tool_version"])]
    pub defaults: bool,
}

#[derive(Debug, Args)]
pub struct ToolsArgs {
    #[command(subcommand)]
    pub command: ToolsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ToolsCommand {
    /// List installed tools
    #[command(alias = "ls")]
    List,

    /// Install a tool
    Install {
        /// Tool name
        name: String,
        /// Tool version
        #[arg(id = "tool_version", value_name = "VERSION")]
        version: String,
        /// Packager
        #[arg(long, default_value = "arduino")]
        packager: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  UPLOAD
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Upload request file (JSON or YAML)
    pub request: PathBuf,

    /// Target port (overrides the request file)
    #[arg(long, short = 'p')]
    pub port: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERIAL MONITOR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Serial port name (e.g., /dev/ttyACM0)
    pub port: String,

    /// Baud rate
    #[arg(long, short = 'b', default_value = "9600")]
    pub baud: u32,

    /// Close the monitor after this many seconds
    #[arg(long, short = 'd')]
    pub duration: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Serial port name
    pub port: String,

    /// Line to write
    pub data: String,

    /// Baud rate
    #[arg(long, short = 'b', default_value = "9600")]
    pub baud: u32,

    /// How long to collect the board's reply, in milliseconds
    #[arg(long, default_value = "500")]
    pub wait_ms: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
