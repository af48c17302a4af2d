//! Command-line interface definitions.
//!
//! The operator surface over the opportunity engine: run a scan loop,
//! inspect status, manage market links, and query analytics. None of this
//! is part of the core per spec §1 — it is the thinnest possible shell
//! that wires [`crate::app::App`] up to a terminal.

pub mod banner;
pub mod config;
pub mod link;
pub mod output;
pub mod run;
pub mod scan;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// arbitrex - cross-venue prediction-market arbitrage opportunity engine.
#[derive(Parser, Debug)]
#[command(name = "arbitrex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scan loop in the foreground (optionally real-time).
    Run(RunArgs),

    /// Run exactly one scan cycle and print discovered opportunities.
    Scan(ScanArgs),

    /// Show engine status (breaker state, active opportunity count).
    Status,

    /// Manage manual market links.
    #[command(subcommand)]
    Link(LinkCommands),

    /// Query recorded analytics.
    Stats(StatsArgs),

    /// Inspect or validate the effective configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Circuit-breaker preset, per spec §4.7's "three presets are exposed as
/// example configurations".
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BreakerPreset {
    Conservative,
    Moderate,
    Aggressive,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Skip the banner.
    #[arg(long)]
    pub no_banner: bool,

    /// Use JSON log format instead of pretty.
    #[arg(long)]
    pub json_logs: bool,

    /// Override the scan interval in milliseconds.
    #[arg(long)]
    pub scan_interval_ms: Option<u64>,

    /// Override the circuit-breaker config with a named preset.
    #[arg(long, value_enum)]
    pub breaker_preset: Option<BreakerPreset>,
}

/// Arguments for the `scan` subcommand.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Comma-separated venue override (default: config's venue list).
    #[arg(long)]
    pub venues: Option<String>,

    /// Emit JSON instead of a formatted table.
    #[arg(long)]
    pub json: bool,

    /// Maximum number of opportunities to print.
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

#[derive(Subcommand, Debug)]
pub enum LinkCommands {
    /// Manually link two markets as the same underlying event.
    Add { venue_a: String, market_a: String, venue_b: String, market_b: String },
    /// Remove a manual link between two markets.
    Remove { venue_a: String, market_a: String, venue_b: String, market_b: String },
    /// List every market identified with the given market.
    Show { venue: String, market: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective (merged) configuration.
    Show,
    /// Load the config file and report any validation warnings.
    Validate,
}

/// Arguments for the `stats` subcommand.
#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Window to aggregate over: hour, day, week, all.
    #[arg(long, default_value = "day")]
    pub window: String,

    /// Also print per-venue-pair statistics.
    #[arg(long)]
    pub pairs: bool,
}
