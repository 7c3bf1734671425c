//! Command-line surface: argument parsing via `clap`'s derive API, with a
//! subcommand enum, per-command `Args` structs, and `--flag <value>`
//! options that fall back to an environment variable when unset.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "healthwatch", version, about = "Parallel health-probe supervisor for a fleet of HTTP services")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the long-lived terminal dashboard.
    Run(ProbeArgs),
    /// Probe every service once and print a textual report.
    Check(ProbeArgs),
    /// Probe every service once and write a Prometheus textfile.
    Export(ExportArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Output format for `check` (ignored by `run`).
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub out: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Destination textfile path for the Prometheus exporter.
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the YAML or JSON config file.
    #[arg(long, env = "HEALTHWATCH_CONFIG")]
    pub config: PathBuf,

    /// Overrides the probe interval (`500ms`, `3s`, `1m`).
    #[arg(long)]
    pub interval: Option<String>,

    /// Overrides the per-request timeout.
    #[arg(long)]
    pub timeout: Option<String>,

    /// Overrides the retry count.
    #[arg(long)]
    pub retries: Option<usize>,

    /// Overrides the concurrency limit (0 = unlimited).
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Overrides the default proxy URL.
    #[arg(long)]
    pub proxy: Option<String>,

    /// Adds a default header, `'Name: Value'`. Repeatable.
    #[arg(long = "headers", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Default outcome when a 2xx response lacks a recognizable status field.
    #[arg(long, value_enum)]
    pub missing_status: Option<MissingStatusArg>,

    /// Skip TLS certificate verification on outbound requests.
    #[arg(long)]
    pub insecure: bool,

    /// Enables the per-request debug instrumentation log.
    #[arg(long)]
    pub debug: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Ndjson,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingStatusArg {
    Degraded,
    Down,
}

impl From<MissingStatusArg> for healthwatch::MissingStatusPolicy {
    fn from(value: MissingStatusArg) -> Self {
        match value {
            MissingStatusArg::Degraded => healthwatch::MissingStatusPolicy::Degraded,
            MissingStatusArg::Down => healthwatch::MissingStatusPolicy::Down,
        }
    }
}

/// Parses `'Name: Value'`; the name must be non-empty and the separator
/// must be present.
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let Some((name, value)) = raw.split_once(':') else {
        return Err(format!("header '{raw}' must contain a ':' separator"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header '{raw}' has an empty name"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
