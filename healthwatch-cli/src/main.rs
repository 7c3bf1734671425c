//! `healthwatch` binary entry point: parses arguments, installs the
//! `tracing` subscriber, dispatches to a command, and maps the result onto
//! the process exit code.

use clap::Parser;
use healthwatch_cli::cli::{Cli, Command};
use healthwatch_cli::commands;

#[tokio::main]
async fn main() {
    // Unknown command/flag or `--help`/`--version` all flow through
    // clap's own exit paths except the plain "malformed arguments" case,
    // which this project maps to exit code 3 rather than clap's default of 2.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print().ok();
            std::process::exit(if err.exit_code() == 0 { 0 } else { 3 });
        }
    };
    init_tracing(&cli.command);

    let outcome = match cli.command {
        Command::Check(args) => commands::check::run(args).await,
        Command::Run(args) => commands::run::run(args).await,
        Command::Export(args) => commands::export::run(args).await,
    };

    let exit_code = match outcome {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err}");
            err.exit_code()
        }
    };
    std::process::exit(exit_code);
}

/// `run`'s TUI repaints the whole terminal, so its logs are routed to a
/// null writer rather than stdout/stderr (a `fmt` subscriber writing
/// there would corrupt the screen). `check`/`export` log to stderr.
fn init_tracing(command: &Command) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match command {
        Command::Run(_) => {
            builder.with_writer(std::io::sink).init();
        }
        Command::Check(_) | Command::Export(_) => {
            builder.with_writer(std::io::stderr).init();
        }
    }
}
