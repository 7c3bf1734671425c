//! `check`: probe every service exactly once and print a textual report.
//! Exit code is derived solely from the aggregate status.

use crate::cli::{OutputFormat, ProbeArgs};
use crate::error::CliError;
use crate::output::{json, ndjson};
use healthwatch::Status;

pub async fn run(args: ProbeArgs) -> Result<i32, CliError> {
    let (loaded, env) = super::load_and_override(&args.common)?;
    let orchestrator = super::build_orchestrator(loaded, env)?;

    let result = orchestrator.run_once().await;
    orchestrator.shutdown();

    let rendered = match args.out {
        OutputFormat::Json => json::render(&result),
        OutputFormat::Ndjson => ndjson::render(&result),
    };
    print!("{rendered}");

    Ok(exit_code_for(result.status))
}

fn exit_code_for(status: Status) -> i32 {
    match status {
        Status::Ok => 0,
        Status::Degraded => 1,
        Status::Down => 2,
    }
}
