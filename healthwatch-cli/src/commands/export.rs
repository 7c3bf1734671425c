//! `export`: probe every service once and write a Prometheus textfile to
//! `--output`.

use crate::cli::ExportArgs;
use crate::error::CliError;
use crate::output::prometheus;
use healthwatch::Status;

pub async fn run(args: ExportArgs) -> Result<i32, CliError> {
    let (loaded, env) = super::load_and_override(&args.common)?;
    let orchestrator = super::build_orchestrator(loaded, env)?;

    let result = orchestrator.run_once().await;
    orchestrator.shutdown();

    let rendered = prometheus::render(&result);
    std::fs::write(&args.output, rendered)
        .map_err(|e| CliError::Internal(format!("failed to write {}: {e}", args.output.display())))?;

    Ok(match result.status {
        Status::Ok => 0,
        Status::Degraded => 1,
        Status::Down => 2,
    })
}
