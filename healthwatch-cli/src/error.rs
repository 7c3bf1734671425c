//! CLI-facing error type: wraps config/usage failures and maps them onto
//! the exit-code contract from the core's `HealthError::exit_code`.

use thiserror::Error;

/// Errors that can terminate the process before (or instead of) a probe
/// cycle ever runs. Always exit code 3 except [`CliError::Internal`].
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("config validation failed:\n{}", .0.join("\n"))]
    ConfigInvalid(Vec<String>),

    #[error("{0}")]
    Internal(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Internal(_) => 4,
            _ => 3,
        }
    }
}
