//! Command implementations: `check`, `run`, `export`. Each builds an
//! `Orchestrator` from the validated config + flag overrides, then drives
//! it through the right surface.

pub mod check;
pub mod export;
pub mod run;

use crate::cli::CommonArgs;
use crate::config::{self, LoadedConfig};
use crate::error::CliError;
use healthwatch::{Orchestrator, OrchestratorConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// History capacity for the observation store. Not exposed as a flag: the
/// spec names it only as a store construction parameter, not a CLI knob.
const HISTORY_CAPACITY: usize = 50;

pub fn load_and_override(common: &CommonArgs) -> Result<(LoadedConfig, HashMap<String, String>), CliError> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let mut loaded = config::load(&common.config, &env)?;
    config::apply_overrides(&mut loaded.params, common)?;
    Ok((loaded, env))
}

pub fn build_orchestrator(
    loaded: LoadedConfig,
    env: HashMap<String, String>,
) -> Result<Arc<Orchestrator>, CliError> {
    Orchestrator::new(
        OrchestratorConfig { services: loaded.services, params: loaded.params, history_capacity: HISTORY_CAPACITY },
        env,
    )
    .map_err(|e| CliError::Internal(e.to_string()))
}
