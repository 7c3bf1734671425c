//! Loads a YAML or JSON config file, substitutes `${VAR}` placeholders,
//! and validates into [`Service`]s.
//!
//! The format is picked by file extension, falling back to a
//! YAML-then-JSON parse attempt when the extension is absent or
//! unrecognized. Validation collects every issue found instead of
//! failing on the first one, so a caller sees the full list of problems
//! with a config in one pass.

use crate::error::CliError;
use healthwatch::{Headers, MissingStatusPolicy, Parameters, Service};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    interval: Option<String>,
    timeout: Option<String>,
    retries: Option<usize>,
    concurrency: Option<usize>,
    #[serde(default)]
    default_headers: BTreeMap<String, String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    proxy: Option<String>,
    #[serde(default)]
    insecure: bool,
    missing_status: Option<String>,
    #[serde(default)]
    services: Vec<RawService>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawService {
    name: Option<String>,
    url: Option<String>,
    expect_status: Option<String>,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    proxy: Option<String>,
    timeout: Option<String>,
}

/// The result of a successful load+validate: ready for the orchestrator.
pub struct LoadedConfig {
    pub services: Vec<Service>,
    pub params: Parameters,
}

/// Loads, substitutes environment placeholders, and validates a config
/// file at `path`. Collects *every* validation issue before returning.
pub fn load(path: &Path, env: &HashMap<String, String>) -> Result<LoadedConfig, CliError> {
    let bytes = std::fs::read(path)
        .map_err(|source| CliError::ConfigRead { path: path.display().to_string(), source })?;
    let value = parse_to_json_value(path, &bytes)?;
    let substituted = substitute_env(value, env).map_err(|missing| {
        CliError::ConfigInvalid(vec![format!(
            "unresolved environment placeholder ${{{missing}}}"
        )])
    })?;
    let raw: RawConfig = serde_json::from_value(substituted).map_err(|e| CliError::ConfigParse {
        path: path.display().to_string(),
        source: anyhow::anyhow!(e),
    })?;
    validate(raw)
}

fn parse_to_json_value(path: &Path, bytes: &[u8]) -> Result<serde_json::Value, CliError> {
    let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
    let path_str = path.display().to_string();
    match ext.as_deref() {
        Some("json") => serde_json::from_slice(bytes)
            .map_err(|e| CliError::ConfigParse { path: path_str, source: anyhow::anyhow!(e) }),
        Some("yaml") | Some("yml") => {
            let yaml: serde_yaml::Value = serde_yaml::from_slice(bytes)
                .map_err(|e| CliError::ConfigParse { path: path_str.clone(), source: anyhow::anyhow!(e) })?;
            serde_json::to_value(yaml)
                .map_err(|e| CliError::ConfigParse { path: path_str, source: anyhow::anyhow!(e) })
        }
        _ => serde_yaml::from_slice::<serde_yaml::Value>(bytes)
            .map_err(|e| anyhow::anyhow!(e))
            .and_then(|v| serde_json::to_value(v).map_err(anyhow::Error::from))
            .or_else(|_| serde_json::from_slice::<serde_json::Value>(bytes).map_err(anyhow::Error::from))
            .map_err(|source| CliError::ConfigParse { path: path_str, source }),
    }
}

/// Walks every string scalar in `value`, replacing `${NAME}` placeholders
/// from `env`. Returns the first unresolved placeholder's name as `Err`.
fn substitute_env(value: serde_json::Value, env: &HashMap<String, String>) -> Result<serde_json::Value, String> {
    use serde_json::Value;
    match value {
        Value::String(s) => substitute_str(&s, env).map(Value::String),
        Value::Array(items) => {
            items.into_iter().map(|v| substitute_env(v, env)).collect::<Result<Vec<_>, _>>().map(Value::Array)
        }
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| substitute_env(v, env).map(|v| (k, v)))
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(Value::Object),
        other => Ok(other),
    }
}

fn substitute_str(input: &str, env: &HashMap<String, String>) -> Result<String, String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}').map(|i| start + i) else {
            out.push_str(rest);
            return Ok(out);
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..end];
        match env.get(name) {
            Some(value) => out.push_str(value),
            None => return Err(name.to_string()),
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Validates `raw` into core types, collecting every issue with a
/// JSON-pointer-style path (e.g. `/services/2/url`) rather than
/// failing on the first.
fn validate(raw: RawConfig) -> Result<LoadedConfig, CliError> {
    let mut issues = Vec::new();

    let interval_ms = parse_duration_field(&raw.interval, "/interval", 15_000, &mut issues);
    let timeout_ms = parse_duration_field(&raw.timeout, "/timeout", 3_000, &mut issues);
    let retries = raw.retries.unwrap_or(1);
    let concurrency = raw.concurrency.unwrap_or(10);

    let missing_status_policy = match &raw.missing_status {
        None => MissingStatusPolicy::default(),
        Some(s) => match MissingStatusPolicy::parse(s) {
            Some(p) => p,
            None => {
                issues.push(format!("/missing_status: must be 'degraded' or 'down', got '{s}'"));
                MissingStatusPolicy::default()
            }
        },
    };

    let mut headers: Headers = raw.default_headers.clone();
    headers.extend(raw.headers.clone());

    let mut seen_names = BTreeSet::new();
    let mut services = Vec::with_capacity(raw.services.len());
    if raw.services.is_empty() {
        issues.push("/services: at least one service is required".to_string());
    }
    for (idx, raw_service) in raw.services.into_iter().enumerate() {
        if let Some(service) = validate_service(raw_service, idx, &mut seen_names, &mut issues) {
            services.push(service);
        }
    }

    if !issues.is_empty() {
        return Err(CliError::ConfigInvalid(issues));
    }

    Ok(LoadedConfig {
        services,
        params: Parameters {
            interval_ms,
            timeout_ms,
            retries,
            concurrency,
            headers,
            proxy: raw.proxy,
            insecure: raw.insecure,
            debug: false,
            missing_status_policy,
        },
    })
}

fn parse_duration_field(raw: &Option<String>, path: &str, default_ms: u64, issues: &mut Vec<String>) -> u64 {
    match raw {
        None => default_ms,
        Some(s) => match healthwatch::parse_duration(s) {
            Some(d) => d.as_millis() as u64,
            None => {
                issues.push(format!("{path}: malformed duration '{s}' (expected e.g. '500ms', '3s', '1m')"));
                default_ms
            }
        },
    }
}

fn validate_service(
    raw: RawService,
    idx: usize,
    seen_names: &mut BTreeSet<String>,
    issues: &mut Vec<String>,
) -> Option<Service> {
    let base = format!("/services/{idx}");
    let mut ok = true;

    let name = match raw.name.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => {
            if !seen_names.insert(n.to_string()) {
                issues.push(format!("{base}/name: duplicate service name '{n}'"));
                ok = false;
            }
            n.to_string()
        }
        _ => {
            issues.push(format!("{base}/name: must be non-empty"));
            ok = false;
            String::new()
        }
    };

    let url = match raw.url.as_deref() {
        Some(u) => match url::Url::parse(u) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => u.to_string(),
            Ok(parsed) => {
                issues.push(format!("{base}/url: unsupported scheme '{}', must be http or https", parsed.scheme()));
                ok = false;
                u.to_string()
            }
            Err(e) => {
                issues.push(format!("{base}/url: invalid URL '{u}': {e}"));
                ok = false;
                u.to_string()
            }
        },
        None => {
            issues.push(format!("{base}/url: is required"));
            ok = false;
            String::new()
        }
    };

    let expect_status = match raw.expect_status.as_deref() {
        None => None,
        Some(s) => match healthwatch::Status::parse(s) {
            Some(status) => Some(status),
            None => {
                issues.push(format!("{base}/expect_status: must be 'ok', 'degraded', or 'down', got '{s}'"));
                ok = false;
                None
            }
        },
    };

    let timeout_ms = match &raw.timeout {
        None => None,
        Some(s) => match healthwatch::parse_duration(s) {
            Some(d) => Some(d.as_millis() as u64),
            None => {
                issues.push(format!("{base}/timeout: malformed duration '{s}'"));
                ok = false;
                None
            }
        },
    };

    if !ok {
        return None;
    }

    Some(Service {
        name,
        url,
        expect_status,
        tags: raw.tags,
        headers: raw.headers,
        proxy: raw.proxy,
        timeout_ms,
    })
}

/// Applies CLI flag overrides on top of a loaded config's parameters.
/// Flags win over file values; `--headers` entries overlay (not replace)
/// the file's default headers.
pub fn apply_overrides(params: &mut Parameters, common: &crate::cli::CommonArgs) -> Result<(), CliError> {
    if let Some(raw) = &common.interval {
        params.interval_ms = healthwatch::parse_duration(raw)
            .ok_or_else(|| CliError::Usage(format!("--interval: malformed duration '{raw}'")))?
            .as_millis() as u64;
    }
    if let Some(raw) = &common.timeout {
        params.timeout_ms = healthwatch::parse_duration(raw)
            .ok_or_else(|| CliError::Usage(format!("--timeout: malformed duration '{raw}'")))?
            .as_millis() as u64;
    }
    if let Some(retries) = common.retries {
        params.retries = retries;
    }
    if let Some(concurrency) = common.concurrency {
        params.concurrency = concurrency;
    }
    if let Some(proxy) = &common.proxy {
        params.proxy = Some(proxy.clone());
    }
    for (name, value) in &common.headers {
        params.headers.insert(name.clone(), value.clone());
    }
    if let Some(policy) = common.missing_status {
        params.missing_status_policy = policy.into();
    }
    if common.insecure {
        params.insecure = true;
    }
    if common.debug {
        params.debug = true;
    }
    Ok(())
}
