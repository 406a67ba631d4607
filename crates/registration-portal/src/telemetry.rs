use std::env;
use std::fmt;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

/// Crates whose events the configured level applies to. Everything else
/// (reqwest, hyper, rustls) stays at `warn`.
const PORTAL_TARGETS: [&str; 2] = ["registration_portal", "registration_portal_cli"];

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "PORTAL_LOG_LEVEL '{value}' is not a level or filter")
            }
            TelemetryError::Subscriber(err) => {
                write!(f, "could not install log subscriber: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Filter text for the configured level. A bare level is scoped to the portal
/// crates; anything containing `=` or `,` is taken as a full filter.
pub fn default_directive(config: &TelemetryConfig) -> String {
    let level = config.log_level.trim();
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    let mut directive = String::from("warn");
    for target in PORTAL_TARGETS {
        directive.push_str(&format!(",{target}={level}"));
    }
    directive
}

/// Pick the filter: a parseable `RUST_LOG` first, then the configured level.
pub fn build_filter(
    rust_log: Option<&str>,
    config: &TelemetryConfig,
) -> Result<EnvFilter, TelemetryError> {
    if let Some(value) = rust_log.filter(|value| !value.trim().is_empty()) {
        match EnvFilter::try_new(value) {
            Ok(filter) => return Ok(filter),
            Err(err) => eprintln!("ignoring RUST_LOG '{value}': {err}"),
        }
    }

    let directive = default_directive(config);
    EnvFilter::try_new(&directive).map_err(|source| TelemetryError::EnvFilter {
        value: config.log_level.clone(),
        source,
    })
}

/// Install the global subscriber. Output goes to stderr so stdout stays free
/// for prompts and receipts.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let rust_log = env::var("RUST_LOG").ok();
    let filter = build_filter(rust_log.as_deref(), config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
