//! Tracing subscriber installation for binaries
//!
//! Libraries only emit events; a binary calls [`init_tracing`] once at
//! startup. Filtering follows `RUST_LOG` (default `info`) and
//! `POLYCALL_LOG_FORMAT=json` switches to JSON lines. Output goes to stderr
//! so stdout stays free for call results.

use std::fmt;
use std::str::FromStr;

use polycall_domain::{PolycallError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV_VAR: &str = "POLYCALL_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Format requested through [`LOG_FORMAT_ENV_VAR`]; unknown values fall
    /// back to [`LogFormat::Pretty`].
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for LogFormat {
    type Err = PolycallError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" | "" => Ok(Self::Pretty),
            other => Err(PolycallError::Config(format!("unknown log format: {other}"))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Install the global subscriber using the format from the environment.
///
/// # Errors
/// Returns `PolycallError::Config` if a global subscriber is already set.
pub fn init_tracing() -> Result<()> {
    init_tracing_with(LogFormat::from_env())
}

/// # Errors
/// Returns `PolycallError::Config` if a global subscriber is already set.
pub fn init_tracing_with(format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    installed
        .map_err(|e| PolycallError::Config(format!("failed to install tracing subscriber: {e}")))
}
