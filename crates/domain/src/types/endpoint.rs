//! Endpoint descriptor: one external API and how to reach it

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{DEFAULT_CALL_TIMEOUT, UNBOUNDED_TIMEOUT_MS};
use crate::errors::PolycallError;

/// Wire protocol spoken by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Rest,
    Grpc,
    Soap,
    /// REST with an `application/x-www-form-urlencoded` request body.
    #[serde(rename = "form")]
    FormUrlEncoded,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Grpc => "grpc",
            Self::Soap => "soap",
            Self::FormUrlEncoded => "form",
        }
    }

    /// Whether the protocol runs over plain HTTP request/response exchanges.
    pub fn is_http(self) -> bool {
        !matches!(self, Self::Grpc)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = PolycallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(Self::Rest),
            "grpc" => Ok(Self::Grpc),
            "soap" => Ok(Self::Soap),
            "form" | "form-urlencoded" => Ok(Self::FormUrlEncoded),
            other => Err(PolycallError::Validation(format!("unsupported endpoint type: {other}"))),
        }
    }
}

/// Per-attempt deadline policy.
///
/// Configured as milliseconds: `-1` is unbounded, `0` (or any other
/// non-positive value) selects the 30 second default, anything positive is
/// used as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Timeout {
    #[default]
    Default,
    Unbounded,
    Fixed(Duration),
}

impl Timeout {
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            UNBOUNDED_TIMEOUT_MS => Self::Unbounded,
            ms if ms > 0 => Self::Fixed(Duration::from_millis(ms.unsigned_abs())),
            _ => Self::Default,
        }
    }

    /// Deadline to apply to a single attempt; `None` means no deadline.
    pub fn deadline(self) -> Option<Duration> {
        match self {
            Self::Default => Some(DEFAULT_CALL_TIMEOUT),
            Self::Unbounded => None,
            Self::Fixed(duration) => Some(duration),
        }
    }
}

impl From<i64> for Timeout {
    fn from(millis: i64) -> Self {
        Self::from_millis(millis)
    }
}

impl From<Timeout> for i64 {
    fn from(timeout: Timeout) -> Self {
        match timeout {
            Timeout::Default => 0,
            Timeout::Unbounded => UNBOUNDED_TIMEOUT_MS,
            Timeout::Fixed(duration) => i64::try_from(duration.as_millis()).unwrap_or(i64::MAX),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::Default
        } else {
            Self::Fixed(duration)
        }
    }
}

/// Immutable description of one remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Human-readable name; part of the client cache identity.
    pub friendly_name: String,
    /// URL for HTTP protocols, `host:port` or URI for gRPC.
    pub url: String,
    #[serde(rename = "type")]
    pub protocol: Protocol,
    #[serde(default, rename = "timeout_ms")]
    pub timeout: Timeout,
    /// SOAP only. Used as a namespace hint, never fetched.
    #[serde(default)]
    pub wsdl_url: Option<String>,
    /// gRPC only. Full method name (`/package.Service/Method`) used when the
    /// call does not name one.
    #[serde(default)]
    pub method_name: Option<String>,
    /// Retries after timed-out attempts.
    #[serde(default, deserialize_with = "clamped_retries")]
    pub max_retries: u32,
}

impl Endpoint {
    pub fn new(
        friendly_name: impl Into<String>,
        url: impl Into<String>,
        protocol: Protocol,
    ) -> Self {
        Self {
            friendly_name: friendly_name.into(),
            url: url.into(),
            protocol,
            timeout: Timeout::Default,
            wsdl_url: None,
            method_name: None,
            max_retries: 0,
        }
    }

    pub fn rest(friendly_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(friendly_name, url, Protocol::Rest)
    }

    pub fn soap(friendly_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(friendly_name, url, Protocol::Soap)
    }

    pub fn grpc(friendly_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(friendly_name, url, Protocol::Grpc)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = timeout.into();
        self
    }

    #[must_use]
    pub fn with_wsdl_url(mut self, wsdl_url: impl Into<String>) -> Self {
        self.wsdl_url = Some(wsdl_url.into());
        self
    }

    #[must_use]
    pub fn with_method_name(mut self, method_name: impl Into<String>) -> Self {
        self.method_name = Some(method_name.into());
        self
    }

    /// Negative counts clamp to zero.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = clamp_retries(max_retries);
        self
    }

    /// Check the fields every protocol client relies on.
    ///
    /// # Errors
    /// Returns `PolycallError::Validation` when the friendly name or URL is
    /// blank.
    pub fn validate(&self) -> Result<(), PolycallError> {
        if self.friendly_name.trim().is_empty() {
            return Err(PolycallError::Validation("endpoint friendly name is required".into()));
        }
        if self.url.trim().is_empty() {
            return Err(PolycallError::Validation("endpoint URL is required".into()));
        }
        Ok(())
    }
}

fn clamp_retries(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn clamped_retries<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    i64::deserialize(deserializer).map(clamp_retries)
}
