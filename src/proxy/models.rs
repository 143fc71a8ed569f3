//! Proxy data models

use crate::proxy::error::{GeoError, ProbeError};
use crate::proxy::geo::GeoResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exit IP placeholder used when the probe target did not report one
pub const UNKNOWN_IP: &str = "N/A";

/// Proxy scheme enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyScheme {
    #[default]
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyScheme {
    /// Scheme used when handing the proxy to the HTTP client.
    ///
    /// SOCKS proxies resolve the target hostname on the proxy side.
    pub fn probe_scheme(&self) -> &'static str {
        match self {
            ProxyScheme::Http => "http",
            ProxyScheme::Https => "https",
            ProxyScheme::Socks4 => "socks4a",
            ProxyScheme::Socks5 => "socks5h",
        }
    }

    /// SOCKS failures get their own connection error message
    pub fn is_socks(&self) -> bool {
        matches!(self, ProxyScheme::Socks4 | ProxyScheme::Socks5)
    }
}

impl fmt::Display for ProxyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyScheme::Http => write!(f, "http"),
            ProxyScheme::Https => write!(f, "https"),
            ProxyScheme::Socks4 => write!(f, "socks4"),
            ProxyScheme::Socks5 => write!(f, "socks5"),
        }
    }
}

/// Error returned for a scheme token outside http/https/socks4/socks5
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownScheme(pub String);

impl FromStr for ProxyScheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(ProxyScheme::Http),
            "https" => Ok(ProxyScheme::Https),
            "socks4" => Ok(ProxyScheme::Socks4),
            "socks5" => Ok(ProxyScheme::Socks5),
            _ => Err(UnknownScheme(s.to_string())),
        }
    }
}

/// Validated proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    pub scheme: ProxyScheme,
    /// Hostname, IPv4 address, or bracketed IPv6 literal
    pub host: String,
    pub port: u16,
}

impl ProxyDescriptor {
    pub fn new(scheme: ProxyScheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// Address handed to the HTTP client, e.g. `socks5h://[::1]:1080`
    pub fn probe_url(&self) -> String {
        format!("{}://{}:{}", self.scheme.probe_scheme(), self.host, self.port)
    }
}

impl fmt::Display for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Primary result of a probe
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeStatus {
    Success {
        #[serde(rename = "ip")]
        exit_ip: String,
        #[serde(rename = "response_time_ms")]
        latency_ms: f64,
    },
    Error(ProbeError),
}

/// Result of the optional geolocation step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeoLookup {
    Resolved(GeoResult),
    Failed(GeoError),
}

/// Outcome of testing one raw proxy string
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeOutcome {
    /// Raw input exactly as the caller gave it
    #[serde(rename = "proxy")]
    pub original_input: String,
    #[serde(flatten)]
    pub status: ProbeStatus,
    #[serde(flatten)]
    pub geo: Option<GeoLookup>,
    pub checked_at: DateTime<Utc>,
}

impl ProbeOutcome {
    pub fn success(original_input: impl Into<String>, exit_ip: String, latency_ms: f64) -> Self {
        Self {
            original_input: original_input.into(),
            status: ProbeStatus::Success {
                exit_ip,
                latency_ms,
            },
            geo: None,
            checked_at: Utc::now(),
        }
    }

    pub fn failed(original_input: impl Into<String>, error: impl Into<ProbeError>) -> Self {
        Self {
            original_input: original_input.into(),
            status: ProbeStatus::Error(error.into()),
            geo: None,
            checked_at: Utc::now(),
        }
    }

    pub fn with_geo(mut self, geo: Result<GeoResult, GeoError>) -> Self {
        self.geo = Some(match geo {
            Ok(result) => GeoLookup::Resolved(result),
            Err(err) => GeoLookup::Failed(err),
        });
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ProbeStatus::Success { .. })
    }

    pub fn exit_ip(&self) -> Option<&str> {
        match &self.status {
            ProbeStatus::Success { exit_ip, .. } => Some(exit_ip),
            ProbeStatus::Error(_) => None,
        }
    }

    pub fn latency_ms(&self) -> Option<f64> {
        match &self.status {
            ProbeStatus::Success { latency_ms, .. } => Some(*latency_ms),
            ProbeStatus::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match &self.status {
            ProbeStatus::Error(err) => Some(err),
            ProbeStatus::Success { .. } => None,
        }
    }

    pub fn geo_result(&self) -> Option<&GeoResult> {
        match &self.geo {
            Some(GeoLookup::Resolved(result)) => Some(result),
            _ => None,
        }
    }

    pub fn geo_error(&self) -> Option<&GeoError> {
        match &self.geo {
            Some(GeoLookup::Failed(err)) => Some(err),
            _ => None,
        }
    }
}
