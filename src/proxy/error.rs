//! Error types for parsing, probing and geolocation

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Reasons a raw proxy string is rejected by the parser
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty address")]
    Empty,
    #[error("multiple scheme separators")]
    MultipleSchemeSeparators,
    #[error("missing port separator")]
    MissingPortSeparator,
    #[error("invalid IPv6 literal")]
    InvalidIpv6Literal,
    #[error("empty host")]
    EmptyHost,
    #[error("invalid port")]
    InvalidPort,
}

/// Classification of a failed probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    InvalidAddress,
    ProxyConnection,
    ConnectTimeout,
    ReadTimeout,
    Tls,
    Request,
    Unexpected,
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProbeErrorKind::InvalidAddress => "invalid address",
            ProbeErrorKind::ProxyConnection => "proxy connection",
            ProbeErrorKind::ConnectTimeout => "connect timeout",
            ProbeErrorKind::ReadTimeout => "read timeout",
            ProbeErrorKind::Tls => "tls",
            ProbeErrorKind::Request => "request",
            ProbeErrorKind::Unexpected => "unexpected",
        };
        f.write_str(name)
    }
}

/// A probe failure, terminal for the proxy it belongs to
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message}")]
pub struct ProbeError {
    #[serde(rename = "error_kind")]
    pub kind: ProbeErrorKind,
    #[serde(rename = "error")]
    pub message: String,
}

impl ProbeError {
    pub fn new(kind: ProbeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ParseError> for ProbeError {
    fn from(err: ParseError) -> Self {
        Self::new(ProbeErrorKind::InvalidAddress, err.to_string())
    }
}

/// Classification of a failed geolocation lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoErrorKind {
    /// No exit IP was discovered, so no lookup was attempted
    Skipped,
    Timeout,
    Transport,
    Unexpected,
    /// The service answered but reported a non-success status
    Remote,
}

/// A geolocation failure. Never downgrades the probe it is attached to.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{message}")]
pub struct GeoError {
    #[serde(rename = "geo_error_kind")]
    pub kind: GeoErrorKind,
    #[serde(rename = "geo_location_error")]
    pub message: String,
    /// Raw service response, kept when the service itself reported failure
    #[serde(rename = "geo_location", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
}

impl GeoError {
    pub fn new(kind: GeoErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Request-level failures of the single-result locate entry point
#[derive(Error, Debug)]
pub enum LocateError {
    #[error("no proxies provided")]
    NoProxies,
    #[error("no working proxy available")]
    NoWorkingProxy,
    #[error("selected proxy address is malformed: {source}")]
    MalformedProxy {
        proxy_used: String,
        #[source]
        source: ParseError,
    },
    #[error("cannot determine the IP to look up (proxy IP unknown and no target IP given)")]
    NoQueryIp { proxy_used: String },
    #[error("location lookup through proxy failed: {source}")]
    Lookup {
        proxy_used: String,
        #[source]
        source: GeoError,
    },
}

impl LocateError {
    /// The proxy that was selected before the failure, if one was
    pub fn proxy_used(&self) -> Option<&str> {
        match self {
            LocateError::NoProxies | LocateError::NoWorkingProxy => None,
            LocateError::MalformedProxy { proxy_used, .. }
            | LocateError::NoQueryIp { proxy_used }
            | LocateError::Lookup { proxy_used, .. } => Some(proxy_used),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_messages() {
        assert_eq!(ParseError::Empty.to_string(), "empty address");
        assert_eq!(ParseError::InvalidPort.to_string(), "invalid port");
    }

    #[test]
    fn test_parse_error_becomes_invalid_address() {
        let err: ProbeError = ParseError::MissingPortSeparator.into();
        assert_eq!(err.kind, ProbeErrorKind::InvalidAddress);
        assert_eq!(err.message, "missing port separator");
    }

    #[test]
    fn test_locate_error_proxy_used() {
        assert!(LocateError::NoWorkingProxy.proxy_used().is_none());
        let err = LocateError::NoQueryIp {
            proxy_used: "1.2.3.4:80".to_string(),
        };
        assert_eq!(err.proxy_used(), Some("1.2.3.4:80"));
    }
}
