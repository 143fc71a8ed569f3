//! Geolocation of a proxy's exit IP through an ip-api style lookup service

use crate::proxy::error::{GeoError, GeoErrorKind};
use serde::Serialize;
use serde_json::{Map, Value};

/// Default lookup service; `{ip}` is replaced by the address to locate
pub const DEFAULT_GEO_URL: &str = "http://ip-api.com/json/{ip}";

const IP_PLACEHOLDER: &str = "{ip}";

/// Geographic location reported by the lookup service
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct GeoResult {
    pub city: Option<String>,
    pub country: Option<String>,
    /// Full service response, preserved verbatim
    #[serde(rename = "geo_location")]
    pub payload: Map<String, Value>,
}

impl GeoResult {
    /// Get a short display string for the location
    pub fn short_display(&self) -> String {
        match (&self.city, &self.country) {
            (Some(city), Some(country)) => format!("{}, {}", city, country),
            (None, Some(country)) => country.clone(),
            (Some(city), None) => city.clone(),
            (None, None) => String::from("Unknown"),
        }
    }
}

impl std::fmt::Display for GeoResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_display())
    }
}

/// Build the lookup URL for an IP.
///
/// A template without `{ip}` gets the address appended as a path segment.
pub fn lookup_url(template: &str, ip: &str) -> String {
    if template.contains(IP_PLACEHOLDER) {
        template.replace(IP_PLACEHOLDER, ip)
    } else {
        format!("{}/{}", template.trim_end_matches('/'), ip)
    }
}

/// Interpret a decoded service response.
///
/// Only a `status` of `"success"` yields a location; anything else is a
/// remote failure that keeps the payload for inspection.
pub fn interpret_payload(payload: Value) -> Result<GeoResult, GeoError> {
    let Value::Object(payload) = payload else {
        return Err(GeoError::new(
            GeoErrorKind::Unexpected,
            "unexpected error during geolocation: response is not a JSON object",
        ));
    };

    if payload.get("status").and_then(Value::as_str) != Some("success") {
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(GeoError::new(
            GeoErrorKind::Remote,
            format!("geolocation lookup failed: {}", message),
        )
        .with_payload(payload));
    }

    let field = |name: &str| payload.get(name).and_then(Value::as_str).map(String::from);
    Ok(GeoResult {
        city: field("city"),
        country: field("country"),
        payload,
    })
}
