//! Single-result geolocation through the first working proxy

use crate::proxy::error::LocateError;
use crate::proxy::models::UNKNOWN_IP;
use crate::proxy::parser::ProxyParser;
use crate::proxy::verifier::{Verifier, VerifyOptions};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

/// Location looked up through the selected proxy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocateResult {
    /// Original input string of the proxy that was used
    pub proxy_used: String,
    /// IP address that was looked up
    pub queried_ip: String,
    pub location_data: Map<String, Value>,
    pub city: Option<String>,
}

impl Verifier {
    /// Verify `proxies` without geolocation, pick the first working one in
    /// input order, and look up `target_ip` (or that proxy's own exit IP)
    /// through it. `options.resolve_geo` is ignored.
    pub async fn locate<S: AsRef<str>>(
        &self,
        proxies: &[S],
        target_ip: Option<&str>,
        options: VerifyOptions,
    ) -> Result<LocateResult, LocateError> {
        if proxies.is_empty() {
            return Err(LocateError::NoProxies);
        }

        let outcomes = self
            .verify(proxies, options.with_resolve_geo(false))
            .await;

        let chosen = outcomes
            .into_iter()
            .find(|outcome| outcome.is_success())
            .ok_or(LocateError::NoWorkingProxy)?;
        let proxy_used = chosen.original_input.clone();

        let descriptor =
            ProxyParser::parse(&proxy_used).map_err(|source| LocateError::MalformedProxy {
                proxy_used: proxy_used.clone(),
                source,
            })?;

        let queried_ip = target_ip
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .or_else(|| chosen.exit_ip().filter(|ip| *ip != UNKNOWN_IP))
            .map(String::from)
            .ok_or_else(|| LocateError::NoQueryIp {
                proxy_used: proxy_used.clone(),
            })?;

        info!(proxy = %descriptor, ip = %queried_ip, "locating through first working proxy");

        let geo = self
            .checker()
            .locate_through(&descriptor, &queried_ip)
            .await
            .map_err(|source| LocateError::Lookup {
                proxy_used: proxy_used.clone(),
                source,
            })?;

        Ok(LocateResult {
            proxy_used,
            queried_ip,
            city: geo.city,
            location_data: geo.payload,
        })
    }
}
