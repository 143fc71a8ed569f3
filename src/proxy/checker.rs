//! Probe client: one request through a proxy, plus an optional geolocation
//! lookup routed through the same proxy

use crate::proxy::error::{GeoError, GeoErrorKind, ProbeError, ProbeErrorKind};
use crate::proxy::geo::{self, GeoResult, DEFAULT_GEO_URL};
use crate::proxy::models::{ProbeOutcome, ProxyDescriptor, ProxyScheme, UNKNOWN_IP};
use reqwest::{Client, Proxy as ReqwestProxy};
use serde_json::Value;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default timeout for the probe request in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default timeout for the geolocation request in seconds
const DEFAULT_GEO_TIMEOUT_SECS: u64 = 15;

/// Default URL to test proxies against; echoes the caller's IP
pub const DEFAULT_TEST_URL: &str = "https://api.ipify.org?format=json";

/// Configuration for the probe client
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// URL the probe request is sent to
    pub target_url: String,
    /// Geolocation service URL template, see [`geo::lookup_url`]
    pub geo_url: String,
    /// Timeout for the probe request
    pub timeout: Duration,
    /// Timeout for the geolocation request
    pub geo_timeout: Duration,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TEST_URL.to_string(),
            geo_url: DEFAULT_GEO_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            geo_timeout: Duration::from_secs(DEFAULT_GEO_TIMEOUT_SECS),
            accept_invalid_certs: true,
        }
    }
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = url.into();
        self
    }

    pub fn with_geo_url(mut self, url: impl Into<String>) -> Self {
        self.geo_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_geo_timeout(mut self, timeout: Duration) -> Self {
        self.geo_timeout = timeout;
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// Proxy checker issuing probe and geolocation requests
#[derive(Debug, Clone, Default)]
pub struct ProxyChecker {
    config: Arc<ProbeConfig>,
}

impl ProxyChecker {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new proxy checker with custom configuration
    pub fn with_config(config: ProbeConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe a single proxy.
    ///
    /// The client built here is this call's only session; it is dropped on
    /// every return path. Geolocation failures never downgrade a success.
    pub async fn probe(
        &self,
        descriptor: &ProxyDescriptor,
        original_input: &str,
        resolve_geo: bool,
    ) -> ProbeOutcome {
        debug!(proxy = %descriptor, "probing proxy");

        let client = match self.create_client(descriptor) {
            Ok(client) => client,
            Err(err) => return ProbeOutcome::failed(original_input, err),
        };

        let (exit_ip, latency_ms) = match self.fetch_exit_ip(&client, descriptor).await {
            Ok(found) => found,
            Err(err) => {
                debug!(proxy = %descriptor, kind = %err.kind, error = %err, "probe failed");
                return ProbeOutcome::failed(original_input, err);
            }
        };

        debug!(proxy = %descriptor, exit_ip = %exit_ip, latency_ms, "probe succeeded");

        let lookup = resolve_geo.then(|| exit_ip.clone());
        let outcome = ProbeOutcome::success(original_input, exit_ip, latency_ms);

        match lookup {
            None => outcome,
            Some(ip) if ip == UNKNOWN_IP => outcome.with_geo(Err(GeoError::new(
                GeoErrorKind::Skipped,
                "proxy IP unknown, geolocation lookup skipped",
            ))),
            Some(ip) => {
                let geo = self.lookup_geo(&client, &ip).await;
                outcome.with_geo(geo)
            }
        }
    }

    /// Look up `ip` through `descriptor` on a fresh session
    pub async fn locate_through(
        &self,
        descriptor: &ProxyDescriptor,
        ip: &str,
    ) -> Result<GeoResult, GeoError> {
        let client = self
            .create_client(descriptor)
            .map_err(|err| GeoError::new(GeoErrorKind::Unexpected, err.message))?;
        self.lookup_geo(&client, ip).await
    }

    /// Send the probe request and return the exit IP with latency in ms,
    /// measured once the whole body has been read
    async fn fetch_exit_ip(
        &self,
        client: &Client,
        descriptor: &ProxyDescriptor,
    ) -> Result<(String, f64), ProbeError> {
        let start = Instant::now();

        let response = client
            .get(&self.config.target_url)
            .timeout(self.config.timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| classify_probe_error(&err, descriptor.scheme))?;

        let body: Value = response
            .json()
            .await
            .map_err(|err| classify_probe_error(&err, descriptor.scheme))?;

        let latency_ms = round_ms(start.elapsed());

        Ok((extract_exit_ip(&body), latency_ms))
    }

    /// Geolocation request through the client's proxy, so the service sees
    /// the proxy as the request's source
    async fn lookup_geo(&self, client: &Client, ip: &str) -> Result<GeoResult, GeoError> {
        let url = geo::lookup_url(&self.config.geo_url, ip);
        debug!(url = %url, "looking up geolocation");

        let response = client
            .get(&url)
            .timeout(self.config.geo_timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| classify_geo_error(&err))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|err| classify_geo_error(&err))?;

        geo::interpret_payload(payload)
    }

    /// Create a reqwest client routed through the proxy
    fn create_client(&self, descriptor: &ProxyDescriptor) -> Result<Client, ProbeError> {
        let proxy_url = descriptor.probe_url();

        let reqwest_proxy = ReqwestProxy::all(&proxy_url).map_err(|err| {
            ProbeError::new(
                ProbeErrorKind::InvalidAddress,
                format!("unsupported proxy address {}: {}", proxy_url, err),
            )
        })?;

        Client::builder()
            .proxy(reqwest_proxy)
            .connect_timeout(self.config.timeout)
            .danger_accept_invalid_certs(self.config.accept_invalid_certs)
            .build()
            .map_err(|err| {
                ProbeError::new(
                    ProbeErrorKind::Unexpected,
                    format!("unexpected error building client: {}", error_chain(&err)),
                )
            })
    }
}

/// Pick the exit IP from the probe target's JSON body: `origin`, then `ip`
pub fn extract_exit_ip(body: &Value) -> String {
    ["origin", "ip"]
        .iter()
        .filter_map(|field| body.get(field).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// Render an error with all of its sources
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Render only the causes of an error; reqwest's own message carries the
/// request URL, which must not influence classification
fn cause_chain(err: &(dyn StdError + 'static)) -> String {
    err.source().map(error_chain).unwrap_or_default()
}

fn mentions_tls(chain: &str) -> bool {
    let lower = chain.to_ascii_lowercase();
    ["tls", "ssl", "certificate", "handshake"]
        .iter()
        .any(|needle| lower.contains(needle))
}

fn classify_probe_error(err: &reqwest::Error, scheme: ProxyScheme) -> ProbeError {
    let chain = error_chain(err);

    if err.is_timeout() {
        return if err.is_connect() {
            ProbeError::new(ProbeErrorKind::ConnectTimeout, "connection timed out")
        } else {
            ProbeError::new(ProbeErrorKind::ReadTimeout, "read timed out")
        };
    }

    if mentions_tls(&cause_chain(err)) {
        return ProbeError::new(ProbeErrorKind::Tls, format!("SSL error: {}", chain));
    }

    if err.is_connect() {
        let message = if scheme.is_socks() {
            format!("proxy error: SOCKS proxy connection error: {}", chain)
        } else {
            format!("proxy error: failed to connect through proxy: {}", chain)
        };
        return ProbeError::new(ProbeErrorKind::ProxyConnection, message);
    }

    if err.is_decode() || err.is_builder() {
        return ProbeError::new(
            ProbeErrorKind::Unexpected,
            format!("unexpected error: {}", chain),
        );
    }

    ProbeError::new(ProbeErrorKind::Request, format!("request failed: {}", chain))
}

fn classify_geo_error(err: &reqwest::Error) -> GeoError {
    let chain = error_chain(err);

    if err.is_timeout() {
        GeoError::new(
            GeoErrorKind::Timeout,
            format!("geolocation timed out: {}", chain),
        )
    } else if err.is_decode() || err.is_builder() {
        GeoError::new(
            GeoErrorKind::Unexpected,
            format!("unexpected error during geolocation: {}", chain),
        )
    } else {
        GeoError::new(
            GeoErrorKind::Transport,
            format!("geolocation request failed: {}", chain),
        )
    }
}
