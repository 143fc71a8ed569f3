//! Proxy Verifier
//!
//! Checks a list of proxies by routing a probe request through each one,
//! measuring latency and exit IP, and optionally locating the exit IP
//! through the same proxy. Batches run under a bounded concurrency ceiling
//! and every input gets exactly one outcome, in input order.

pub mod logging;
pub mod proxy;

pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Probe client settings
    pub probe: ProbeConfig,
    /// Batch settings
    pub verify: VerifyOptions,
}

impl Config {
    /// Build a verifier for this configuration
    pub fn verifier(&self) -> Verifier {
        Verifier::new(ProxyChecker::with_config(self.probe.clone()))
    }
}
