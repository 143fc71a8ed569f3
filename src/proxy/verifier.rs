//! Verification engine: probes a batch of raw proxy strings under a
//! concurrency ceiling and returns one outcome per input, in input order

use crate::proxy::checker::ProxyChecker;
use crate::proxy::error::{ProbeError, ProbeErrorKind};
use crate::proxy::models::ProbeOutcome;
use crate::proxy::parser::ProxyParser;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Default number of concurrent probes
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Clamp a caller-supplied ceiling; missing or non-positive values use the default
pub fn effective_concurrency(requested: Option<i64>) -> usize {
    requested
        .filter(|value| *value > 0)
        .and_then(|value| usize::try_from(value).ok())
        .unwrap_or(DEFAULT_CONCURRENCY)
}

/// Per-call options for a verification batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    pub max_concurrency: usize,
    pub resolve_geo: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_CONCURRENCY,
            resolve_geo: true,
        }
    }
}

impl VerifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ceiling from an untrusted value, see [`effective_concurrency`]
    pub fn with_max_concurrency(mut self, requested: i64) -> Self {
        self.max_concurrency = effective_concurrency(Some(requested));
        self
    }

    pub fn with_resolve_geo(mut self, resolve_geo: bool) -> Self {
        self.resolve_geo = resolve_geo;
        self
    }

    /// Ceiling actually applied; a zero `max_concurrency` uses the default
    pub fn ceiling(&self) -> usize {
        match self.max_concurrency {
            0 => DEFAULT_CONCURRENCY,
            n => n,
        }
    }
}

/// Batch proxy verifier
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    checker: ProxyChecker,
}

impl Verifier {
    pub fn new(checker: ProxyChecker) -> Self {
        Self { checker }
    }

    pub fn checker(&self) -> &ProxyChecker {
        &self.checker
    }

    /// Verify every proxy and return outcomes positionally aligned with `proxies`.
    ///
    /// All probes are spawned up front; each waits for a semaphore permit
    /// before touching the network. Blocks until every probe has finished.
    pub async fn verify<S: AsRef<str>>(
        &self,
        proxies: &[S],
        options: VerifyOptions,
    ) -> Vec<ProbeOutcome> {
        let ceiling = options.ceiling();
        let started = Instant::now();
        info!(
            total = proxies.len(),
            max_concurrency = ceiling,
            resolve_geo = options.resolve_geo,
            "starting verification"
        );

        let semaphore = Arc::new(Semaphore::new(ceiling));

        let handles: Vec<_> = proxies
            .iter()
            .map(|raw| {
                let raw = raw.as_ref().to_string();
                let checker = self.checker.clone();
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let descriptor = match ProxyParser::parse(&raw) {
                        Ok(descriptor) => descriptor,
                        Err(err) => return ProbeOutcome::failed(raw, err),
                    };
                    // The permit drops with the task, whatever the outcome
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(err) => {
                            return ProbeOutcome::failed(
                                raw,
                                ProbeError::new(ProbeErrorKind::Unexpected, err.to_string()),
                            )
                        }
                    };
                    checker.probe(&descriptor, &raw, options.resolve_geo).await
                })
            })
            .collect();

        let mut outcomes: Vec<Option<ProbeOutcome>> = Vec::with_capacity(proxies.len());
        outcomes.resize_with(proxies.len(), || None);

        for (index, joined) in join_all(handles).await.into_iter().enumerate() {
            let outcome = joined.unwrap_or_else(|err| {
                warn!(index, error = %err, "probe task did not complete");
                ProbeOutcome::failed(
                    proxies[index].as_ref(),
                    ProbeError::new(
                        ProbeErrorKind::Unexpected,
                        format!("unexpected error: {}", err),
                    ),
                )
            });
            outcomes[index] = Some(outcome);
        }

        let outcomes: Vec<ProbeOutcome> = outcomes.into_iter().flatten().collect();
        let working = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            total = outcomes.len(),
            working,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "verification finished"
        );

        outcomes
    }
}
