//! Batch summaries and exports of verification outcomes

use crate::proxy::models::{ProbeOutcome, UNKNOWN_IP};
use crate::proxy::parser::ProxyParser;
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Aggregate numbers for a verification batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub working: usize,
    pub failed: usize,
    /// Mean latency of working proxies
    pub average_latency_ms: Option<f64>,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[ProbeOutcome]) -> Self {
        let latencies: Vec<f64> = outcomes.iter().filter_map(ProbeOutcome::latency_ms).collect();
        let average_latency_ms = (!latencies.is_empty())
            .then(|| latencies.iter().sum::<f64>() / latencies.len() as f64);

        Self {
            total: outcomes.len(),
            working: latencies.len(),
            failed: outcomes.len() - latencies.len(),
            average_latency_ms,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Results: {} total, {} good, {} bad",
            self.total, self.working, self.failed
        )?;
        if let Some(avg) = self.average_latency_ms {
            write!(f, ", avg {:.2}ms", avg)?;
        }
        Ok(())
    }
}

/// Split outcomes into working and failed, keeping input order in each
pub fn partition(outcomes: &[ProbeOutcome]) -> (Vec<&ProbeOutcome>, Vec<&ProbeOutcome>) {
    outcomes.iter().partition(|outcome| outcome.is_success())
}

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render outcomes as `proxy,ip,country` CSV with a header row
pub fn to_csv(outcomes: &[ProbeOutcome]) -> String {
    let mut csv = String::from("proxy,ip,country\n");
    for outcome in outcomes {
        let ip = outcome.exit_ip().unwrap_or(UNKNOWN_IP);
        let country = outcome
            .geo_result()
            .and_then(|geo| geo.country.as_deref())
            .unwrap_or(UNKNOWN_IP);
        csv.push_str(&format!(
            "{},{},{}\n",
            csv_field(&outcome.original_input),
            csv_field(ip),
            csv_field(country)
        ));
    }
    csv
}

pub fn save_csv<P: AsRef<Path>>(outcomes: &[ProbeOutcome], path: P) -> Result<()> {
    std::fs::write(path, to_csv(outcomes))?;
    Ok(())
}

/// Write the original inputs of the given outcomes, one per line
pub fn save_inputs<P: AsRef<Path>>(outcomes: &[&ProbeOutcome], path: P) -> Result<()> {
    let inputs: Vec<&str> = outcomes
        .iter()
        .map(|outcome| outcome.original_input.as_str())
        .collect();
    ProxyParser::save_to_file(&inputs, path)
}
