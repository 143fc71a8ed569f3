//! Proxy module for parsing and verifying proxies
//!
//! This module provides functionality for:
//! - Parsing free-form proxy addresses (HOST:PORT, scheme://HOST:PORT, [IPv6]:PORT)
//! - Probing a proxy for reachability, latency and exit IP
//! - Resolving the exit IP's location through the proxy itself
//! - Verifying whole batches under a concurrency ceiling, in input order

pub mod checker;
pub mod error;
pub mod geo;
pub mod locate;
pub mod models;
pub mod parser;
pub mod report;
pub mod verifier;

pub use checker::{ProbeConfig, ProxyChecker};
pub use error::{GeoError, GeoErrorKind, LocateError, ParseError, ProbeError, ProbeErrorKind};
pub use geo::GeoResult;
pub use locate::LocateResult;
pub use models::{GeoLookup, ProbeOutcome, ProbeStatus, ProxyDescriptor, ProxyScheme};
pub use parser::ProxyParser;
pub use report::Summary;
pub use verifier::{effective_concurrency, Verifier, VerifyOptions};
