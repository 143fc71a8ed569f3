//! Proxy parser module for turning free-form address strings into descriptors

use crate::proxy::error::ParseError;
use crate::proxy::models::{ProxyDescriptor, ProxyScheme};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

const SCHEME_SEPARATOR: &str = "://";

/// Bracketed IPv6 literal followed by `:` and a colon-free port
static IPV6_ADDRESS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\[.+\]):([^:]*)$").expect("Invalid IPv6 address regex"));

/// Proxy parser for parsing proxies from strings and files
pub struct ProxyParser;

impl ProxyParser {
    /// Parse a single proxy address
    ///
    /// Supports formats:
    /// - HOST:PORT (scheme defaults to http)
    /// - scheme://HOST:PORT for http, https, socks4 and socks5
    /// - [IPv6]:PORT, with or without a scheme
    pub fn parse(raw: &str) -> std::result::Result<ProxyDescriptor, ParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        let (scheme, address) = Self::split_scheme(trimmed)?;

        if !address.contains(':') {
            return Err(ParseError::MissingPortSeparator);
        }

        let (host, port) = if address.starts_with('[') {
            let caps = IPV6_ADDRESS_REGEX
                .captures(address)
                .ok_or(ParseError::InvalidIpv6Literal)?;
            let host = caps.get(1).map_or("", |m| m.as_str());
            let port = caps.get(2).map_or("", |m| m.as_str());
            (host, port)
        } else {
            address
                .rsplit_once(':')
                .ok_or(ParseError::MissingPortSeparator)?
        };

        if host.is_empty() {
            return Err(ParseError::EmptyHost);
        }

        let port = Self::parse_port(port)?;
        Ok(ProxyDescriptor::new(scheme, host, port))
    }

    /// Separate an optional recognised scheme from the address part.
    ///
    /// An unrecognised scheme token leaves the whole string as the address.
    fn split_scheme(trimmed: &str) -> std::result::Result<(ProxyScheme, &str), ParseError> {
        let segments: Vec<&str> = trimmed.split(SCHEME_SEPARATOR).collect();

        match segments.as_slice() {
            [_] => Ok((ProxyScheme::default(), trimmed)),
            [scheme, address] => match scheme.parse::<ProxyScheme>() {
                Ok(scheme) => Ok((scheme, *address)),
                Err(_) => Ok((ProxyScheme::default(), trimmed)),
            },
            _ => Err(ParseError::MultipleSchemeSeparators),
        }
    }

    fn parse_port(port: &str) -> std::result::Result<u16, ParseError> {
        port.parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or(ParseError::InvalidPort)
    }

    /// Split multi-line input into raw proxy strings.
    ///
    /// Lines are trimmed; blank lines and `#` comments are dropped.
    pub fn split_input(content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect()
    }

    /// Read raw proxy strings from a file
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let content = fs::read_to_string(path)?;
        Ok(Self::split_input(&content))
    }

    /// Save raw proxy strings to a file, one per line
    pub fn save_to_file<P: AsRef<Path>>(proxies: &[&str], path: P) -> Result<()> {
        fs::write(path, proxies.join("\n"))?;
        Ok(())
    }
}
