//! Startup configuration and the host mapping file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Deserialize;

use crate::http::request::strip_port;
use crate::proxy::matcher::HostMatcher;

/// Process settings, read from flags with environment fallbacks.
#[derive(Debug, Clone, Parser)]
#[command(name = "mist", about = "Host-based HTTP reverse proxy")]
pub struct Config {
    /// Address to listen on, `host:port` or `:port` for all interfaces
    #[arg(long = "listen-addr", env = "LISTEN", default_value = ":80")]
    pub listen_addr: String,

    /// File mapping host patterns to backend addresses
    #[arg(long = "mapping-config", env = "MAPPING_CONFIG", default_value = "mist.conf")]
    pub mapping_config: PathBuf,

    /// Seconds to wait for a client request or a backend response
    #[arg(long = "read-timeout", env = "READ_TIMEOUT_SECS", default_value_t = 5)]
    pub read_timeout_secs: u64,
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }

    /// The listen address in a form the socket layer accepts.
    ///
    /// `:8080` becomes `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> String {
        match self.listen_addr.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => self.listen_addr.clone(),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// The mapping document: a flat map of host pattern to `host:port`.
///
/// Written as YAML; a JSON object is accepted too since JSON is valid YAML.
/// Wildcard keys must be quoted (`"*.example.com": 10.0.0.1:80`): an
/// unquoted leading `*` is read as a YAML alias and the document fails to
/// load.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct MappingFile {
    pub entries: BTreeMap<String, String>,
}

/// Read and validate the mapping file at `path`.
pub fn load_mappings(path: &Path) -> anyhow::Result<HostMatcher> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_mappings(&content).with_context(|| format!("invalid mapping file {}", path.display()))
}

/// Build the pattern table from a mapping document.
///
/// An empty document yields an empty table.
pub fn parse_mappings(content: &str) -> anyhow::Result<HostMatcher> {
    let mut matcher = HostMatcher::new();
    if content.trim().is_empty() {
        return Ok(matcher);
    }

    let file: MappingFile = serde_yaml::from_str(content).context("malformed mapping document")?;

    for (pattern, address) in &file.entries {
        validate_pattern(pattern)?;
        validate_address(address).with_context(|| format!("bad address for pattern {pattern:?}"))?;
        matcher.add_mapping(pattern, address.as_str());
    }

    Ok(matcher)
}

fn validate_pattern(pattern: &str) -> anyhow::Result<()> {
    let name = pattern.strip_prefix("*.").unwrap_or(pattern);
    if name.is_empty() {
        bail!("empty host pattern {pattern:?}");
    }
    if name.contains('*') || name.chars().any(char::is_whitespace) {
        bail!("invalid host pattern {pattern:?}: only a leading \"*.\" wildcard is allowed");
    }
    // Routing strips the port from the Host header.
    if strip_port(name) != name {
        bail!("invalid host pattern {pattern:?}: patterns name a host without a port");
    }
    Ok(())
}

/// A backend address must be exactly `host:port`.
fn validate_address(address: &str) -> anyhow::Result<()> {
    let url = url::Url::parse(&format!("tcp://{address}"))
        .with_context(|| format!("{address:?} is not a host:port address"))?;

    let well_formed = url.host_str().is_some_and(|h| !h.is_empty())
        && url.port().is_some()
        && url.path().is_empty()
        && url.query().is_none()
        && url.fragment().is_none()
        && url.username().is_empty()
        && url.password().is_none();

    if !well_formed {
        bail!("{address:?} is not a host:port address");
    }
    Ok(())
}
