//! Host pattern table.
//!
//! A pattern is either an exact host name (`api.example.com`) or a wildcard
//! (`*.example.com`) that matches the bare domain and every subdomain of it.
//! Patterns and hosts are compared case-insensitively.
//!
//! When several patterns cover the same host the winner is fixed: an exact
//! pattern beats any wildcard, and among wildcards the longest suffix wins.

use std::cmp::Reverse;
use std::collections::BTreeMap;

const WILDCARD_PREFIX: &str = "*.";

/// Maps host patterns to backend addresses (`host:port`).
#[derive(Debug, Clone, Default)]
pub struct HostMatcher {
    exact: BTreeMap<String, String>,
    /// Keyed by (suffix length descending, suffix), so iteration visits the
    /// most specific wildcard first.
    wildcards: BTreeMap<(Reverse<usize>, String), String>,
}

impl HostMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `address` for `pattern`, replacing any earlier entry for the
    /// same pattern.
    pub fn add_mapping(&mut self, pattern: &str, address: impl Into<String>) {
        let pattern = pattern.to_lowercase();
        let address = address.into();

        match pattern.strip_prefix(WILDCARD_PREFIX) {
            Some(suffix) => {
                self.wildcards
                    .insert((Reverse(suffix.len()), suffix.to_string()), address);
            }
            None => {
                self.exact.insert(pattern, address);
            }
        }
    }

    /// Finds the backend address serving `host`.
    pub fn resolve(&self, host: &str) -> Option<&str> {
        let host = host.to_lowercase();

        if let Some(address) = self.exact.get(&host) {
            return Some(address);
        }

        self.wildcards
            .iter()
            .find(|((_, suffix), _)| matches_suffix(&host, suffix))
            .map(|(_, address)| address.as_str())
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcards.is_empty()
    }
}

/// `host` equals `suffix` or ends with `"." + suffix`.
fn matches_suffix(host: &str, suffix: &str) -> bool {
    host.strip_suffix(suffix)
        .is_some_and(|rest| rest.is_empty() || rest.ends_with('.'))
}
