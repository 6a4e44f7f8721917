//! Peer Discovery Module
//!
//! Discovery strategies a client node uses to locate its peers.

use std::fmt;

use crate::error::{CacheError, Result};

// == Peer Address ==
/// A single resolved `host:port` peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// == Discovery Mode ==
/// How a node finds the rest of its group. One variant per strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Static list of addresses; each item is `host:port` or
    /// `host:first..last` for an inclusive port range.
    DirectIp { addresses: Vec<String> },
}

impl DiscoveryMode {
    /// Expands the strategy into concrete peer addresses.
    pub fn resolve_peers(&self) -> Result<Vec<PeerAddress>> {
        match self {
            DiscoveryMode::DirectIp { addresses } => {
                let mut peers = Vec::new();
                for address in addresses {
                    peers.extend(parse_address(address)?);
                }
                Ok(peers)
            }
        }
    }
}

/// Parses `host:port` or `host:first..last`.
fn parse_address(raw: &str) -> Result<Vec<PeerAddress>> {
    let invalid = |reason: &str| {
        CacheError::Configuration(format!("invalid discovery address {:?}: {}", raw, reason))
    };

    let (host, ports) = raw.trim().rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
    if host.is_empty() {
        return Err(invalid("missing host"));
    }

    let parse_port = |s: &str| s.trim().parse::<u16>().map_err(|_| invalid("bad port"));
    let (first, last) = match ports.split_once("..") {
        Some((first, last)) => (parse_port(first)?, parse_port(last)?),
        None => {
            let port = parse_port(ports)?;
            (port, port)
        }
    };
    if first > last {
        return Err(invalid("port range is reversed"));
    }

    Ok((first..=last)
        .map(|port| PeerAddress {
            host: host.to_string(),
            port,
        })
        .collect())
}
