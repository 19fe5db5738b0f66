use crate::config::DEFAULT_PORT;
use crate::error::{BlockchainError, Result};
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};

/// Known remote nodes as normalised `host:port` strings.
///
/// Grows only through explicit announcements and is never pruned. The
/// registry is not synchronised itself; the node guards it with the ledger lock.
#[derive(Debug, Default, Clone)]
pub struct PeerRegistry {
    peers: BTreeSet<String>,
}

impl PeerRegistry {
    pub fn new() -> PeerRegistry {
        PeerRegistry {
            peers: BTreeSet::new(),
        }
    }

    /// Returns true when the address was not known before.
    pub fn add(&mut self, addr: &str) -> Result<bool> {
        let addr = normalize_peer_addr(addr)?;
        Ok(self.peers.insert(addr))
    }

    pub fn contains(&self, addr: &str) -> bool {
        match normalize_peer_addr(addr) {
            Ok(addr) => self.peers.contains(&addr),
            Err(_) => false,
        }
    }

    pub fn addresses(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Canonical `host:port` form; a bare host gets the default port.
pub fn normalize_peer_addr(addr: &str) -> Result<String> {
    let addr = addr.trim();
    if addr.is_empty() {
        return Err(BlockchainError::Decode("empty peer address".to_string()));
    }
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        return Ok(socket_addr.to_string());
    }
    if let Ok(ip) = addr.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT).to_string());
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.contains(':') => {
            let port: u16 = port
                .parse()
                .map_err(|_| BlockchainError::Decode(format!("invalid peer port in {addr:?}")))?;
            Ok(format!("{host}:{port}"))
        }
        Some(_) => Err(BlockchainError::Decode(format!(
            "invalid peer address {addr:?}"
        ))),
        None => Ok(format!("{addr}:{DEFAULT_PORT}")),
    }
}
