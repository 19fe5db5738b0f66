use crate::core::{BlockDigest, BlockPolicy, DigestKind, PolicyKind, ProofOfWork};
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;

static DEFAULT_NODE_ADDR: &str = "0.0.0.0:5000";

const NODE_ADDRESS_KEY: &str = "NODE_ADDRESS";
const PUBLIC_ADDRESS_KEY: &str = "PUBLIC_ADDRESS";
const BOOTSTRAP_PEERS_KEY: &str = "BOOTSTRAP_PEERS";
const READ_TIMEOUT_KEY: &str = "READ_TIMEOUT_MS";
const CONNECT_TIMEOUT_KEY: &str = "CONNECT_TIMEOUT_MS";
const MAX_CONNECTIONS_KEY: &str = "MAX_CONNECTIONS";
const BLOCK_DIGEST_KEY: &str = "BLOCK_DIGEST";
const BLOCK_POLICY_KEY: &str = "BLOCK_POLICY";
const POW_DIFFICULTY_KEY: &str = "POW_DIFFICULTY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the listener binds to
    pub listen_addr: String,
    /// Address announced to peers; derived from the bound port when absent
    pub public_addr: Option<String>,
    /// Peers known at start-up
    pub bootstrap_peers: Vec<String>,
    /// Per-connection read timeout
    pub read_timeout_ms: u64,
    /// Outbound connect/write timeout
    pub connect_timeout_ms: u64,
    /// Concurrent handler cap, 0 means unbounded
    pub max_connections: usize,
    pub digest: DigestKind,
    pub block_policy: PolicyKind,
    /// Number of leading hex zeros required under the gated policy
    pub pow_difficulty: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: String::from(DEFAULT_NODE_ADDR),
            public_addr: None,
            bootstrap_peers: Vec::new(),
            read_timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            max_connections: 0,
            digest: DigestKind::default(),
            block_policy: PolicyKind::default(),
            pow_difficulty: crate::core::DEFAULT_POW_DIFFICULTY,
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Self::default()
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Config> {
        Self::default().apply_env()
    }

    pub fn load(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|err| BlockchainError::Config(format!("unable to parse config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the node could never run with.
    pub fn validate(&self) -> Result<()> {
        self.policy().map(|_| ())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let encoded = toml::to_string_pretty(self)
            .map_err(|err| BlockchainError::Config(format!("unable to encode config: {err}")))?;
        fs::write(path, encoded)?;
        Ok(())
    }

    pub fn apply_env(self) -> Result<Config> {
        self.apply_vars(|key| env::var(key).ok())
    }

    /// Layer overrides from `lookup` (usually the process environment).
    pub fn apply_vars<F>(mut self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(NODE_ADDRESS_KEY) {
            self.listen_addr = addr;
        }
        if let Some(addr) = lookup(PUBLIC_ADDRESS_KEY) {
            self.public_addr = Some(addr);
        }
        if let Some(peers) = lookup(BOOTSTRAP_PEERS_KEY) {
            self.bootstrap_peers = peers
                .split(',')
                .map(str::trim)
                .filter(|peer| !peer.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = lookup(READ_TIMEOUT_KEY) {
            self.read_timeout_ms = parse_number(READ_TIMEOUT_KEY, &value)?;
        }
        if let Some(value) = lookup(CONNECT_TIMEOUT_KEY) {
            self.connect_timeout_ms = parse_number(CONNECT_TIMEOUT_KEY, &value)?;
        }
        if let Some(value) = lookup(MAX_CONNECTIONS_KEY) {
            self.max_connections = parse_number(MAX_CONNECTIONS_KEY, &value)?;
        }
        if let Some(value) = lookup(BLOCK_DIGEST_KEY) {
            self.digest = value.parse()?;
        }
        if let Some(value) = lookup(BLOCK_POLICY_KEY) {
            self.block_policy = value.parse()?;
        }
        if let Some(value) = lookup(POW_DIFFICULTY_KEY) {
            self.pow_difficulty = parse_number(POW_DIFFICULTY_KEY, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.read_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        non_zero_millis(self.connect_timeout_ms).unwrap_or(Duration::from_millis(5_000))
    }

    pub fn block_digest(&self) -> Arc<dyn BlockDigest> {
        self.digest.build()
    }

    pub fn policy(&self) -> Result<BlockPolicy> {
        let pow = ProofOfWork::try_new(self.pow_difficulty)?;
        Ok(match self.block_policy {
            PolicyKind::Ungated => BlockPolicy::Ungated,
            PolicyKind::ProofOfWork => BlockPolicy::ProofOfWork(pow),
        })
    }

    /// Address to announce, falling back to loopback on the bound port.
    pub fn public_address(&self, bound: SocketAddr) -> String {
        match &self.public_addr {
            Some(addr) => addr.clone(),
            None => format!("127.0.0.1:{}", bound.port()),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BlockchainError::Config(format!("{key} must be a number, got {value:?}")))
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}
