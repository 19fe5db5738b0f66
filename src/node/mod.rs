//! Node composition root
//!
//! A [`Node`] owns the ledger and the peer registry behind one lock, and is
//! the handle every connection handler and every external caller goes through.
//! Cloning a `Node` is cheap and shares the same state.

use crate::config::Config;
use crate::core::{Block, Ledger, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::client::{request, send_message};
use crate::network::peers::normalize_peer_addr;
use crate::network::{Broadcaster, Message, PeerRegistry, Server, ShutdownHandle};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Everything shared between concurrent handlers.
#[derive(Debug)]
pub struct NodeState {
    pub ledger: Ledger,
    pub peers: PeerRegistry,
}

struct NodeInner {
    state: RwLock<NodeState>,
    broadcaster: Broadcaster,
    public_addr: String,
    request_timeout: Duration,
}

#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    /// Build a node with a fresh ledger (genesis appended) and the configured
    /// bootstrap peers. Nothing is bound yet.
    pub fn new(config: &Config, public_addr: String) -> Result<Node> {
        let ledger = Ledger::new(config.block_digest(), config.policy()?)?;
        let mut peers = PeerRegistry::new();
        for peer in &config.bootstrap_peers {
            if let Err(e) = peers.add(peer) {
                warn!("Ignoring bootstrap peer {peer}: {e}");
            }
        }

        Ok(Node {
            inner: Arc::new(NodeInner {
                state: RwLock::new(NodeState { ledger, peers }),
                broadcaster: Broadcaster::new(config.connect_timeout()),
                public_addr,
                request_timeout: config.connect_timeout(),
            }),
        })
    }

    // Mutations are single pushes/inserts, so a poisoned lock still guards a
    // consistent state.
    fn read_state(&self) -> RwLockReadGuard<'_, NodeState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, NodeState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn public_addr(&self) -> &str {
        self.inner.public_addr.as_str()
    }

    /// Append a block received from the network if it links to our tip.
    pub fn accept_block(&self, block: Block) -> bool {
        let hash = block.get_hash().to_string();
        let mut state = self.write_state();
        match state.ledger.try_append(block) {
            Ok(()) => {
                info!("Added block {hash} (height {})", state.ledger.len() - 1);
                true
            }
            Err(e) => {
                info!("Rejected block {hash}: {e}");
                false
            }
        }
    }

    /// Wrap `transaction` in a new block on the current tip and append it.
    ///
    /// The block is built (and mined, under the gated policy) with no lock
    /// held; only the append takes the write lock. If another block landed
    /// in between, the block is rebuilt on the new tip.
    pub fn create_block(&self, transaction: Transaction) -> Result<Block> {
        loop {
            let template = self.read_state().ledger.template();
            let block = template.build(vec![transaction.clone()])?;

            let mut state = self.write_state();
            match state.ledger.try_append(block.clone()) {
                Ok(()) => {
                    info!(
                        "Created block {} with 1 transaction (height {})",
                        block.get_hash(),
                        state.ledger.len() - 1
                    );
                    return Ok(block);
                }
                Err(BlockchainError::Link { .. }) => {
                    debug!(
                        "Tip moved while building on {}, retrying",
                        template.previous_hash()
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// BLOCK envelope stamped with this node as origin.
    pub fn block_message(&self, block: Block) -> Message {
        Message::Block {
            block,
            origin: Some(self.public_addr().to_string()),
        }
    }

    /// Record a transaction locally as its own block and gossip the block.
    pub fn submit_transaction(&self, transaction: Transaction) -> Result<Block> {
        let block = self.create_block(transaction)?;
        self.broadcast(&self.block_message(block.clone()), None)?;
        Ok(block)
    }

    pub fn get_balance(&self, address: &str) -> i64 {
        self.read_state().ledger.balance_of(address)
    }

    pub fn current_chain(&self) -> Vec<Block> {
        self.read_state().ledger.snapshot()
    }

    pub fn chain_len(&self) -> usize {
        self.read_state().ledger.len()
    }

    pub fn tip_hash(&self) -> String {
        self.read_state().ledger.tip_hash()
    }

    /// Register a peer. Our own address is never registered.
    pub fn add_peer(&self, addr: &str) -> Result<bool> {
        let normalized = normalize_peer_addr(addr)?;
        if normalize_peer_addr(self.public_addr()).ok().as_deref() == Some(normalized.as_str()) {
            return Ok(false);
        }
        let added = self.write_state().peers.add(&normalized)?;
        if added {
            info!("Added peer {normalized}");
        }
        Ok(added)
    }

    pub fn peers(&self) -> Vec<String> {
        self.read_state().peers.addresses()
    }

    /// Fan `message` out to every known peer except `exclude`. The peer list
    /// is copied first so no lock is held during network I/O.
    pub fn broadcast(&self, message: &Message, exclude: Option<&str>) -> Result<usize> {
        let peers = self.peers();
        self.inner.broadcaster.broadcast(&peers, message, exclude)
    }

    /// Forward a transaction to every peer without recording it locally.
    pub fn send_transaction(&self, transaction: Transaction) -> Result<usize> {
        self.broadcast(&Message::Transaction { transaction }, None)
    }

    /// Tell `addr` that this node exists.
    pub fn announce(&self, addr: &str) -> Result<()> {
        let message = Message::Peer {
            peer: self.public_addr().to_string(),
        };
        send_message(addr, &message, self.inner.request_timeout)
    }

    /// Ask peers in turn for their chain; the first answer wins.
    /// Returns an empty chain when nobody answers.
    pub fn request_remote_chain(&self) -> Vec<Block> {
        for peer in self.peers() {
            match request(&peer, &Message::BlockchainRequest, self.inner.request_timeout) {
                Ok(Message::BlockchainResponse { blockchain }) => return blockchain,
                Ok(other) => warn!("Peer {peer} answered chain request with {}", other.kind()),
                Err(e) => warn!("Chain request to {peer} failed: {e}"),
            }
        }
        Vec::new()
    }

    /// Ask peers in turn for a balance; the first answer wins, 0 otherwise.
    pub fn request_remote_balance(&self, address: &str) -> i64 {
        let message = Message::BalanceRequest {
            address: address.to_string(),
        };
        for peer in self.peers() {
            match request(&peer, &message, self.inner.request_timeout) {
                Ok(Message::BalanceResponse { balance }) => return balance,
                Ok(other) => warn!("Peer {peer} answered balance request with {}", other.kind()),
                Err(e) => warn!("Balance request to {peer} failed: {e}"),
            }
        }
        0
    }

    /// Bind the listener, serve it on a background thread and announce this
    /// node to its bootstrap peers.
    pub fn start(config: &Config) -> Result<RunningNode> {
        let listener = Server::bind(&config.listen_addr)?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| BlockchainError::Socket(format!("Failed to read local address: {e}")))?;
        let node = Node::new(config, config.public_address(local_addr))?;
        let server = Server::new(node.clone(), listener, config);
        let shutdown = server.shutdown_handle()?;

        let handle = thread::Builder::new()
            .name(format!("listener-{}", local_addr.port()))
            .spawn(move || server.run())
            .map_err(|e| BlockchainError::Socket(format!("Failed to spawn listener: {e}")))?;

        info!("Node {} listening on {local_addr}", node.public_addr());
        for peer in node.peers() {
            if let Err(e) = node.announce(&peer) {
                warn!("Could not announce to {peer}: {e}");
            }
        }

        Ok(RunningNode {
            node,
            local_addr,
            shutdown,
            listener: Some(handle),
        })
    }

    /// Like [`Node::start`], but serve on the calling thread until the
    /// listener stops.
    pub fn run(config: &Config) -> Result<()> {
        let mut running = Self::start(config)?;
        match running.listener.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| BlockchainError::Socket("listener thread panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

/// A node whose listener is running on a background thread.
///
/// Dropping it stops the listener and waits for in-flight handlers.
pub struct RunningNode {
    node: Node,
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
    listener: Option<JoinHandle<Result<()>>>,
}

impl RunningNode {
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, let in-flight handlers finish, join the listener.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.listener.take() else {
            return Ok(());
        };
        self.shutdown.shutdown();
        handle
            .join()
            .map_err(|_| BlockchainError::Socket("listener thread panicked".to_string()))?
    }
}

impl Drop for RunningNode {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Listener on {} stopped with error: {e}", self.local_addr);
        }
    }
}
