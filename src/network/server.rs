use crate::config::Config;
use crate::error::{BlockchainError, Result};
use crate::network::message::{read_message, write_message, Message};
use crate::node::Node;
use log::{error, info, warn};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const WAKE_TIMEOUT: Duration = Duration::from_millis(500);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// What a handler does after dispatching its single message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Write one reply, then close
    Reply(Message),
    /// Close, then gossip `message` to every peer except `exclude`
    Broadcast {
        message: Message,
        exclude: Option<String>,
    },
    /// Close
    Idle,
}

/// Apply one decoded message to the node and decide what happens next.
pub fn dispatch(node: &Node, message: Message, sender: SocketAddr) -> Result<Outcome> {
    match message {
        Message::Block { block, origin } => {
            if node.accept_block(block.clone()) {
                let exclude = origin.unwrap_or_else(|| sender.to_string());
                Ok(Outcome::Broadcast {
                    message: node.block_message(block),
                    exclude: Some(exclude),
                })
            } else {
                Ok(Outcome::Idle)
            }
        }
        Message::Peer { peer } => {
            node.add_peer(&peer)?;
            Ok(Outcome::Idle)
        }
        Message::Transaction { transaction } => {
            info!(
                "Received transaction {} -> {} ({})",
                transaction.get_from(),
                transaction.get_to(),
                transaction.get_amount()
            );
            let block = node.create_block(transaction)?;
            Ok(Outcome::Broadcast {
                message: node.block_message(block),
                exclude: None,
            })
        }
        Message::BalanceRequest { address } => Ok(Outcome::Reply(Message::BalanceResponse {
            balance: node.get_balance(&address),
        })),
        Message::BlockchainRequest => Ok(Outcome::Reply(Message::BlockchainResponse {
            blockchain: node.current_chain(),
        })),
        unsolicited @ (Message::BalanceResponse { .. } | Message::BlockchainResponse { .. }) => {
            warn!(
                "Ignoring unsolicited {} from {sender}",
                unsolicited.kind()
            );
            Ok(Outcome::Idle)
        }
    }
}

/// Per-connection state machine: read one message, dispatch, reply or
/// broadcast, close. The socket is closed on every exit path.
pub struct ConnectionHandler {
    node: Node,
    stream: TcpStream,
    peer_addr: SocketAddr,
    read_timeout: Option<Duration>,
}

impl ConnectionHandler {
    pub fn new(
        node: Node,
        stream: TcpStream,
        peer_addr: SocketAddr,
        read_timeout: Option<Duration>,
    ) -> Self {
        Self {
            node,
            stream,
            peer_addr,
            read_timeout,
        }
    }

    pub fn handle(self) -> Result<()> {
        let outcome = self.serve();
        let _ = self.stream.shutdown(Shutdown::Both);

        if let Outcome::Broadcast { message, exclude } = outcome? {
            self.node.broadcast(&message, exclude.as_deref())?;
        }
        Ok(())
    }

    fn serve(&self) -> Result<Outcome> {
        self.stream
            .set_read_timeout(self.read_timeout)
            .map_err(|e| BlockchainError::Socket(format!("Failed to set read timeout: {e}")))?;

        let message = read_message(&self.stream)?;
        info!("Received {} from {}", message.kind(), self.peer_addr);

        let outcome = dispatch(&self.node, message, self.peer_addr)?;
        if let Outcome::Reply(reply) = &outcome {
            write_message(&self.stream, reply)?;
        }
        Ok(outcome)
    }
}

/// Decrements the active-handler count when a handler thread ends, panics included.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Stops a running [`Server`] from another thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    /// Raise the flag and poke the listener so a blocked `accept` returns.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect_timeout(&self.wake_addr, WAKE_TIMEOUT);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP listener spawning one handler thread per accepted connection.
pub struct Server {
    node: Node,
    listener: TcpListener,
    read_timeout: Option<Duration>,
    /// 0 means unbounded
    max_connections: usize,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

impl Server {
    pub fn bind(addr: &str) -> Result<TcpListener> {
        TcpListener::bind(addr)
            .map_err(|e| BlockchainError::Socket(format!("Failed to bind to {addr}: {e}")))
    }

    pub fn new(node: Node, listener: TcpListener, config: &Config) -> Self {
        Self {
            node,
            listener,
            read_timeout: config.read_timeout(),
            max_connections: config.max_connections,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| BlockchainError::Socket(format!("Failed to read local address: {e}")))
    }

    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        let mut wake_addr = self.local_addr()?;
        if wake_addr.ip().is_unspecified() {
            let loopback = match wake_addr.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            };
            wake_addr.set_ip(loopback);
        }
        Ok(ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            wake_addr,
        })
    }

    /// Accept until shut down, then wait for in-flight handlers.
    pub fn run(self) -> Result<()> {
        info!("Server listening on {}", self.local_addr()?);
        let mut handlers: Vec<JoinHandle<()>> = Vec::new();

        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Error accepting connection: {e}");
                    thread::sleep(ACCEPT_BACKOFF);
                    continue;
                }
            };

            let peer_addr = match stream.peer_addr() {
                Ok(addr) => addr,
                Err(e) => {
                    error!("Failed to get peer address: {e}");
                    continue;
                }
            };

            handlers.retain(|handle| !handle.is_finished());

            let active = self.active.load(Ordering::SeqCst);
            if self.max_connections > 0 && active >= self.max_connections {
                warn!("Rejecting connection from {peer_addr}: {active} handlers active");
                continue;
            }

            self.active.fetch_add(1, Ordering::SeqCst);
            let guard = ActiveGuard(Arc::clone(&self.active));
            let handler =
                ConnectionHandler::new(self.node.clone(), stream, peer_addr, self.read_timeout);

            let spawned = thread::Builder::new()
                .name(format!("conn-{peer_addr}"))
                .spawn(move || {
                    let _guard = guard;
                    if let Err(e) = handler.handle() {
                        error!("Error handling connection from {peer_addr}: {e}");
                    }
                });

            match spawned {
                Ok(handle) => handlers.push(handle),
                Err(e) => error!("Failed to spawn handler for {peer_addr}: {e}"),
            }
        }

        // Refuse new connections while in-flight handlers drain.
        drop(self.listener);
        info!(
            "Listener stopped, waiting for {} in-flight handlers",
            handlers.len()
        );
        for handle in handlers {
            if handle.join().is_err() {
                error!("Connection handler panicked");
            }
        }
        Ok(())
    }
}
