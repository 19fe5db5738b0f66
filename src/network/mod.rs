//! Peer-to-peer networking
//!
//! One-shot TCP exchanges between nodes: the wire codec, the peer registry,
//! best-effort gossip, the listener with its per-connection handlers, and the
//! outbound request client.

pub mod broadcaster;
pub mod client;
pub mod message;
pub mod peers;
pub mod server;

pub use broadcaster::Broadcaster;
pub use message::{read_message, write_message, Message};
pub use peers::{normalize_peer_addr, PeerRegistry};
pub use server::{dispatch, ConnectionHandler, Outcome, Server, ShutdownHandle};
