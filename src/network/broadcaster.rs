use crate::error::Result;
use crate::network::client::send_bytes;
use crate::network::message::Message;
use crate::network::peers::normalize_peer_addr;
use log::{info, warn};
use std::thread;
use std::time::Duration;

/// Best-effort gossip fan-out.
///
/// Each peer gets its own short-lived connection on its own thread, bounded by
/// the connect timeout. Failures are logged and skipped, never retried.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    timeout: Duration,
}

impl Broadcaster {
    pub fn new(timeout: Duration) -> Broadcaster {
        Broadcaster { timeout }
    }

    /// Send `message` to every peer except `exclude`. Returns how many peers
    /// accepted the connection and the bytes.
    pub fn broadcast(
        &self,
        peers: &[String],
        message: &Message,
        exclude: Option<&str>,
    ) -> Result<usize> {
        let bytes = message.encode()?;
        let exclude = exclude.and_then(|addr| normalize_peer_addr(addr).ok());
        let targets: Vec<&String> = peers
            .iter()
            .filter(|peer| Some(peer.as_str()) != exclude.as_deref())
            .collect();

        if targets.is_empty() {
            return Ok(0);
        }

        let delivered = thread::scope(|scope| {
            let sends: Vec<_> = targets
                .iter()
                .map(|peer| {
                    let bytes = bytes.as_slice();
                    let timeout = self.timeout;
                    scope.spawn(move || send_bytes(peer, bytes, timeout))
                })
                .collect();

            sends
                .into_iter()
                .zip(&targets)
                .map(|(send, peer)| match send.join() {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        warn!("Skipping peer {peer}: {e}");
                        false
                    }
                    Err(_) => {
                        warn!("Send to peer {peer} panicked");
                        false
                    }
                })
                .filter(|delivered| *delivered)
                .count()
        });

        info!(
            "Broadcast {} to {delivered}/{} peers",
            message.kind(),
            targets.len()
        );
        Ok(delivered)
    }
}
