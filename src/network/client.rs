// Outbound one-shot connections: open, send one message, optionally read one
// reply, close.

use crate::error::{BlockchainError, Result};
use crate::network::message::{read_message, Message};
use log::debug;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

fn unreachable(addr: &str, reason: impl Into<String>) -> BlockchainError {
    BlockchainError::PeerUnreachable {
        peer: addr.to_string(),
        reason: reason.into(),
    }
}

pub fn resolve(addr: &str) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|e| unreachable(addr, format!("cannot resolve: {e}")))?
        .next()
        .ok_or_else(|| unreachable(addr, "no addresses resolved"))
}

fn connect(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let socket_addr = resolve(addr)?;
    let stream = TcpStream::connect_timeout(&socket_addr, timeout)
        .map_err(|e| unreachable(addr, format!("connect failed: {e}")))?;
    stream
        .set_write_timeout(Some(timeout))
        .and_then(|_| stream.set_read_timeout(Some(timeout)))
        .map_err(|e| BlockchainError::Socket(format!("Failed to set timeouts: {e}")))?;
    Ok(stream)
}

/// Send already-encoded bytes and half-close the write side.
pub fn send_bytes(addr: &str, bytes: &[u8], timeout: Duration) -> Result<()> {
    let mut stream = connect(addr, timeout)?;
    stream
        .write_all(bytes)
        .and_then(|_| stream.flush())
        .map_err(|e| unreachable(addr, format!("send failed: {e}")))?;
    let _ = stream.shutdown(Shutdown::Write);
    Ok(())
}

/// Fire-and-forget notification.
pub fn send_message(addr: &str, message: &Message, timeout: Duration) -> Result<()> {
    debug!("Sending {} to {addr}", message.kind());
    send_bytes(addr, &message.encode()?, timeout)
}

/// Send a request kind and wait for the single reply.
pub fn request(addr: &str, message: &Message, timeout: Duration) -> Result<Message> {
    debug!("Requesting {} from {addr}", message.kind());
    let mut stream = connect(addr, timeout)?;
    let bytes = message.encode()?;
    stream
        .write_all(&bytes)
        .and_then(|_| stream.flush())
        .map_err(|e| unreachable(addr, format!("send failed: {e}")))?;
    let _ = stream.shutdown(Shutdown::Write);

    let reply = read_message(&stream);
    let _ = stream.shutdown(Shutdown::Both);
    reply
}
