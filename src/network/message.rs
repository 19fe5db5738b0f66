//! Wire protocol
//!
//! Every connection carries exactly one JSON object whose `type` field selects
//! the variant. JSON values are self-delimiting, so the reader stops at the end
//! of the first value without a length prefix or a size cap.

use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use serde_json::Deserializer;
use std::io::{BufReader, Read, Write};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    Block {
        block: Block,
        /// Advertised address of the node that sent this copy
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<String>,
    },
    Peer {
        peer: String,
    },
    Transaction {
        transaction: Transaction,
    },
    BalanceRequest {
        address: String,
    },
    BalanceResponse {
        balance: i64,
    },
    BlockchainRequest,
    BlockchainResponse {
        blockchain: Vec<Block>,
    },
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Block { .. } => "BLOCK",
            Message::Peer { .. } => "PEER",
            Message::Transaction { .. } => "TRANSACTION",
            Message::BalanceRequest { .. } => "BALANCE_REQUEST",
            Message::BalanceResponse { .. } => "BALANCE_RESPONSE",
            Message::BlockchainRequest => "BLOCKCHAIN_REQUEST",
            Message::BlockchainResponse { .. } => "BLOCKCHAIN_RESPONSE",
        }
    }

    /// Request kinds get exactly one reply; every other kind is a notification.
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Message::BalanceRequest { .. } | Message::BlockchainRequest
        )
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Message> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(BlockchainError::Decode("empty message".to_string()));
        }
        deserialize(bytes)
    }
}

/// Read the first message from `reader`, leaving anything after it unread.
pub fn read_message<R: Read>(reader: R) -> Result<Message> {
    let reader = BufReader::new(reader);
    let mut messages = Deserializer::from_reader(reader).into_iter::<Message>();
    match messages.next() {
        Some(Ok(message)) => Ok(message),
        Some(Err(e)) => Err(BlockchainError::from(e)),
        None => Err(BlockchainError::Decode(
            "connection closed before a message arrived".to_string(),
        )),
    }
}

pub fn write_message<W: Write>(mut writer: W, message: &Message) -> Result<()> {
    let bytes = message.encode()?;
    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| BlockchainError::Socket(format!("Failed to send {}: {e}", message.kind())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sha256Digest;
    use std::io::Cursor;

    fn sample_block() -> Block {
        Block::with_timestamp(
            42,
            "0".to_string(),
            vec![Transaction::new("Alice", "Bob", 10)],
            None,
            &Sha256Digest,
        )
        .unwrap()
    }

    fn all_variants() -> Vec<Message> {
        vec![
            Message::Block {
                block: sample_block(),
                origin: None,
            },
            Message::Block {
                block: sample_block(),
                origin: Some("127.0.0.1:5001".to_string()),
            },
            Message::Peer {
                peer: "127.0.0.1:5001".to_string(),
            },
            Message::Transaction {
                transaction: Transaction::new("Alice", "Bob", 10),
            },
            Message::BalanceRequest {
                address: "Alice".to_string(),
            },
            Message::BalanceResponse { balance: -10 },
            Message::BlockchainRequest,
            Message::BlockchainResponse {
                blockchain: vec![sample_block()],
            },
        ]
    }

    #[test]
    fn test_every_variant_round_trips() {
        for message in all_variants() {
            let bytes = message.encode().unwrap();
            assert_eq!(Message::decode(&bytes).unwrap(), message);
        }
    }

    #[test]
    fn test_type_tags_on_the_wire() {
        for message in all_variants() {
            let value: serde_json::Value =
                serde_json::from_slice(&message.encode().unwrap()).unwrap();
            assert_eq!(value["type"], message.kind());
        }
    }

    #[test]
    fn test_decodes_foreign_sender_shapes() {
        let raw = br#"{"type": "TRANSACTION", "transaction": {"from": "Alice", "to": "Bob", "amount": 10}}"#;
        assert_eq!(
            Message::decode(raw).unwrap(),
            Message::Transaction {
                transaction: Transaction::new("Alice", "Bob", 10)
            }
        );

        let raw = br#"{"type": "BLOCKCHAIN_REQUEST"}"#;
        assert_eq!(Message::decode(raw).unwrap(), Message::BlockchainRequest);
    }

    #[test]
    fn test_unknown_kind_is_decode_error() {
        let raw = br#"{"type": "GOSSIP", "payload": 1}"#;
        assert!(matches!(
            Message::decode(raw),
            Err(BlockchainError::Decode(_))
        ));
    }

    #[test]
    fn test_truncated_and_malformed_input() {
        for raw in [
            &b""[..],
            b"   ",
            b"{\"type\": \"PEER\", \"peer\": \"127.0",
            b"not json",
            b"{\"type\": \"PEER\"}",
            b"{\"type\": \"BALANCE_RESPONSE\", \"balance\": \"ten\"}",
        ] {
            assert!(
                matches!(Message::decode(raw), Err(BlockchainError::Decode(_))),
                "expected decode error for {:?}",
                String::from_utf8_lossy(raw)
            );
        }
    }

    #[test]
    fn test_read_message_stops_after_first_value() {
        let mut bytes = Message::BlockchainRequest.encode().unwrap();
        bytes.extend(b"{\"type\": \"garbage");
        let message = read_message(Cursor::new(bytes)).unwrap();
        assert_eq!(message, Message::BlockchainRequest);
    }

    #[test]
    fn test_read_message_on_closed_stream() {
        assert!(matches!(
            read_message(Cursor::new(Vec::new())),
            Err(BlockchainError::Decode(_))
        ));
    }

    #[test]
    fn test_large_chain_is_not_truncated() {
        let blocks: Vec<Block> = (0..500).map(|_| sample_block()).collect();
        let message = Message::BlockchainResponse { blockchain: blocks };
        let mut buffer = Vec::new();
        write_message(&mut buffer, &message).unwrap();
        assert!(buffer.len() > 4096);
        assert_eq!(read_message(Cursor::new(buffer)).unwrap(), message);
    }

    #[test]
    fn test_expects_reply() {
        assert!(Message::BlockchainRequest.expects_reply());
        assert!(Message::BalanceRequest {
            address: "a".to_string()
        }
        .expects_reply());
        assert!(!Message::Peer {
            peer: "a:1".to_string()
        }
        .expects_reply());
    }
}
