use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gossip-chain")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a node and serve until terminated")]
    StartNode {
        #[arg(long, help = "TOML configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Address to listen on (overrides config and NODE_ADDRESS)")]
        listen: Option<String>,
        #[arg(long = "peer", help = "Peer to register at start-up (repeatable)")]
        peers: Vec<String>,
    },
    #[command(name = "send", about = "Submit a transaction to a node")]
    Send {
        #[arg(long, default_value = "127.0.0.1:5000", help = "Node to submit to")]
        node: String,
        #[arg(help = "Sending account")]
        from: String,
        #[arg(help = "Receiving account")]
        to: String,
        #[arg(help = "Amount to transfer")]
        amount: u64,
    },
    #[command(name = "getbalance", about = "Ask a node for an account balance")]
    GetBalance {
        #[arg(long, default_value = "127.0.0.1:5000", help = "Node to query")]
        node: String,
        #[arg(help = "The account identifier")]
        address: String,
    },
    #[command(name = "printchain", about = "Print the chain held by a node")]
    Printchain {
        #[arg(long, default_value = "127.0.0.1:5000", help = "Node to query")]
        node: String,
        #[arg(long, help = "Check linkage and block hashes with the configured digest")]
        validate: bool,
    },
    #[command(name = "addpeer", about = "Tell a node about a peer")]
    AddPeer {
        #[arg(long, default_value = "127.0.0.1:5000", help = "Node to notify")]
        node: String,
        #[arg(help = "Peer address (host:port)")]
        peer: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_startnode_with_peers() {
        let opt = Opt::try_parse_from([
            "gossip-chain",
            "startnode",
            "--listen",
            "127.0.0.1:6000",
            "--peer",
            "127.0.0.1:6001",
            "--peer",
            "127.0.0.1:6002",
        ])
        .unwrap();

        match opt.command {
            Command::StartNode {
                config,
                listen,
                peers,
            } => {
                assert!(config.is_none());
                assert_eq!(listen.as_deref(), Some("127.0.0.1:6000"));
                assert_eq!(peers.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_send_defaults_node() {
        let opt = Opt::try_parse_from(["gossip-chain", "send", "Alice", "Bob", "10"]).unwrap();
        match opt.command {
            Command::Send {
                node,
                from,
                to,
                amount,
            } => {
                assert_eq!(node, "127.0.0.1:5000");
                assert_eq!((from.as_str(), to.as_str(), amount), ("Alice", "Bob", 10));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        assert!(Opt::try_parse_from(["gossip-chain", "send", "Alice", "Bob", "-5"]).is_err());
    }
}
