// Entry point for the node binary: start a node, or talk to one over the wire.
use clap::Parser;
use gossip_chain::network::client::{request, send_message};
use gossip_chain::{validate_chain, Command, Config, Message, Node, Opt, Transaction};
use log::{error, LevelFilter};
use std::process;

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::StartNode {
            config,
            listen,
            peers,
        } => {
            let mut config = match config {
                Some(path) => Config::load(&path)?.apply_env()?,
                None => Config::from_env()?,
            };
            if let Some(addr) = listen {
                config.listen_addr = addr;
            }
            config.bootstrap_peers.extend(peers);

            Node::run(&config).map_err(|e| format!("Server error: {e}"))?
        }
        Command::Send {
            node,
            from,
            to,
            amount,
        } => {
            let config = Config::from_env()?;
            let message = Message::Transaction {
                transaction: Transaction::new(from, to, amount),
            };
            send_message(&node, &message, config.connect_timeout())?;
            println!("Success!")
        }
        Command::GetBalance { node, address } => {
            let config = Config::from_env()?;
            let message = Message::BalanceRequest {
                address: address.clone(),
            };
            match request(&node, &message, config.connect_timeout())? {
                Message::BalanceResponse { balance } => {
                    println!("Balance of {address}: {balance}")
                }
                other => return Err(format!("Unexpected reply: {}", other.kind()).into()),
            }
        }
        Command::Printchain { node, validate } => {
            let config = Config::from_env()?;
            let reply = request(
                &node,
                &Message::BlockchainRequest,
                config.connect_timeout(),
            )?;
            let blockchain = match reply {
                Message::BlockchainResponse { blockchain } => blockchain,
                other => return Err(format!("Unexpected reply: {}", other.kind()).into()),
            };

            for block in &blockchain {
                println!("Prev. hash: {}", block.get_previous_hash());
                println!("Hash: {}", block.get_hash());
                println!("Timestamp: {}", block.get_timestamp());
                if let Some(proof) = block.get_proof() {
                    println!("Proof: {proof}");
                }
                if let Some(root) = block.merkle_root(config.block_digest().as_ref())? {
                    println!("Merkle root: {root}");
                }
                for tx in block.get_transactions() {
                    println!(
                        "- {} -> {}: {}",
                        tx.get_from(),
                        tx.get_to(),
                        tx.get_amount()
                    );
                }
                println!()
            }

            if validate {
                match validate_chain(&blockchain, config.block_digest().as_ref()) {
                    Ok(()) => println!("Chain of {} blocks is valid", blockchain.len()),
                    Err(e) => println!("Chain is invalid: {e}"),
                }
            }
        }
        Command::AddPeer { node, peer } => {
            let config = Config::from_env()?;
            send_message(&node, &Message::Peer { peer }, config.connect_timeout())?;
            println!("Success!")
        }
    }
    Ok(())
}
