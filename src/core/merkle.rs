use crate::core::{BlockDigest, Transaction};
use crate::error::Result;
use crate::utils::serialize;

/// Merkle root over a block's transactions.
///
/// Leaves are the digest of each transaction's JSON encoding; each parent is
/// the digest of its two children's hex strings concatenated. An odd level
/// pairs its last node with itself. Returns `None` for an empty list.
pub fn merkle_root(
    transactions: &[Transaction],
    digest: &dyn BlockDigest,
) -> Result<Option<String>> {
    let mut level = transactions
        .iter()
        .map(|tx| Ok(digest.digest(&serialize(tx)?)))
        .collect::<Result<Vec<String>>>()?;

    if level.is_empty() {
        return Ok(None);
    }

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                digest.digest(format!("{left}{right}").as_bytes())
            })
            .collect();
    }

    Ok(level.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Sha256Digest, SimpleDigest};

    fn txs(n: u64) -> Vec<Transaction> {
        (1..=n).map(|i| Transaction::new("Alice", "Bob", i)).collect()
    }

    fn leaf(tx: &Transaction) -> String {
        Sha256Digest.digest(&serialize(tx).unwrap())
    }

    fn parent(left: &str, right: &str) -> String {
        Sha256Digest.digest(format!("{left}{right}").as_bytes())
    }

    #[test]
    fn test_empty_block_has_no_root() {
        assert_eq!(merkle_root(&[], &Sha256Digest).unwrap(), None);
    }

    #[test]
    fn test_single_transaction_root_is_its_leaf() {
        let txs = txs(1);
        assert_eq!(
            merkle_root(&txs, &Sha256Digest).unwrap(),
            Some(leaf(&txs[0]))
        );
    }

    #[test]
    fn test_odd_level_duplicates_last_node() {
        let txs = txs(3);
        let left = parent(&leaf(&txs[0]), &leaf(&txs[1]));
        let right = parent(&leaf(&txs[2]), &leaf(&txs[2]));

        assert_eq!(
            merkle_root(&txs, &Sha256Digest).unwrap(),
            Some(parent(&left, &right))
        );
    }

    #[test]
    fn test_root_depends_on_order_and_content() {
        let mut txs = txs(4);
        let root = merkle_root(&txs, &SimpleDigest).unwrap();

        txs.swap(0, 1);
        assert_ne!(merkle_root(&txs, &SimpleDigest).unwrap(), root);

        txs.swap(0, 1);
        txs[3] = Transaction::new("Alice", "Mallory", 4);
        assert_ne!(merkle_root(&txs, &SimpleDigest).unwrap(), root);
    }
}
