//! Chain and transaction pool seams used by the node service.
//!
//! The protocol layer only reads the genesis hash and current head. The
//! in-memory implementations here track announced heads and transactions
//! so that relayed gossip has somewhere to land.

use std::collections::{HashMap, HashSet};

use num_bigint::BigUint;
use parking_lot::{Mutex, RwLock};
use seele_p2p::{ChainReader, Hash};

/// Genesis block hash of the default network.
pub const GENESIS_HASH: Hash = [
    0x5e, 0xe1, 0xe0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
];

/// Default transaction pool capacity.
pub const DEFAULT_POOL_SIZE: usize = 10_000;

/// Block store as seen by the node.
pub trait Blockchain: Send + Sync {
    /// Hash of the block at height 0.
    fn genesis_hash(&self) -> Hash;

    /// Current best block hash and its total difficulty.
    fn tip(&self) -> (Hash, BigUint);

    /// Height of the current best block.
    fn height(&self) -> u64;

    /// Whether the block is known.
    fn has_block(&self, hash: &Hash) -> bool;

    /// Offer a block announced by a peer.
    ///
    /// Returns `true` if it became the new best block.
    fn import_announced(&self, hash: Hash, total_difficulty: BigUint) -> bool;
}

/// Pending transactions as seen by the node.
pub trait TransactionPool: Send + Sync {
    /// Add a transaction. Returns `false` if it was already pooled or the pool is full.
    fn add_transaction(&self, hash: Hash, payload: Vec<u8>) -> bool;

    /// Whether the transaction is pooled.
    fn contains(&self, hash: &Hash) -> bool;

    /// Number of pooled transactions.
    fn len(&self) -> usize;

    /// Whether the pool is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Adapts a [`Blockchain`] to what the protocol service reads.
pub struct ChainView<C: ?Sized>(pub std::sync::Arc<C>);

impl<C: Blockchain + ?Sized> ChainReader for ChainView<C> {
    fn genesis_hash(&self) -> Hash {
        self.0.genesis_hash()
    }

    fn current_head(&self) -> (Hash, BigUint) {
        self.0.tip()
    }
}

#[derive(Debug)]
struct Tip {
    hash: Hash,
    total_difficulty: BigUint,
    height: u64,
}

/// In-memory chain holding only block hashes and the best tip.
#[derive(Debug)]
pub struct MemoryChain {
    genesis: Hash,
    tip: RwLock<Tip>,
    blocks: RwLock<HashSet<Hash>>,
}

impl MemoryChain {
    /// Create a chain containing only the genesis block.
    pub fn new(genesis: Hash, genesis_difficulty: BigUint) -> Self {
        Self {
            genesis,
            tip: RwLock::new(Tip {
                hash: genesis,
                total_difficulty: genesis_difficulty,
                height: 0,
            }),
            blocks: RwLock::new(HashSet::from([genesis])),
        }
    }
}

impl Default for MemoryChain {
    fn default() -> Self {
        Self::new(GENESIS_HASH, BigUint::from(1u32))
    }
}

impl Blockchain for MemoryChain {
    fn genesis_hash(&self) -> Hash {
        self.genesis
    }

    fn tip(&self) -> (Hash, BigUint) {
        let tip = self.tip.read();
        (tip.hash, tip.total_difficulty.clone())
    }

    fn height(&self) -> u64 {
        self.tip.read().height
    }

    fn has_block(&self, hash: &Hash) -> bool {
        self.blocks.read().contains(hash)
    }

    fn import_announced(&self, hash: Hash, total_difficulty: BigUint) -> bool {
        if !self.blocks.write().insert(hash) {
            return false;
        }

        let mut tip = self.tip.write();
        if total_difficulty <= tip.total_difficulty {
            return false;
        }
        tip.hash = hash;
        tip.total_difficulty = total_difficulty;
        tip.height += 1;
        true
    }
}

/// In-memory transaction pool bounded by `max_size`.
#[derive(Debug)]
pub struct MemoryPool {
    max_size: usize,
    entries: Mutex<HashMap<Hash, Vec<u8>>>,
}

impl MemoryPool {
    /// Create a pool holding at most `max_size` transactions.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Create a pool with the default capacity.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }

    /// Payload of a pooled transaction.
    pub fn get(&self, hash: &Hash) -> Option<Vec<u8>> {
        self.entries.lock().get(hash).cloned()
    }
}

impl TransactionPool for MemoryPool {
    fn add_transaction(&self, hash: Hash, payload: Vec<u8>) -> bool {
        let mut entries = self.entries.lock();
        if entries.len() >= self.max_size || entries.contains_key(&hash) {
            return false;
        }
        entries.insert(hash, payload);
        true
    }

    fn contains(&self, hash: &Hash) -> bool {
        self.entries.lock().contains_key(hash)
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_genesis_chain() {
        let chain = MemoryChain::default();
        assert_eq!(chain.genesis_hash(), GENESIS_HASH);
        assert_eq!(chain.tip(), (GENESIS_HASH, BigUint::from(1u32)));
        assert_eq!(chain.height(), 0);
        assert!(chain.has_block(&GENESIS_HASH));
    }

    #[test]
    fn test_import_heavier_block() {
        let chain = MemoryChain::default();

        assert!(chain.import_announced([2u8; 32], BigUint::from(10u32)));
        assert_eq!(chain.tip(), ([2u8; 32], BigUint::from(10u32)));
        assert_eq!(chain.height(), 1);

        // Known block.
        assert!(!chain.import_announced([2u8; 32], BigUint::from(20u32)));
    }

    #[test]
    fn test_import_lighter_block_keeps_tip() {
        let chain = MemoryChain::default();
        chain.import_announced([2u8; 32], BigUint::from(10u32));

        assert!(!chain.import_announced([3u8; 32], BigUint::from(5u32)));
        assert_eq!(chain.tip().0, [2u8; 32]);
        assert!(chain.has_block(&[3u8; 32]));
    }

    #[test]
    fn test_chain_view() {
        let chain = Arc::new(MemoryChain::new([7u8; 32], BigUint::from(3u32)));
        let view = ChainView(chain);
        assert_eq!(view.genesis_hash(), [7u8; 32]);
        assert_eq!(view.current_head(), ([7u8; 32], BigUint::from(3u32)));
    }

    #[test]
    fn test_pool_dedup_and_capacity() {
        let pool = MemoryPool::new(2);
        assert!(pool.is_empty());

        assert!(pool.add_transaction([1u8; 32], vec![1]));
        assert!(!pool.add_transaction([1u8; 32], vec![1]));
        assert!(pool.add_transaction([2u8; 32], vec![2]));
        assert!(!pool.add_transaction([3u8; 32], vec![3]));

        assert_eq!(pool.len(), 2);
        assert!(pool.contains(&[2u8; 32]));
        assert_eq!(pool.get(&[1u8; 32]), Some(vec![1]));
    }
}
