//! Per-peer record of hashes the remote already has.

use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::peer::Hash;

/// Which gossip stream an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Transaction hashes.
    Transaction,
    /// Block hashes.
    Block,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Transaction => write!(f, "transaction"),
            ItemKind::Block => write!(f, "block"),
        }
    }
}

/// Bounded, thread-safe set of hashes known to a peer.
///
/// Once full, the oldest inserted hash is evicted. Re-adding a hash that is
/// already present does not refresh its position.
pub struct KnownItemSet {
    cache: Mutex<LruCache<Hash, ()>>,
}

impl KnownItemSet {
    /// Create a set holding at most `capacity` hashes (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Record a hash as known. No-op if already present.
    pub fn add(&self, id: Hash) {
        self.insert(id);
    }

    /// Record a hash as known.
    ///
    /// Returns true if the hash was NOT known before.
    pub fn insert(&self, id: Hash) -> bool {
        let mut cache = self.cache.lock();
        if cache.contains(&id) {
            false
        } else {
            cache.put(id, ());
            true
        }
    }

    /// Check whether a hash is known.
    pub fn contains(&self, id: &Hash) -> bool {
        self.cache.lock().contains(id)
    }

    /// Number of hashes currently held.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Maximum number of hashes held.
    pub fn capacity(&self) -> usize {
        self.cache.lock().cap().get()
    }
}

impl fmt::Debug for KnownItemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.cache.lock();
        f.debug_struct("KnownItemSet")
            .field("len", &cache.len())
            .field("capacity", &cache.cap())
            .finish()
    }
}
