//! Bounded memory of processed transaction signatures.

use std::collections::{HashSet, VecDeque};

/// Insertion-ordered signature set with batch eviction of the oldest entries.
#[derive(Debug)]
pub struct SignatureCache {
    capacity: usize,
    set: HashSet<String>,
    order: VecDeque<String>,
}

impl SignatureCache {
    pub const DEFAULT_CAPACITY: usize = 12_000;

    /// Create a cache holding at most `capacity` signatures (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            set: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Whether a signature has already been recorded.
    #[inline]
    pub fn seen(&self, signature: &str) -> bool {
        self.set.contains(signature)
    }

    /// Record a signature. Already-present signatures are ignored.
    pub fn record(&mut self, signature: impl Into<String>) {
        let signature = signature.into();
        if self.set.contains(&signature) {
            return;
        }
        self.set.insert(signature.clone());
        self.order.push_back(signature);

        if self.order.len() > self.capacity {
            self.evict_batch();
        }
    }

    /// Number of oldest entries dropped when the cache overflows.
    pub fn eviction_batch(&self) -> usize {
        (self.capacity / 10).max(1)
    }

    fn evict_batch(&mut self) {
        for _ in 0..self.eviction_batch() {
            match self.order.pop_front() {
                Some(old) => {
                    self.set.remove(&old);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
