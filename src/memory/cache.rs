//! Cache implementation

use log::trace;

use super::geometry::CacheGeometry;
use super::{AccessOutcome, AccessType, WritePolicy};
use crate::stats::CacheHistory;

/// Metadata of one way. No data is stored.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Block {
    pub valid: bool,
    /// Always false under write-through
    pub dirty: bool,

    pub tag: u64,

    /// Value of the recency clock at the last touch, 0 if never touched
    pub prv_ref: u64,
}

/// Set-associative cache with true LRU replacement
///
/// Blocks live in one flat vector; set `i` owns
/// `blocks[i * associativity..(i + 1) * associativity]`.
#[derive(Clone, Debug)]
pub struct Cache {
    geometry: CacheGeometry,
    policy: WritePolicy,

    pub history: CacheHistory,

    blocks: Vec<Block>,

    // Shared by all sets, bumped on every access
    recency_clock: u64,
}

impl Cache {
    pub fn make(geometry: CacheGeometry, policy: WritePolicy) -> Self {
        let block_num = geometry.num_sets() * geometry.associativity();
        Self {
            geometry,
            policy,
            history: CacheHistory::default(),
            blocks: vec![Block::default(); block_num],
            recency_clock: 0,
        }
    }

    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The ways of set `index`
    pub fn set(&self, index: usize) -> &[Block] {
        &self.blocks[self.set_range(index)]
    }

    fn set_range(&self, index: usize) -> std::ops::Range<usize> {
        let associativity = self.geometry.associativity();
        index * associativity..(index + 1) * associativity
    }

    pub fn is_in_cache(&self, address: u64) -> bool {
        self.lookup(address).is_some()
    }

    /// Block index holding `address`, without touching LRU state
    pub fn lookup(&self, address: u64) -> Option<usize> {
        let (index, tag) = self.geometry.decode(address);
        self.set_range(index)
            .find(|&i| self.blocks[i].valid && self.blocks[i].tag == tag)
    }

    /// Pick the victim in set `index`: the first invalid way if there is
    /// one, otherwise the least recently touched way
    pub fn get_index_to_replace(&self, index: usize) -> usize {
        let range = self.set_range(index);
        let mut result = range.start;
        let mut min_ref = u64::MAX;
        for i in range {
            let block = &self.blocks[i];
            // If it's not valid, replace it immediately
            if !block.valid {
                return i;
            }
            if block.prv_ref < min_ref {
                min_ref = block.prv_ref;
                result = i;
            }
        }
        result
    }

    /// Look up `address`, filling it on a miss.
    ///
    /// Only a miss can report `evicted_dirty`.
    pub fn access(&mut self, address: u64, access_type: AccessType) -> AccessOutcome {
        let (index, tag) = self.geometry.decode(address);
        self.recency_clock += 1;
        let now = self.recency_clock;
        let is_write = access_type == AccessType::Write;

        if is_write && self.policy == WritePolicy::WriteThrough {
            // The write reaches memory whether or not it hits
            self.history.num_memory_write += 1;
        }

        if let Some(hit_index) = self.lookup(address) {
            let block = &mut self.blocks[hit_index];
            block.prv_ref = now;
            if is_write && self.policy == WritePolicy::WriteBack {
                block.dirty = true;
            }
            self.history.num_hit += 1;
            return AccessOutcome::hit();
        }

        self.history.num_miss += 1;

        let index_to_replace = self.get_index_to_replace(index);
        let block = Block {
            valid: true,
            dirty: is_write && self.policy == WritePolicy::WriteBack,
            tag,
            prv_ref: now,
        };
        let replaced_block =
            std::mem::replace(&mut self.blocks[index_to_replace], block);

        let evicted = replaced_block
            .valid
            .then(|| self.geometry.get_address(index, replaced_block.tag));
        let evicted_dirty = replaced_block.valid && replaced_block.dirty;
        if evicted_dirty {
            self.history.num_write_back += 1;
            trace!(
                "write back {:#x} to make room for {:#x}",
                evicted.unwrap_or_default(),
                address
            );
        }

        AccessOutcome {
            hit: false,
            evicted_dirty,
            evicted,
        }
    }
}
