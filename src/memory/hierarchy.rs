//! Split L1 caches with an optional shared L2

use super::cache::Cache;
use super::geometry::CacheGeometry;
use super::{AccessClass, AccessOutcome, WritePolicy};
use crate::stats::CacheHistory;

/// Instruction and data L1 caches, optionally backed by one shared L2.
///
/// Accesses must be fed in trace order: both streams update the LRU
/// state of the shared level.
#[derive(Clone, Debug)]
pub struct CacheHierarchy {
    pub instruction_cache: Cache,
    pub data_cache: Cache,
    pub shared_cache: Option<Cache>,
}

/// What each level did for one logical access
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HierarchyOutcome {
    pub l1: AccessOutcome,
    /// `None` when L1 hit or when there is no L2
    pub l2: Option<AccessOutcome>,
}

/// Counters of every cache in the hierarchy
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct HierarchyHistory {
    pub instruction: CacheHistory,
    pub data: CacheHistory,
    pub shared: Option<CacheHistory>,
}

impl CacheHierarchy {
    pub fn single_level(instruction_cache: Cache, data_cache: Cache) -> Self {
        Self {
            instruction_cache,
            data_cache,
            shared_cache: None,
        }
    }

    pub fn two_level(
        instruction_cache: Cache,
        data_cache: Cache,
        shared_cache: Cache,
    ) -> Self {
        Self {
            instruction_cache,
            data_cache,
            shared_cache: Some(shared_cache),
        }
    }

    /// Build identical I/D caches of shape `l1`, and an L2 of shape `l2`
    /// if given, all under the same write policy
    pub fn make(
        l1: CacheGeometry,
        l2: Option<CacheGeometry>,
        policy: WritePolicy,
    ) -> Self {
        Self {
            instruction_cache: Cache::make(l1, policy),
            data_cache: Cache::make(l1, policy),
            shared_cache: l2.map(|geometry| Cache::make(geometry, policy)),
        }
    }

    pub fn is_two_level(&self) -> bool {
        self.shared_cache.is_some()
    }

    /// Route one access to its L1; on a miss, repeat it on L2
    pub fn access(&mut self, class: AccessClass, address: u64) -> HierarchyOutcome {
        let access_type = class.access_type();
        let l1_cache = if class.is_instruction() {
            &mut self.instruction_cache
        } else {
            &mut self.data_cache
        };

        let l1 = l1_cache.access(address, access_type);
        if l1.hit {
            return HierarchyOutcome { l1, l2: None };
        }

        let l2 = self
            .shared_cache
            .as_mut()
            .map(|shared| shared.access(address, access_type));
        HierarchyOutcome { l1, l2 }
    }

    pub fn history(&self) -> HierarchyHistory {
        HierarchyHistory {
            instruction: self.instruction_cache.history,
            data: self.data_cache.history,
            shared: self.shared_cache.as_ref().map(|shared| shared.history),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l1(associativity: usize) -> CacheGeometry {
        CacheGeometry::new(1024, 32, associativity).unwrap()
    }

    fn l2(associativity: usize) -> CacheGeometry {
        CacheGeometry::new(16384, 128, associativity).unwrap()
    }

    fn replay(
        hierarchy: &mut CacheHierarchy,
        trace: &[(u8, u64)],
    ) -> Vec<HierarchyOutcome> {
        trace
            .iter()
            .map(|&(kind, address)| {
                hierarchy.access(AccessClass::try_from(kind).unwrap(), address)
            })
            .collect()
    }

    #[test]
    fn test_instruction_fetches_without_conflict() {
        let mut hierarchy =
            CacheHierarchy::make(l1(1), None, WritePolicy::WriteThrough);
        let hits: Vec<bool> = replay(&mut hierarchy, &[(2, 0x0), (2, 0x20), (2, 0x0)])
            .iter()
            .map(|outcome| outcome.l1.hit)
            .collect();
        assert_eq!(hits, vec![false, false, true]);

        let history = hierarchy.history();
        assert_eq!(history.instruction.num_hit, 1);
        assert_eq!(history.instruction.num_miss, 2);
        assert_eq!(history.data, CacheHistory::default());
        assert_eq!(history.shared, None);
    }

    #[test]
    fn test_data_reads_with_conflict() {
        let mut hierarchy =
            CacheHierarchy::make(l1(1), None, WritePolicy::WriteThrough);
        let hits: Vec<bool> = replay(&mut hierarchy, &[(0, 0x0), (0, 0x400), (0, 0x0)])
            .iter()
            .map(|outcome| outcome.l1.hit)
            .collect();
        assert_eq!(hits, vec![false, false, false]);
        assert_eq!(hierarchy.history().data.num_miss, 3);
        assert_eq!(hierarchy.history().instruction.total_accesses(), 0);
    }

    #[test]
    fn test_single_level_never_forwards() {
        let mut hierarchy =
            CacheHierarchy::make(l1(2), None, WritePolicy::WriteBack);
        let outcome = hierarchy.access(AccessClass::DataWrite, 0x1234);
        assert!(!outcome.l1.hit);
        assert_eq!(outcome.l2, None);
        assert!(!hierarchy.is_two_level());
    }

    #[test]
    fn test_l1_and_l2_miss_counted_once_each() {
        let mut hierarchy =
            CacheHierarchy::make(l1(2), Some(l2(4)), WritePolicy::WriteBack);
        let outcome = hierarchy.access(AccessClass::DataRead, 0x8000);
        assert!(!outcome.l1.hit);
        assert_eq!(outcome.l2.map(|l2| l2.hit), Some(false));

        let history = hierarchy.history();
        assert_eq!(history.data.num_miss, 1);
        let shared = history.shared.unwrap();
        assert_eq!(shared.num_miss, 1);
        assert_eq!(shared.num_hit, 0);
    }

    #[test]
    fn test_l1_hit_leaves_l2_alone() {
        let mut hierarchy =
            CacheHierarchy::make(l1(2), Some(l2(4)), WritePolicy::WriteBack);
        hierarchy.access(AccessClass::InstructionFetch, 0x100);
        let before = hierarchy.history().shared;

        let outcome = hierarchy.access(AccessClass::InstructionFetch, 0x104);
        assert!(outcome.l1.hit);
        assert_eq!(outcome.l2, None);
        assert_eq!(hierarchy.history().shared, before);
    }

    #[test]
    fn test_streams_share_l2() {
        let mut hierarchy =
            CacheHierarchy::make(l1(1), Some(l2(1)), WritePolicy::WriteBack);
        // The fetch brings the block into L2, so the data read of the
        // same address hits there after missing its own L1
        hierarchy.access(AccessClass::InstructionFetch, 0x2000);
        let outcome = hierarchy.access(AccessClass::DataRead, 0x2000);
        assert!(!outcome.l1.hit);
        assert_eq!(outcome.l2.map(|l2| l2.hit), Some(true));

        let history = hierarchy.history();
        assert_eq!(history.instruction.num_miss, 1);
        assert_eq!(history.data.num_miss, 1);
        assert_eq!(
            history.shared,
            Some(CacheHistory {
                num_hit: 1,
                num_miss: 1,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_interleaving_order_drives_shared_lru() {
        // One-set, two-way L2: 256 bytes of 128-byte blocks
        let shared = CacheGeometry::new(256, 128, 2).unwrap();
        let mut hierarchy =
            CacheHierarchy::make(l1(1), Some(shared), WritePolicy::WriteThrough);

        hierarchy.access(AccessClass::InstructionFetch, 0x0);
        hierarchy.access(AccessClass::DataRead, 0x80);
        // Refresh 0x0 in L2 through the data side
        let outcome = hierarchy.access(AccessClass::DataRead, 0x0);
        assert_eq!(outcome.l2.map(|l2| l2.hit), Some(true));
        // A third block now displaces 0x80, the stale one
        let outcome = hierarchy.access(AccessClass::InstructionFetch, 0x100);
        assert_eq!(outcome.l2.and_then(|l2| l2.evicted), Some(0x80));
    }

    #[test]
    fn test_write_is_forwarded_as_write() {
        let mut hierarchy =
            CacheHierarchy::make(l1(1), Some(l2(1)), WritePolicy::WriteBack);
        hierarchy.access(AccessClass::DataWrite, 0x0);
        let shared = hierarchy.shared_cache.as_ref().unwrap();
        let i = shared.lookup(0x0).unwrap();
        assert!(shared.blocks()[i].dirty);

        // Instruction fetches never dirty anything
        hierarchy.access(AccessClass::InstructionFetch, 0x4000);
        let shared = hierarchy.shared_cache.as_ref().unwrap();
        let i = shared.lookup(0x4000).unwrap();
        assert!(!shared.blocks()[i].dirty);
    }
}
