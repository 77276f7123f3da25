//! Hit/miss bookkeeping and the AMAT formulas built on top of it

/// Raw counters recorded by one cache
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct CacheHistory {
    pub num_hit: u64,
    pub num_miss: u64,
    /// Dirty blocks written to the next level on eviction
    pub num_write_back: u64,
    /// Writes forwarded to the next level by write-through
    pub num_memory_write: u64,
}

impl CacheHistory {
    pub fn total_accesses(&self) -> u64 {
        self.num_hit + self.num_miss
    }

    /// `None` when the cache has not seen any access
    pub fn miss_rate(&self) -> Option<f64> {
        match self.total_accesses() {
            0 => None,
            total => Some(self.num_miss as f64 / total as f64),
        }
    }

    pub fn hit_rate(&self) -> Option<f64> {
        self.miss_rate().map(|rate| 1.0 - rate)
    }
}

/// Latencies of one level, in cycles
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelTiming {
    pub hit_time: f64,
    pub miss_penalty: f64,
}

impl LevelTiming {
    pub fn new(hit_time: f64, miss_penalty: f64) -> Self {
        Self {
            hit_time,
            miss_penalty,
        }
    }
}

/// `hit_time + miss_rate * miss_penalty`
pub fn amat(history: &CacheHistory, timing: LevelTiming) -> Option<f64> {
    history
        .miss_rate()
        .map(|rate| timing.hit_time + rate * timing.miss_penalty)
}

/// `L1 hit + L1 miss rate * (L2 hit + L2 miss rate * L2 penalty)`.
///
/// An L2 that was never reached contributes its hit time only, since no
/// L1 miss ever paid for it.
pub fn two_level_amat(
    l1: &CacheHistory,
    l1_timing: LevelTiming,
    l2: &CacheHistory,
    l2_timing: LevelTiming,
) -> Option<f64> {
    let l1_miss_rate = l1.miss_rate()?;
    let l2_cost = amat(l2, l2_timing).unwrap_or(l2_timing.hit_time);
    Some(l1_timing.hit_time + l1_miss_rate * l2_cost)
}

/// Access-count weighted mean of per-stream AMATs.
/// Streams without data are skipped; `None` if every stream is empty.
pub fn combined_amat(streams: &[(u64, Option<f64>)]) -> Option<f64> {
    let (weighted, total) = streams
        .iter()
        .filter_map(|(count, amat)| amat.map(|amat| (*count, amat)))
        .fold((0.0, 0u64), |(sum, total), (count, amat)| {
            (sum + amat * count as f64, total + count)
        });
    if total == 0 {
        None
    } else {
        Some(weighted / total as f64)
    }
}

/// Render an optional metric the way the reports print it
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.2}", value),
        None => String::from("n/a"),
    }
}
