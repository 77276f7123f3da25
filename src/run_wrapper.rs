//! A trace replay wrapper

use std::fmt;
use std::path::Path;

use log::{debug, info};

use crate::config::{ExperimentConfig, LevelConfig};
use crate::error::{SimulatorResult, TraceError};
use crate::memory::{CacheHierarchy, WritePolicy};
use crate::stats::{self, format_metric, CacheHistory};
use crate::trace::{TraceReader, TraceRecord};

/// Associativities swept by the evaluation binaries
pub const ASSOCIATIVITIES: [usize; 6] = [1, 2, 4, 8, 16, 32];

/// Counters and AMAT of one cache after a run
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheReport {
    pub history: CacheHistory,
    pub amat: Option<f64>,
}

impl fmt::Display for CacheReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hits: {}, Misses: {}, AMAT: {} cycles",
            self.history.num_hit,
            self.history.num_miss,
            format_metric(self.amat)
        )?;
        if self.history.num_write_back > 0 {
            write!(f, ", Write-backs: {}", self.history.num_write_back)?;
        }
        if self.history.num_memory_write > 0 {
            write!(f, ", Write-throughs: {}", self.history.num_memory_write)?;
        }
        Ok(())
    }
}

/// Result of replaying one trace through one hierarchy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationReport {
    pub write_policy: WritePolicy,
    pub records: u64,
    pub instruction: CacheReport,
    pub data: CacheReport,
    pub shared: Option<CacheReport>,
    /// Instruction and data AMAT weighted by their access counts
    pub combined_amat: Option<f64>,
}

impl SimulationReport {
    /// Derive the metrics from the counters left in `hierarchy`.
    ///
    /// With an L2, the L1 AMATs include the L2 cost of their misses.
    pub fn make(hierarchy: &CacheHierarchy, config: &ExperimentConfig, records: u64) -> Self {
        let history = hierarchy.history();
        let l1_timing = config.l1.timing();

        let l1_amat = |l1: &CacheHistory| match (&history.shared, &config.l2) {
            (Some(shared), Some(l2)) => {
                stats::two_level_amat(l1, l1_timing, shared, l2.timing())
            }
            _ => stats::amat(l1, l1_timing),
        };

        let instruction = CacheReport {
            history: history.instruction,
            amat: l1_amat(&history.instruction),
        };
        let data = CacheReport {
            history: history.data,
            amat: l1_amat(&history.data),
        };
        let shared = history.shared.zip(config.l2).map(|(shared, l2)| CacheReport {
            history: shared,
            amat: stats::amat(&shared, l2.timing()),
        });

        let combined_amat = stats::combined_amat(&[
            (instruction.history.total_accesses(), instruction.amat),
            (data.history.total_accesses(), data.amat),
        ]);

        Self {
            write_policy: hierarchy.instruction_cache.policy(),
            records,
            instruction,
            data,
            shared,
            combined_amat,
        }
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Instruction Cache - {}", self.instruction)?;
        writeln!(f, "  Data Cache - {}", self.data)?;
        if let Some(shared) = &self.shared {
            writeln!(f, "  L2 Cache - {}", shared)?;
        }
        write!(f, "  Combined AMAT: {} cycles", format_metric(self.combined_amat))
    }
}

/// Feed every record to the hierarchy in order.
/// Stops at the first bad record. Returns the number of records replayed.
pub fn replay<I>(hierarchy: &mut CacheHierarchy, records: I) -> Result<u64, TraceError>
where
    I: IntoIterator<Item = Result<TraceRecord, TraceError>>,
{
    let mut count = 0;
    for record in records {
        let record = record?;
        hierarchy.access(record.class, record.address);
        count += 1;
    }
    Ok(count)
}

/// Replay `records` through fresh caches built from `config`
pub fn run_records<I>(config: &ExperimentConfig, records: I) -> SimulatorResult<SimulationReport>
where
    I: IntoIterator<Item = Result<TraceRecord, TraceError>>,
{
    let mut hierarchy = config.hierarchy()?;
    let count = replay(&mut hierarchy, records)?;
    Ok(SimulationReport::make(&hierarchy, config, count))
}

/// Run simulation on the given trace file
pub fn run_trace(
    config: &ExperimentConfig,
    trace_path: impl AsRef<Path>,
) -> SimulatorResult<SimulationReport> {
    let trace_path = trace_path.as_ref();
    debug!(
        "running {} with {} L1 {:?}, L2 {:?}",
        trace_path.display(),
        config.sim.write_policy,
        config.l1,
        config.l2
    );
    let report = run_records(config, TraceReader::open(trace_path)?)?;
    info!(
        "{}: {} records, combined AMAT {}",
        trace_path.display(),
        report.records,
        format_metric(report.combined_amat)
    );
    Ok(report)
}

/// Split 1 KiB L1 caches of the given associativity
pub fn simulate_cache(
    trace_path: impl AsRef<Path>,
    associativity: usize,
    write_policy: WritePolicy,
) -> SimulatorResult<SimulationReport> {
    let config = ExperimentConfig::single_level(
        LevelConfig::L1.with_associativity(associativity),
        write_policy,
    );
    run_trace(&config, trace_path)
}

/// Split 1 KiB L1 caches backed by a shared 16 KiB L2
pub fn simulate_l1_l2_cache(
    trace_path: impl AsRef<Path>,
    l1_associativity: usize,
    l2_associativity: usize,
    write_policy: WritePolicy,
) -> SimulatorResult<SimulationReport> {
    let config = ExperimentConfig::two_level(
        LevelConfig::L1.with_associativity(l1_associativity),
        LevelConfig::L2.with_associativity(l2_associativity),
        write_policy,
    );
    run_trace(&config, trace_path)
}
