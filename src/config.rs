//! Experiment configuration, read from a TOML file
//!
//! ```toml
//! [sim]
//! traces = ["traces/cc.trace"]
//! write_policy = "write_back"
//!
//! [l1]
//! associativity = 2
//!
//! # present only for two-level runs
//! [l2]
//! associativity = 8
//! ```

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::{Table, Value};

use crate::error::{SimulatorError, SimulatorResult};
use crate::memory::{CacheGeometry, CacheHierarchy, WritePolicy};
use crate::stats::LevelTiming;

pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> SimulatorResult<Self> {
        match section {
            Some(value) => Ok(value.clone().try_into()?),
            None => {
                warn!("config section not found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub traces: Vec<PathBuf>,
    pub write_policy: WritePolicy,
}

impl Config for SimConfig {}

/// Geometry and latencies of one cache level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelConfig {
    pub total_size: usize,
    pub block_size: usize,
    pub associativity: usize,
    pub hit_time: f64,
    pub miss_penalty: f64,
}

impl LevelConfig {
    /// 1 KiB, 32-byte blocks, direct-mapped
    pub const L1: LevelConfig = LevelConfig {
        total_size: 1024,
        block_size: 32,
        associativity: 1,
        hit_time: 1.0,
        miss_penalty: 100.0,
    };

    /// 16 KiB, 128-byte blocks, direct-mapped
    pub const L2: LevelConfig = LevelConfig {
        total_size: 16384,
        block_size: 128,
        associativity: 1,
        hit_time: 10.0,
        miss_penalty: 100.0,
    };

    pub fn with_associativity(self, associativity: usize) -> Self {
        Self {
            associativity,
            ..self
        }
    }

    pub fn geometry(&self) -> SimulatorResult<CacheGeometry> {
        Ok(CacheGeometry::new(
            self.total_size,
            self.block_size,
            self.associativity,
        )?)
    }

    pub fn timing(&self) -> LevelTiming {
        LevelTiming::new(self.hit_time, self.miss_penalty)
    }
}

/// A level section as written in the file; missing keys keep the
/// level's defaults
#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default, deny_unknown_fields)]
struct LevelSection {
    total_size: Option<usize>,
    block_size: Option<usize>,
    associativity: Option<usize>,
    hit_time: Option<f64>,
    miss_penalty: Option<f64>,
}

impl Config for LevelSection {}

impl LevelSection {
    fn apply(self, base: LevelConfig) -> LevelConfig {
        LevelConfig {
            total_size: self.total_size.unwrap_or(base.total_size),
            block_size: self.block_size.unwrap_or(base.block_size),
            associativity: self.associativity.unwrap_or(base.associativity),
            hit_time: self.hit_time.unwrap_or(base.hit_time),
            miss_penalty: self.miss_penalty.unwrap_or(base.miss_penalty),
        }
    }
}

/// Everything needed to run one experiment
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub sim: SimConfig,
    /// Shape of both the instruction and the data cache
    pub l1: LevelConfig,
    pub l2: Option<LevelConfig>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            l1: LevelConfig::L1,
            l2: None,
        }
    }
}

impl ExperimentConfig {
    pub fn single_level(l1: LevelConfig, write_policy: WritePolicy) -> Self {
        Self {
            sim: SimConfig {
                traces: Vec::new(),
                write_policy,
            },
            l1,
            l2: None,
        }
    }

    pub fn two_level(
        l1: LevelConfig,
        l2: LevelConfig,
        write_policy: WritePolicy,
    ) -> Self {
        Self {
            l2: Some(l2),
            ..Self::single_level(l1, write_policy)
        }
    }

    pub fn from_toml(text: &str) -> SimulatorResult<Self> {
        let table: Table = toml::from_str(text)?;
        for key in table.keys() {
            if !matches!(key.as_str(), "sim" | "l1" | "l2") {
                return Err(SimulatorError::ConfigError(format!(
                    "unknown section [{}]",
                    key
                )));
            }
        }

        let sim = SimConfig::from_section(table.get("sim"))?;
        let l1 = LevelSection::from_section(table.get("l1"))?.apply(LevelConfig::L1);
        let l2 = match table.get("l2") {
            Some(section) => Some(
                LevelSection::from_section(Some(section))?.apply(LevelConfig::L2),
            ),
            None => None,
        };

        let config = Self { sim, l1, l2 };
        config.validate()?;
        debug!("loaded {:?}", config);
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimulatorResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    /// Reject geometries and timings that cannot be simulated
    pub fn validate(&self) -> SimulatorResult<()> {
        let levels = std::iter::once(("l1", &self.l1))
            .chain(self.l2.as_ref().map(|l2| ("l2", l2)));
        for (name, level) in levels {
            level.geometry()?;
            if !(level.hit_time >= 0.0 && level.miss_penalty >= 0.0) {
                return Err(SimulatorError::ConfigError(format!(
                    "{}: latencies must be non-negative",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Fresh caches for one run
    pub fn hierarchy(&self) -> SimulatorResult<CacheHierarchy> {
        let l1 = self.l1.geometry()?;
        let l2 = self.l2.as_ref().map(LevelConfig::geometry).transpose()?;
        Ok(CacheHierarchy::make(l1, l2, self.sim.write_policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ExperimentConfig::from_toml("").unwrap();
        assert_eq!(config, ExperimentConfig::default());
        assert_eq!(config.sim.write_policy, WritePolicy::WriteThrough);
        assert!(!config.hierarchy().unwrap().is_two_level());
    }

    #[test]
    fn test_partial_sections_keep_level_defaults() {
        let config = ExperimentConfig::from_toml(
            r#"
            [sim]
            traces = ["traces/cc.trace", "traces/tex.trace"]
            write_policy = "write_back"

            [l1]
            associativity = 2

            [l2]
            associativity = 8
            hit_time = 12.0
            "#,
        )
        .unwrap();
        assert_eq!(config.sim.traces.len(), 2);
        assert_eq!(config.sim.write_policy, WritePolicy::WriteBack);
        assert_eq!(config.l1, LevelConfig::L1.with_associativity(2));
        let l2 = config.l2.unwrap();
        assert_eq!(l2.total_size, 16384);
        assert_eq!(l2.block_size, 128);
        assert_eq!(l2.associativity, 8);
        assert_eq!(l2.hit_time, 12.0);
        assert!(config.hierarchy().unwrap().is_two_level());
    }

    #[test]
    fn test_invalid_geometry_is_rejected() {
        let result = ExperimentConfig::from_toml("[l1]\nassociativity = 3\n");
        assert!(matches!(
            result,
            Err(SimulatorError::GeometryError(GeometryError::NotPowerOfTwo {
                field: "associativity",
                value: 3
            }))
        ));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(matches!(
            ExperimentConfig::from_toml("[l3]\nassociativity = 2\n"),
            Err(SimulatorError::ConfigError(_))
        ));
        assert!(matches!(
            ExperimentConfig::from_toml("[l1]\nways = 2\n"),
            Err(SimulatorError::TomlError(_))
        ));
        assert!(matches!(
            ExperimentConfig::from_toml("[sim]\nwrite_policy = \"write_around\"\n"),
            Err(SimulatorError::TomlError(_))
        ));
    }

    #[test]
    fn test_negative_latency_is_rejected() {
        assert!(matches!(
            ExperimentConfig::from_toml("[l1]\nmiss_penalty = -1.0\n"),
            Err(SimulatorError::ConfigError(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sim]\nwrite_policy = \"write_back\"").unwrap();
        let config = ExperimentConfig::from_path(file.path()).unwrap();
        assert_eq!(config.sim.write_policy, WritePolicy::WriteBack);
    }
}
