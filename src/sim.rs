use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use sim_lib::config::{ExperimentConfig, LevelConfig};
use sim_lib::error::{SimulatorError, SimulatorResult};
use sim_lib::memory::WritePolicy;
use sim_lib::run_wrapper::run_trace;

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    WriteThrough,
    WriteBack,
}

impl From<PolicyArg> for WritePolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::WriteThrough => WritePolicy::WriteThrough,
            PolicyArg::WriteBack => WritePolicy::WriteBack,
        }
    }
}

#[derive(Parser)]
#[command(version, about = "Replay memory traces through a cache hierarchy")]
struct SimArgs {
    #[arg(help = "Trace files to replay, in addition to those in the config")]
    traces: Vec<PathBuf>,
    #[arg(short, long, help = "Path to config.toml")]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, help = "Override the write policy")]
    policy: Option<PolicyArg>,
    #[arg(long, help = "Override L1 associativity")]
    l1_assoc: Option<usize>,
    #[arg(long, help = "Override L2 associativity, adding a default L2 if none is configured")]
    l2_assoc: Option<usize>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run_sim() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_sim() -> SimulatorResult<()> {
    let argv = SimArgs::parse();

    let mut config = match &argv.config {
        Some(path) => ExperimentConfig::from_path(path)?,
        None => ExperimentConfig::default(),
    };

    // override toml configs with argv
    if let Some(policy) = argv.policy {
        config.sim.write_policy = policy.into();
    }
    if let Some(associativity) = argv.l1_assoc {
        config.l1.associativity = associativity;
    }
    if let Some(associativity) = argv.l2_assoc {
        let l2 = config.l2.unwrap_or(LevelConfig::L2);
        config.l2 = Some(l2.with_associativity(associativity));
    }
    config.sim.traces.extend(argv.traces);
    config.validate()?;

    if config.sim.traces.is_empty() {
        return Err(SimulatorError::ConfigError(
            "no trace files given".to_string(),
        ));
    }

    for trace in &config.sim.traces {
        println!(
            "Processing {} with {} cache (L1 associativity {}{})...",
            trace.display(),
            config.sim.write_policy,
            config.l1.associativity,
            config
                .l2
                .map(|l2| format!(", L2 associativity {}", l2.associativity))
                .unwrap_or_default()
        );
        let report = run_trace(&config, trace)?;
        println!("{}", report);
    }

    Ok(())
}
