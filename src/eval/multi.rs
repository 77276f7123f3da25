use std::path::PathBuf;

use clap::Parser;
use sim_lib::memory::WritePolicy;
use sim_lib::run_wrapper::{simulate_l1_l2_cache, ASSOCIATIVITIES};
use sim_lib::stats::format_metric;

#[derive(Parser)]
#[command(about = "Sweep L2 associativity for a write-back L1/L2 hierarchy")]
struct EvalArgs {
    #[arg(required = true, help = "Trace files to evaluate")]
    traces: Vec<PathBuf>,
    #[arg(long, default_value_t = 2, help = "Associativity of both L1 caches")]
    l1_assoc: usize,
    #[arg(long, default_value = "eval", help = "Directory for the CSV output")]
    output_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let argv = EvalArgs::parse();
    std::fs::create_dir_all(&argv.output_dir)?;

    let mut writer = csv::Writer::from_path(argv.output_dir.join("multi_eval.csv"))?;
    writer.write_record([
        "Trace",
        "L2 associativity",
        "I hits",
        "I misses",
        "I AMAT",
        "D hits",
        "D misses",
        "D AMAT",
        "L2 hits",
        "L2 misses",
        "L2 write-backs",
        "L2 AMAT",
        "Combined AMAT",
    ])?;

    for trace_path in &argv.traces {
        let trace_base_name = trace_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| trace_path.display().to_string());
        println!("Processing {} with Write-Back & L2 Cache...", trace_path.display());

        for associativity in ASSOCIATIVITIES {
            let report = simulate_l1_l2_cache(
                trace_path,
                argv.l1_assoc,
                associativity,
                WritePolicy::WriteBack,
            )?;
            println!("L2 Associativity: {}", associativity);
            println!("{}", report);

            let shared = report.shared.ok_or("two-level run produced no L2 report")?;
            writer.write_record([
                trace_base_name.clone(),
                associativity.to_string(),
                report.instruction.history.num_hit.to_string(),
                report.instruction.history.num_miss.to_string(),
                format_metric(report.instruction.amat),
                report.data.history.num_hit.to_string(),
                report.data.history.num_miss.to_string(),
                format_metric(report.data.amat),
                shared.history.num_hit.to_string(),
                shared.history.num_miss.to_string(),
                shared.history.num_write_back.to_string(),
                format_metric(shared.amat),
                format_metric(report.combined_amat),
            ])?;
        }
    }
    writer.flush()?;

    Ok(())
}
