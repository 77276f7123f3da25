use std::path::PathBuf;

use clap::Parser;
use sim_lib::memory::WritePolicy;
use sim_lib::run_wrapper::{simulate_cache, SimulationReport, ASSOCIATIVITIES};
use sim_lib::stats::format_metric;

#[derive(Parser)]
#[command(about = "Sweep L1 associativity for write-through and write-back caches")]
struct EvalArgs {
    #[arg(required = true, help = "Trace files to evaluate")]
    traces: Vec<PathBuf>,
    #[arg(long, default_value = "eval", help = "Directory for the CSV and SVG output")]
    output_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let argv = EvalArgs::parse();
    std::fs::create_dir_all(&argv.output_dir)?;

    let mut writer = csv::Writer::from_path(argv.output_dir.join("single_eval.csv"))?;
    writer.write_record([
        "Trace",
        "Policy",
        "Associativity",
        "I hits",
        "I misses",
        "I AMAT",
        "D hits",
        "D misses",
        "D AMAT",
        "Combined AMAT",
    ])?;

    // One line series per (trace, policy), AMAT against log2(associativity)
    let mut data: Vec<(String, Vec<(i32, f64)>)> = Vec::new();
    let mut y_max: f64 = 0.;
    for trace_path in &argv.traces {
        let trace_base_name = trace_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| trace_path.display().to_string());

        for policy in [WritePolicy::WriteThrough, WritePolicy::WriteBack] {
            println!("Processing {} with {} cache...", trace_path.display(), policy);
            let mut series = Vec::new();
            for (i, associativity) in ASSOCIATIVITIES.iter().enumerate() {
                let report = simulate_cache(trace_path, *associativity, policy)?;
                println!("Associativity: {}", associativity);
                println!("{}", report);
                write_row(&mut writer, &trace_base_name, *associativity, &report)?;

                if let Some(amat) = report.combined_amat {
                    series.push((i as i32, amat));
                    y_max = y_max.max(amat);
                }
            }
            data.push((format!("{} ({})", trace_base_name, policy), series));
        }
    }
    writer.flush()?;

    // Plot the data
    use plotters::prelude::*;

    let output_path = argv.output_dir.join("single_eval.svg");
    let root = SVGBackend::new(&output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption("Single level evaluation (AMAT)", ("sans-serif", 40).into_font())
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(0..ASSOCIATIVITIES.len() as i32 - 1, 0.0..(y_max * 1.1).max(1.0))?;
    ctx.configure_mesh()
        .x_desc("Associativity")
        .y_desc("AMAT")
        .x_label_formatter(&|x| format!("{}", 1usize << *x))
        .draw()?;

    for (i, (label, series)) in data.into_iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        ctx.draw_series(LineSeries::new(series, color))?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color)
            });
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;

    Ok(())
}

fn write_row(
    writer: &mut csv::Writer<std::fs::File>,
    trace: &str,
    associativity: usize,
    report: &SimulationReport,
) -> csv::Result<()> {
    writer.write_record([
        trace.to_string(),
        report.write_policy.to_string(),
        associativity.to_string(),
        report.instruction.history.num_hit.to_string(),
        report.instruction.history.num_miss.to_string(),
        format_metric(report.instruction.amat),
        report.data.history.num_hit.to_string(),
        report.data.history.num_miss.to_string(),
        format_metric(report.data.amat),
        format_metric(report.combined_amat),
    ])
}
