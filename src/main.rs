use clap::Parser;
use cluster_chain::forces::galactic;
use cluster_chain::config::{BatchConfig, ScenarioConfig};
use cluster_chain::experiment::{
    export_observation, export_phase_slice, export_run_record, export_trajectory, RunRecord,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Integrates single-object trajectories described in a batch file
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON batch file with the scenarios to run
    #[arg(short, long)]
    config: PathBuf,

    /// Overrides the batch file's output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn run_scenario(scenario: &ScenarioConfig, output_dir: &Path) -> cluster_chain::Result<RunRecord> {
    let outcome = scenario.run()?;
    let name = &scenario.name;

    export_trajectory(&outcome.trajectory, output_dir.join(format!("{name}.csv")))?;
    export_phase_slice(&outcome.trajectory, 2, output_dir, &format!("{name}_"))?;
    if let Some(observation) = &outcome.observation {
        export_observation(observation, output_dir.join(format!("{name}_observation.csv")))?;
    }
    if !outcome.trajectory.success() {
        log::warn!("Scenario '{}': {}", name, outcome.trajectory.message);
    }
    RunRecord::new(scenario, &outcome)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if !galactic::is_available() {
        log::warn!(
            "Built without the `galactic` feature; {} are unavailable",
            galactic::POTENTIAL_NAMES.join(", ")
        );
    }

    let batch = BatchConfig::from_file(&args.config)?;
    let output_dir = args.output_dir.unwrap_or_else(|| batch.output_dir.clone());
    fs::create_dir_all(&output_dir)?;

    let pb = ProgressBar::new(batch.scenarios.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let results: Vec<_> = batch
        .scenarios
        .par_iter()
        .map(|scenario| {
            let result = run_scenario(scenario, &output_dir);
            pb.inc(1);
            (scenario.name.as_str(), result)
        })
        .collect();
    pb.finish_with_message("Scenarios complete");

    // the run log is appended from one thread only
    let log_path = output_dir.join("runs.csv");
    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(record) => export_run_record(&record, &log_path)?,
            Err(e) => {
                log::error!("Scenario '{}' failed: {}", name, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} scenarios failed", batch.scenarios.len()).into());
    }
    log::info!("Wrote results to {}", output_dir.display());
    Ok(())
}
