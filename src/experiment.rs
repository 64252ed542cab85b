use crate::config::{ScenarioConfig, ScenarioOutcome};
use crate::error::{ClusterChainError, Result};
use crate::integrator::{DormandPrince45, Integrator, Trajectory};
use crate::observe::Observation;
use chrono::Utc;
use itertools::izip;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// One line of the run log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub date: String,
    pub scenario: String,
    pub potential: String,
    pub potential_params: String,
    pub feedback: String,
    pub feedback_params: String,
    pub initial_position: String,
    pub initial_velocity: String,
    pub t_start: f64,
    pub t_end: f64,
    pub rtol: f64,
    pub atol: f64,
    pub solver: String,
    pub success: bool,
    pub message: String,
    pub n_samples: usize,
    pub nfev: usize,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub execution_duration: f64,
}

impl RunRecord {
    pub fn new(scenario: &ScenarioConfig, outcome: &ScenarioOutcome) -> Result<Self> {
        let trajectory = &outcome.trajectory;
        let tolerances = scenario.integrator_config().tolerances;
        Ok(Self {
            date: Utc::now().to_rfc3339(),
            scenario: scenario.name.clone(),
            potential: scenario.potential.name.clone(),
            potential_params: serde_json::to_string(&scenario.potential.params)?,
            feedback: scenario.feedback.name.clone(),
            feedback_params: serde_json::to_string(&scenario.feedback.params)?,
            initial_position: format!("{:?}", scenario.initial_position),
            initial_velocity: format!("{:?}", scenario.initial_velocity),
            t_start: scenario.t_span[0],
            t_end: scenario.t_span[1],
            rtol: tolerances.rtol,
            atol: tolerances.atol,
            solver: DormandPrince45::default().name(),
            success: trajectory.success(),
            message: trajectory.message.clone(),
            n_samples: trajectory.len(),
            nfev: trajectory.nfev,
            accepted_steps: trajectory.accepted_steps,
            rejected_steps: trajectory.rejected_steps,
            execution_duration: outcome.wall_time,
        })
    }
}

/// Appends `record` to the CSV run log at `path`, writing the header only
/// when the file is new
pub fn export_run_record(record: &RunRecord, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

/// Writes every sample as `t,x,y,z,vx,vy,vz`
pub fn export_trajectory(trajectory: &Trajectory, path: impl AsRef<Path>) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["t", "x", "y", "z", "vx", "vy", "vz"])?;
    for (t, y) in izip!(&trajectory.t, &trajectory.y) {
        let mut row = Vec::with_capacity(7);
        row.push(t.to_string());
        row.extend(y.iter().map(|v| v.to_string()));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the position and velocity along axis `index` (0, 1 or 2) to
/// `{dir}/{name}coord{index}_vs_vel{index}.csv` and returns the path
pub fn export_phase_slice(
    trajectory: &Trajectory,
    index: usize,
    dir: impl AsRef<Path>,
    name: &str,
) -> Result<PathBuf> {
    if index > 2 {
        return Err(ClusterChainError::invalid(format!(
            "axis index must be 0, 1 or 2, got {index}"
        )));
    }
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{name}coord{index}_vs_vel{index}.csv"));

    let mut wtr = csv::Writer::from_path(&path)?;
    wtr.write_record([format!("coord{index}"), format!("vel{index}")])?;
    for (p, v) in izip!(trajectory.positions(), trajectory.velocities()) {
        wtr.write_record([p[index].to_string(), v[index].to_string()])?;
    }
    wtr.flush()?;
    Ok(path)
}

/// Writes observed samples as `t,x,y,z,vx,vy,vz`
pub fn export_observation(observation: &Observation, path: impl AsRef<Path>) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["t", "x", "y", "z", "vx", "vy", "vz"])?;
    for (t, p, v) in izip!(
        &observation.times,
        &observation.positions,
        &observation.velocities
    ) {
        wtr.write_record(&[
            t.to_string(),
            p.x.to_string(),
            p.y.to_string(),
            p.z.to_string(),
            v.x.to_string(),
            v.y.to_string(),
            v.z.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
