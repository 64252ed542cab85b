//! Scenario files.
//!
//! A batch file is JSON holding a list of scenarios and an output
//! directory:
//!
//! ```json
//! {
//!   "output_dir": "scenario_data",
//!   "scenarios": [
//!     {
//!       "name": "pulsed_disk",
//!       "initial_position": [1.0, 0.0, 0.0],
//!       "initial_velocity": [0.0, 1.0, 0.0],
//!       "t_span": [0.0, 100.0],
//!       "t_eval": { "start": 0.0, "stop": 100.0, "num": 1001 },
//!       "potential": { "name": "MiyamotoNagai" },
//!       "feedback": {
//!         "name": "pulsed_feedback",
//!         "params": {
//!           "a_0": [[0.0, 0.0, 1.0], [0.0, 0.0, -2.0]],
//!           "t_pulse": [20.0, 50.0],
//!           "sigma_t": [10.0, 20.0]
//!         }
//!       },
//!       "observation": {
//!         "times": [10.0, 20.0, 30.0],
//!         "noise_std": [0.01, 0.01, 0.01, 0.0, 0.0, 0.0],
//!         "seed": 42
//!       }
//!     }
//!   ]
//! }
//! ```
//!
//! `t_eval` and observation times are either an explicit list or a
//! `{ start, stop, num }` grid. `tolerances` may override the default
//! `rtol` / `atol`, and `max_step` caps the integrator's step size.

use crate::error::{ClusterChainError, Result};
use crate::integrator::{IntegratorConfig, Tolerances, Trajectory};
use crate::observe::{observe_single_object, Observation};
use crate::params::ModelParams;
use crate::registry::{FeedbackSelector, PotentialSelector};
use crate::solve::solve_with_config;
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// A list of times, given explicitly or as an evenly spaced grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeGrid {
    Explicit(Vec<f64>),
    Linspace { start: f64, stop: f64, num: usize },
}

impl TimeGrid {
    pub fn times(&self) -> Vec<f64> {
        match *self {
            TimeGrid::Explicit(ref times) => times.clone(),
            TimeGrid::Linspace { start, stop, num } => match num {
                0 => Vec::new(),
                1 => vec![start],
                _ => {
                    let step = (stop - start) / (num - 1) as f64;
                    // pin the last point so it equals `stop` exactly
                    (0..num)
                        .map(|i| if i == num - 1 { stop } else { start + step * i as f64 })
                        .collect()
                }
            },
        }
    }
}

/// A model chosen by name together with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    #[serde(default)]
    pub params: ModelParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationConfig {
    pub times: TimeGrid,
    #[serde(default)]
    pub noise_std: [f64; 6],
    /// Fixed seed for reproducible noise; drawn from the OS when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// One single-object run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub initial_position: [f64; 3],
    pub initial_velocity: [f64; 3],
    pub t_span: [f64; 2],
    #[serde(default)]
    pub t_eval: Option<TimeGrid>,
    pub potential: ModelSpec,
    pub feedback: ModelSpec,
    #[serde(default)]
    pub observation: Option<ObservationConfig>,
    #[serde(default)]
    pub tolerances: Option<Tolerances>,
    #[serde(default)]
    pub max_step: Option<f64>,
}

/// What a scenario produced
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub name: String,
    pub trajectory: Trajectory,
    pub observation: Option<Observation>,
    /// Seconds spent integrating and observing
    pub wall_time: f64,
}

impl ScenarioConfig {
    pub fn integrator_config(&self) -> IntegratorConfig {
        let mut config = IntegratorConfig::with_tolerances(self.tolerances.unwrap_or_default());
        if let Some(max_step) = self.max_step {
            config.max_step = max_step;
        }
        if self.observation.is_some() {
            config = config.dense();
        }
        config
    }

    /// Resolves the models, integrates and, when configured, observes
    pub fn run(&self) -> Result<ScenarioOutcome> {
        let start = Instant::now();
        let t_eval = self.t_eval.as_ref().map(TimeGrid::times);
        let potential_params =
            (!self.potential.params.is_empty()).then_some(&self.potential.params);

        let trajectory = solve_with_config(
            Vector3::from(self.initial_position),
            Vector3::from(self.initial_velocity),
            (self.t_span[0], self.t_span[1]),
            t_eval.as_deref(),
            &FeedbackSelector::named(self.feedback.name.as_str()),
            &PotentialSelector::named(self.potential.name.as_str()),
            &self.feedback.params,
            potential_params,
            &self.integrator_config(),
        )?;

        let observation = match &self.observation {
            Some(obs) if trajectory.success() => {
                let times = obs.times.times();
                let mut rng = match obs.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                let noise = &obs.noise_std;
                Some(observe_single_object(&trajectory, &times, noise, None, None, &mut rng)?)
            }
            Some(_) => {
                log::warn!("Skipping observation of '{}': integration failed", self.name);
                None
            }
            None => None,
        };

        Ok(ScenarioOutcome {
            name: self.name.clone(),
            trajectory,
            observation,
            wall_time: start.elapsed().as_secs_f64(),
        })
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("scenario_data")
}

/// A set of scenarios sharing one output directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub scenarios: Vec<ScenarioConfig>,
}

impl BatchConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let batch: BatchConfig = serde_json::from_reader(BufReader::new(file))?;
        if batch.scenarios.is_empty() {
            return Err(ClusterChainError::invalid(format!(
                "{} contains no scenarios",
                path.display()
            )));
        }
        log::info!(
            "Loaded {} scenario(s) from {}",
            batch.scenarios.len(),
            path.display()
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "name": "well",
        "initial_position": [1.0, 0.0, 0.0],
        "initial_velocity": [0.0, 0.0, 0.0],
        "t_span": [0.0, 3.0],
        "t_eval": {"start": 0.0, "stop": 3.0, "num": 4},
        "potential": {"name": "squared_potential_force", "params": {"a_0": [1.0, 1.0, 1.0]}},
        "feedback": {"name": "constant", "params": {"a_0": [0.0, 0.0, 0.0]}}
    }"#;

    #[test]
    fn test_linspace_grid() {
        let grid = TimeGrid::Linspace {
            start: 0.0,
            stop: 1.0,
            num: 5,
        };
        assert_eq!(grid.times(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        let single = TimeGrid::Linspace {
            start: 2.0,
            stop: 9.0,
            num: 1,
        };
        assert_eq!(single.times(), vec![2.0]);
    }

    #[test]
    fn test_time_grid_parses_both_forms() {
        let explicit: TimeGrid = serde_json::from_str("[0.0, 1.5, 2.0]").unwrap();
        assert_eq!(explicit, TimeGrid::Explicit(vec![0.0, 1.5, 2.0]));
        let grid: TimeGrid = serde_json::from_str(r#"{"start": 0, "stop": 1, "num": 3}"#).unwrap();
        assert_eq!(grid.times(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_scenario_defaults() {
        let scenario: ScenarioConfig = serde_json::from_str(SCENARIO).unwrap();
        assert!(scenario.observation.is_none());
        assert!(scenario.tolerances.is_none());
        let config = scenario.integrator_config();
        assert_eq!(config.tolerances, Tolerances::default());
        assert_eq!(config.max_step, f64::INFINITY);
        assert!(!config.dense_output);
    }

    #[test]
    fn test_scenario_max_step_limits_steps() {
        let mut scenario: ScenarioConfig = serde_json::from_str(SCENARIO).unwrap();
        scenario.t_eval = None;
        let free = scenario.run().unwrap();

        scenario.max_step = Some(0.01);
        assert_eq!(scenario.integrator_config().max_step, 0.01);
        let capped = scenario.run().unwrap();
        assert!(capped.trajectory.success());
        assert!(capped.trajectory.accepted_steps >= 300);
        assert!(capped.trajectory.accepted_steps > free.trajectory.accepted_steps);
        for pair in capped.trajectory.t.windows(2) {
            assert!(pair[1] - pair[0] <= 0.01 + 1e-12);
        }
    }

    #[test]
    fn test_scenario_runs_harmonic_well() {
        let scenario: ScenarioConfig = serde_json::from_str(SCENARIO).unwrap();
        let outcome = scenario.run().unwrap();
        assert!(outcome.trajectory.success());
        assert_eq!(outcome.trajectory.t, vec![0.0, 1.0, 2.0, 3.0]);
        for (t, p) in outcome.trajectory.t.iter().zip(outcome.trajectory.positions()) {
            assert!((p.x - t.cos()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_batch_round_trip() {
        let scenario: ScenarioConfig = serde_json::from_str(SCENARIO).unwrap();
        let batch = BatchConfig {
            output_dir: PathBuf::from("out"),
            scenarios: vec![scenario],
        };
        let text = serde_json::to_string(&batch).unwrap();
        let parsed: BatchConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, batch);
    }

    #[test]
    fn test_batch_default_output_dir() {
        let text = format!(r#"{{"scenarios": [{SCENARIO}]}}"#);
        let batch: BatchConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(batch.output_dir, PathBuf::from("scenario_data"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = BatchConfig::from_file("/nonexistent/cluster-chain/batch.json");
        assert!(matches!(err, Err(ClusterChainError::Io(_))));
    }
}
