//! Synthetic observations of an integrated trajectory.

use crate::dynamics::{position_of, velocity_of};
use crate::error::{ClusterChainError, Result};
use crate::integrator::Trajectory;
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::Normal;
use serde::Serialize;

/// Maps a true position or velocity to the observed quantity
pub type Response<'a> = &'a dyn Fn(&Vector3<f64>) -> Vector3<f64>;

/// Noisy samples of a trajectory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub times: Vec<f64>,
    pub positions: Vec<Vector3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
}

fn noise_samplers(noise_std: &[f64; 6]) -> Result<Vec<Option<Normal<f64>>>> {
    noise_std
        .iter()
        .enumerate()
        .map(|(i, &std)| {
            if !(std.is_finite() && std >= 0.0) {
                return Err(ClusterChainError::invalid(format!(
                    "noise standard deviation {i} must be finite and non-negative, got {std}"
                )));
            }
            if std == 0.0 {
                return Ok(None);
            }
            Normal::new(0.0, std)
                .map(Some)
                .map_err(|e| ClusterChainError::invalid(format!("noise component {i}: {e}")))
        })
        .collect()
}

/// Observes `trajectory` at `observation_times`.
///
/// The dense solution is evaluated at each time, the optional response
/// functions are applied to position and velocity, and independent Gaussian
/// noise with the per-component standard deviations in `noise_std`
/// (`[x, y, z, vx, vy, vz]`, zero for noiseless) is added.
pub fn observe_single_object<R: Rng>(
    trajectory: &Trajectory,
    observation_times: &[f64],
    noise_std: &[f64; 6],
    positional_response: Option<Response<'_>>,
    velocity_response: Option<Response<'_>>,
    rng: &mut R,
) -> Result<Observation> {
    let dense = trajectory.dense.as_ref().ok_or_else(|| {
        ClusterChainError::invalid("observing a trajectory requires dense output")
    })?;
    let samplers = noise_samplers(noise_std)?;

    let mut observation = Observation {
        times: observation_times.to_vec(),
        positions: Vec::with_capacity(observation_times.len()),
        velocities: Vec::with_capacity(observation_times.len()),
    };

    for &t in observation_times {
        let state = dense.eval(t).ok_or_else(|| {
            ClusterChainError::invalid(format!(
                "observation time {t} lies outside the integrated span"
            ))
        })?;
        let mut position = position_of(&state);
        let mut velocity = velocity_of(&state);
        if let Some(response) = positional_response {
            position = response(&position);
        }
        if let Some(response) = velocity_response {
            velocity = response(&velocity);
        }

        for (i, sampler) in samplers.iter().enumerate() {
            if let Some(normal) = sampler {
                let noise = rng.sample(normal);
                if i < 3 {
                    position[i] += noise;
                } else {
                    velocity[i - 3] += noise;
                }
            }
        }
        observation.positions.push(position);
        observation.velocities.push(velocity);
    }
    Ok(observation)
}
