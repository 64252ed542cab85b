//! Single-object trajectory solves.

use crate::dynamics::{phase_state, TrajectoryDynamics};
use crate::error::Result;
use crate::integrator::{DormandPrince45, Integrator, IntegratorConfig, Trajectory};
use crate::params::ModelParams;
use crate::registry::{resolve_feedback, resolve_potential, FeedbackSelector, PotentialSelector};
use nalgebra::Vector3;
use std::time::Instant;

/// Integrates one object from `initial_position` / `initial_velocity` over
/// `t_span` under the selected potential and feedback.
///
/// Selectors given by name are resolved and bound to their parameters
/// first; an unknown name or a missing parameter is an error. The solver
/// result is returned as-is: a failed integration comes back as a
/// [`Trajectory`] with a failed status, which the caller can turn into an
/// error with [`Trajectory::ensure_success`].
pub fn single_object_solve(
    initial_position: Vector3<f64>,
    initial_velocity: Vector3<f64>,
    t_span: (f64, f64),
    t_eval: Option<&[f64]>,
    feedback: &FeedbackSelector,
    potential: &PotentialSelector,
    feedback_params: &ModelParams,
    potential_params: Option<&ModelParams>,
) -> Result<Trajectory> {
    solve_with_config(
        initial_position,
        initial_velocity,
        t_span,
        t_eval,
        feedback,
        potential,
        feedback_params,
        potential_params,
        &IntegratorConfig::default(),
    )
}

/// [`single_object_solve`] with explicit integrator settings
pub fn solve_with_config(
    initial_position: Vector3<f64>,
    initial_velocity: Vector3<f64>,
    t_span: (f64, f64),
    t_eval: Option<&[f64]>,
    feedback: &FeedbackSelector,
    potential: &PotentialSelector,
    feedback_params: &ModelParams,
    potential_params: Option<&ModelParams>,
    config: &IntegratorConfig,
) -> Result<Trajectory> {
    let gravity = resolve_potential(potential, potential_params)?;
    let feedback = resolve_feedback(feedback, feedback_params)?;
    log::info!(
        "Solving over ({}, {}) with potential '{}' and feedback '{}'",
        t_span.0,
        t_span.1,
        gravity.name(),
        feedback.name()
    );

    let dynamics = TrajectoryDynamics::new(gravity, feedback);
    let y0 = phase_state(&initial_position, &initial_velocity);
    let solver = DormandPrince45::new(config.clone());

    let start = Instant::now();
    let trajectory = solver.solve(&dynamics, t_span, y0, t_eval)?;
    let elapsed = start.elapsed();

    if trajectory.success() {
        log::info!(
            "{} finished in {:.2?}: {} samples, {} evaluations, {} accepted / {} rejected steps",
            solver.name(),
            elapsed,
            trajectory.len(),
            trajectory.nfev,
            trajectory.accepted_steps,
            trajectory.rejected_steps
        );
    } else {
        log::warn!(
            "{} stopped after {} evaluations: {}",
            solver.name(),
            trajectory.nfev,
            trajectory.message
        );
    }
    Ok(trajectory)
}
