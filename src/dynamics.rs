//! First-order form of the equations of motion.
//!
//! The phase state is `[x, y, z, vx, vy, vz]`; its derivative is
//! `[vx, vy, vz, ax, ay, az]` with the acceleration summed from one gravity
//! and one feedback model.

use crate::forces::{FeedbackModel, GravityModel};
use nalgebra::{Vector3, Vector6};
use std::sync::Arc;

/// Integration unit: position followed by velocity
pub type PhaseState = Vector6<f64>;

/// Stacks position and velocity into a phase state
#[inline(always)]
pub fn phase_state(position: &Vector3<f64>, velocity: &Vector3<f64>) -> PhaseState {
    Vector6::new(
        position.x, position.y, position.z, velocity.x, velocity.y, velocity.z,
    )
}

#[inline(always)]
pub fn position_of(state: &PhaseState) -> Vector3<f64> {
    state.fixed_rows::<3>(0).into_owned()
}

#[inline(always)]
pub fn velocity_of(state: &PhaseState) -> Vector3<f64> {
    state.fixed_rows::<3>(3).into_owned()
}

/// Time derivative of `state` under `gravity` and `feedback`
pub fn derivative(
    t: f64,
    state: &PhaseState,
    gravity: &dyn GravityModel,
    feedback: &dyn FeedbackModel,
) -> PhaseState {
    let position = position_of(state);
    let velocity = velocity_of(state);

    let a_f = feedback.acceleration(t, &position);
    let a_g = gravity.acceleration(&position);

    phase_state(&velocity, &(a_g + a_f))
}

/// A right-hand side `dy/dt = f(t, y)` over the phase state
pub trait OdeSystem {
    fn rhs(&self, t: f64, y: &PhaseState) -> PhaseState;
}

impl<F> OdeSystem for F
where
    F: Fn(f64, &PhaseState) -> PhaseState,
{
    fn rhs(&self, t: f64, y: &PhaseState) -> PhaseState {
        self(t, y)
    }
}

/// Gravity and feedback composed into one right-hand side
#[derive(Clone)]
pub struct TrajectoryDynamics {
    gravity: Arc<dyn GravityModel>,
    feedback: Arc<dyn FeedbackModel>,
}

impl TrajectoryDynamics {
    pub fn new(gravity: Arc<dyn GravityModel>, feedback: Arc<dyn FeedbackModel>) -> Self {
        Self { gravity, feedback }
    }
}

impl OdeSystem for TrajectoryDynamics {
    fn rhs(&self, t: f64, y: &PhaseState) -> PhaseState {
        derivative(t, y, self.gravity.as_ref(), self.feedback.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::{ConstantFeedback, LinearFeedback, NoGravity, SquaredPotential};

    #[test]
    fn test_derivative_splits_state() {
        let gravity = SquaredPotential::isotropic(1.0);
        let feedback = ConstantFeedback::new(Vector3::new(0.0, 0.0, 0.5));
        let y = PhaseState::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);

        let dy = derivative(0.0, &y, &gravity, &feedback);
        assert_eq!(dy, PhaseState::new(4.0, 5.0, 6.0, -1.0, -2.0, -2.5));
    }

    #[test]
    fn test_derivative_is_pure() {
        let dynamics = TrajectoryDynamics::new(
            Arc::new(SquaredPotential::new(Vector3::new(0.3, 0.7, 1.1))),
            Arc::new(LinearFeedback::new(
                Vector3::new(0.1, -0.2, 0.3),
                Vector3::new(0.01, 0.02, -0.03),
            )),
        );
        let y = PhaseState::new(0.123, -4.56, 7.89, 0.1, 0.2, -0.3);

        let first = dynamics.rhs(3.7, &y);
        // evaluations at other times must not leak into later calls
        let _ = dynamics.rhs(-100.0, &(y * 2.0));
        let _ = dynamics.rhs(1e6, &y);
        let second = dynamics.rhs(3.7, &y);

        assert_eq!(first.as_slice(), second.as_slice());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_closure_is_an_ode_system() {
        let thrust = ConstantFeedback::new(Vector3::new(0.0, 0.0, -1.0));
        let free_fall = |_t: f64, y: &PhaseState| derivative(0.0, y, &NoGravity, &thrust);
        let dy = free_fall.rhs(0.0, &PhaseState::zeros());
        assert_eq!(dy[5], -1.0);
    }

    #[test]
    fn test_phase_state_round_trip_components() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        let v = Vector3::new(-1.0, -2.0, -3.0);
        let y = phase_state(&p, &v);
        assert_eq!(position_of(&y), p);
        assert_eq!(velocity_of(&y), v);
    }
}
