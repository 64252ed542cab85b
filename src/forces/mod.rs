//! Force models acting on a single point-mass object.
//!
//! Two kinds of model feed the trajectory derivative:
//!
//! - [`GravityModel`]: position → acceleration, e.g. [`SquaredPotential`]
//!   or one of the cylindrical galactic potentials.
//! - [`FeedbackModel`]: (time, position) → acceleration, e.g.
//!   [`ConstantFeedback`], [`LinearFeedback`] or [`PulsedFeedback`].
//!
//! Every model is parameterized once at construction and is free of hidden
//! state: the adaptive integrator evaluates rejected and out-of-order steps, so
//! an evaluation may only depend on its arguments.

use nalgebra::Vector3;

pub mod feedback;
pub mod galactic;
pub mod gravity;

pub use feedback::{
    constant_feedback, linear_feedback, linear_feedback_no_sign_flip, pulsed_feedback,
    ConstantFeedback, LinearFeedback, LinearFeedbackNoSignFlip, Pulse, PulsedFeedback,
};
pub use galactic::{CylindricalPotential, GalacticGravity};
pub use gravity::{squared_potential_force, SquaredPotential};

/// A conservative acceleration field depending on position only
pub trait GravityModel: Send + Sync {
    /// Acceleration at `position`, in the same unit system as the state
    fn acceleration(&self, position: &Vector3<f64>) -> Vector3<f64>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// A non-gravitational acceleration (winds, supernovae, self-propulsion)
pub trait FeedbackModel: Send + Sync {
    /// Acceleration at time `t` and `position`
    fn acceleration(&self, t: f64, position: &Vector3<f64>) -> Vector3<f64>;

    /// Model name for logging
    fn name(&self) -> &str;
}

/// Gravity model backed by a user closure
pub struct FnGravity<F> {
    name: String,
    func: F,
}

impl<F> FnGravity<F>
where
    F: Fn(&Vector3<f64>) -> Vector3<f64> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> GravityModel for FnGravity<F>
where
    F: Fn(&Vector3<f64>) -> Vector3<f64> + Send + Sync,
{
    fn acceleration(&self, position: &Vector3<f64>) -> Vector3<f64> {
        (self.func)(position)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Feedback model backed by a user closure
pub struct FnFeedback<F> {
    name: String,
    func: F,
}

impl<F> FnFeedback<F>
where
    F: Fn(f64, &Vector3<f64>) -> Vector3<f64> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> FeedbackModel for FnFeedback<F>
where
    F: Fn(f64, &Vector3<f64>) -> Vector3<f64> + Send + Sync,
{
    fn acceleration(&self, t: f64, position: &Vector3<f64>) -> Vector3<f64> {
        (self.func)(t, position)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Gravity-free environment
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGravity;

impl GravityModel for NoGravity {
    fn acceleration(&self, _position: &Vector3<f64>) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_gravity_forwards_to_closure() {
        let model = FnGravity::new("double", |p: &Vector3<f64>| 2.0 * p);
        let accel = model.acceleration(&Vector3::new(1.0, -2.0, 3.0));
        assert_eq!(accel, Vector3::new(2.0, -4.0, 6.0));
        assert_eq!(model.name(), "double");
    }

    #[test]
    fn test_fn_feedback_forwards_time() {
        let model = FnFeedback::new("ramp", |t: f64, _p: &Vector3<f64>| Vector3::new(t, 0.0, 0.0));
        let accel = model.acceleration(4.0, &Vector3::zeros());
        assert_eq!(accel, Vector3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_no_gravity_is_zero() {
        assert_eq!(
            NoGravity.acceleration(&Vector3::new(5.0, 5.0, 5.0)),
            Vector3::zeros()
        );
    }
}
