//! Feedback acceleration profiles
//!
//! The free functions are the raw profiles; the structs bind their
//! parameters once so the integrator only supplies time and position.

use super::FeedbackModel;
use crate::error::{ClusterChainError, Result};
use nalgebra::Vector3;

/// Time and position invariant feedback
#[inline(always)]
pub fn constant_feedback(_t: f64, _position: &Vector3<f64>, a_0: &Vector3<f64>) -> Vector3<f64> {
    *a_0
}

/// Feedback growing linearly in time: `a_0 + a_1 t`
#[inline(always)]
pub fn linear_feedback(
    t: f64,
    _position: &Vector3<f64>,
    a_0: &Vector3<f64>,
    a_1: &Vector3<f64>,
) -> Vector3<f64> {
    a_0 + a_1 * t
}

/// Linear feedback that switches off per axis instead of reversing.
///
/// Component `i` follows `a_0[i] + a_1[i] t` until it would point against
/// `a_0[i]`; from then on it is zero. Axes with `a_0[i] == 0` have no
/// initial direction and pass the linear value through.
pub fn linear_feedback_no_sign_flip(
    t: f64,
    position: &Vector3<f64>,
    a_0: &Vector3<f64>,
    a_1: &Vector3<f64>,
) -> Vector3<f64> {
    let a = linear_feedback(t, position, a_0, a_1);
    a.zip_map(a_0, |value, initial| {
        if initial == 0.0 || value * initial > 0.0 {
            value
        } else {
            0.0
        }
    })
}

/// A single Gaussian burst in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    /// Acceleration at the peak of the pulse
    pub amplitude: Vector3<f64>,
    /// Time of the peak
    pub t_pulse: f64,
    /// Standard deviation of the pulse in time
    pub sigma_t: f64,
}

impl Pulse {
    pub fn new(amplitude: Vector3<f64>, t_pulse: f64, sigma_t: f64) -> Self {
        Self {
            amplitude,
            t_pulse,
            sigma_t,
        }
    }

    #[inline(always)]
    fn envelope(&self, t: f64) -> f64 {
        let dt = t - self.t_pulse;
        (-(dt * dt) / (2.0 * self.sigma_t * self.sigma_t)).exp()
    }
}

/// Sum of Gaussian pulses: `Σ a_0[i] exp(-(t - t_pulse[i])² / (2 sigma_t[i]²))`
pub fn pulsed_feedback(t: f64, _position: &Vector3<f64>, pulses: &[Pulse]) -> Vector3<f64> {
    pulses
        .iter()
        .map(|pulse| pulse.amplitude * pulse.envelope(t))
        .fold(Vector3::zeros(), |acc, a| acc + a)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantFeedback {
    pub a_0: Vector3<f64>,
}

impl ConstantFeedback {
    pub fn new(a_0: Vector3<f64>) -> Self {
        Self { a_0 }
    }
}

impl FeedbackModel for ConstantFeedback {
    fn acceleration(&self, t: f64, position: &Vector3<f64>) -> Vector3<f64> {
        constant_feedback(t, position, &self.a_0)
    }

    fn name(&self) -> &str {
        "constant_feedback"
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFeedback {
    pub a_0: Vector3<f64>,
    pub a_1: Vector3<f64>,
}

impl LinearFeedback {
    pub fn new(a_0: Vector3<f64>, a_1: Vector3<f64>) -> Self {
        Self { a_0, a_1 }
    }
}

impl FeedbackModel for LinearFeedback {
    fn acceleration(&self, t: f64, position: &Vector3<f64>) -> Vector3<f64> {
        linear_feedback(t, position, &self.a_0, &self.a_1)
    }

    fn name(&self) -> &str {
        "linear_feedback"
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFeedbackNoSignFlip {
    pub a_0: Vector3<f64>,
    pub a_1: Vector3<f64>,
}

impl LinearFeedbackNoSignFlip {
    pub fn new(a_0: Vector3<f64>, a_1: Vector3<f64>) -> Self {
        Self { a_0, a_1 }
    }
}

impl FeedbackModel for LinearFeedbackNoSignFlip {
    fn acceleration(&self, t: f64, position: &Vector3<f64>) -> Vector3<f64> {
        linear_feedback_no_sign_flip(t, position, &self.a_0, &self.a_1)
    }

    fn name(&self) -> &str {
        "linear_feedback_no_sign_flip"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PulsedFeedback {
    pulses: Vec<Pulse>,
}

impl PulsedFeedback {
    pub fn new(pulses: Vec<Pulse>) -> Result<Self> {
        if let Some(bad) = pulses
            .iter()
            .find(|p| !(p.sigma_t.is_finite() && p.sigma_t > 0.0))
        {
            return Err(ClusterChainError::invalid(format!(
                "pulse width must be positive and finite, got {}",
                bad.sigma_t
            )));
        }
        Ok(Self { pulses })
    }

    /// Builds pulses from parallel arrays of amplitudes, centers and widths
    pub fn from_arrays(a_0: &[Vector3<f64>], t_pulse: &[f64], sigma_t: &[f64]) -> Result<Self> {
        if a_0.len() != t_pulse.len() || a_0.len() != sigma_t.len() {
            return Err(ClusterChainError::invalid(format!(
                "pulse arrays differ in length: a_0 has {}, t_pulse has {}, sigma_t has {}",
                a_0.len(),
                t_pulse.len(),
                sigma_t.len()
            )));
        }
        let pulses = itertools::izip!(a_0, t_pulse, sigma_t)
            .map(|(amplitude, &t, &sigma)| Pulse::new(*amplitude, t, sigma))
            .collect();
        Self::new(pulses)
    }
}

impl FeedbackModel for PulsedFeedback {
    fn acceleration(&self, t: f64, position: &Vector3<f64>) -> Vector3<f64> {
        pulsed_feedback(t, position, &self.pulses)
    }

    fn name(&self) -> &str {
        "pulsed_feedback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_constant_feedback_ignores_time_and_position() {
        let a_0 = Vector3::new(0.0, 0.0, -1.0);
        let model = ConstantFeedback::new(a_0);
        for (t, p) in [
            (0.0, Vector3::zeros()),
            (1e6, Vector3::new(5.0, -3.0, 2.0)),
            (-42.0, Vector3::new(1e9, 0.0, 0.0)),
        ] {
            assert_eq!(model.acceleration(t, &p), a_0);
        }
    }

    #[test]
    fn test_linear_feedback() {
        let a_0 = Vector3::new(1.0, -2.0, 0.5);
        let a_1 = Vector3::new(0.5, 1.0, -0.25);
        let p = Vector3::zeros();
        assert_eq!(linear_feedback(0.0, &p, &a_0, &a_1), a_0);
        assert_eq!(
            linear_feedback(2.0, &p, &a_0, &a_1),
            Vector3::new(2.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_no_sign_flip_clamps_each_axis() {
        let a_0 = Vector3::new(1.0, -1.0, 2.0);
        let a_1 = Vector3::new(-1.0, -1.0, -0.5);
        let p = Vector3::zeros();

        // before any axis crosses zero the profile is plain linear
        assert_eq!(
            linear_feedback_no_sign_flip(0.5, &p, &a_0, &a_1),
            Vector3::new(0.5, -1.5, 1.75)
        );

        // x reverses at t = 1, z at t = 4; y never decelerates
        assert_eq!(
            linear_feedback_no_sign_flip(2.0, &p, &a_0, &a_1),
            Vector3::new(0.0, -3.0, 1.0)
        );
        assert_eq!(
            linear_feedback_no_sign_flip(10.0, &p, &a_0, &a_1),
            Vector3::new(0.0, -11.0, 0.0)
        );
    }

    #[test]
    fn test_no_sign_flip_passes_through_unset_axes() {
        let a_0 = Vector3::new(0.0, 1.0, 0.0);
        let a_1 = Vector3::new(-1.0, 0.0, 3.0);
        let a = linear_feedback_no_sign_flip(2.0, &Vector3::zeros(), &a_0, &a_1);
        assert_eq!(a, Vector3::new(-2.0, 1.0, 6.0));
    }

    #[test]
    fn test_pulse_peak_equals_amplitude() {
        let amplitude = Vector3::new(0.0, 0.0, 1.0);
        let model = PulsedFeedback::from_arrays(&[amplitude], &[20.0], &[10.0]).unwrap();
        assert_eq!(model.acceleration(20.0, &Vector3::zeros()), amplitude);
    }

    #[test]
    fn test_pulse_width_is_standard_deviation() {
        let model =
            PulsedFeedback::from_arrays(&[Vector3::new(2.0, 0.0, 0.0)], &[0.0], &[3.0]).unwrap();
        let a = model.acceleration(3.0, &Vector3::zeros());
        assert_abs_diff_eq!(a.x, 2.0 * (-0.5f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_pulses_vanish_far_from_centers() {
        let model = PulsedFeedback::from_arrays(
            &[Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, -2.0)],
            &[20.0, 50.0],
            &[1.0, 2.0],
        )
        .unwrap();
        let a = model.acceleration(500.0, &Vector3::zeros());
        assert_abs_diff_eq!(a.norm(), 0.0, epsilon = 1e-300);
        let before = model.acceleration(-500.0, &Vector3::zeros());
        assert_abs_diff_eq!(before.norm(), 0.0, epsilon = 1e-300);
    }

    #[test]
    fn test_pulses_superpose() {
        let model = PulsedFeedback::from_arrays(
            &[Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)],
            &[0.0, 0.0],
            &[1.0, 5.0],
        )
        .unwrap();
        assert_eq!(
            model.acceleration(0.0, &Vector3::zeros()),
            Vector3::new(1.0, 1.0, 0.0)
        );
    }

    #[test]
    fn test_pulse_arrays_must_match() {
        let err = PulsedFeedback::from_arrays(&[Vector3::zeros()], &[1.0, 2.0], &[1.0]);
        assert!(matches!(
            err,
            Err(ClusterChainError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_pulse_width_must_be_positive() {
        let err = PulsedFeedback::from_arrays(&[Vector3::zeros()], &[1.0], &[0.0]);
        assert!(matches!(
            err,
            Err(ClusterChainError::InvalidArgument { .. })
        ));
    }
}
