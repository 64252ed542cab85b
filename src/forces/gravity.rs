//! Analytic gravity models

use super::GravityModel;
use nalgebra::Vector3;

/// Harmonic well with per-axis stiffness: `-a_0 ⊙ position`
#[inline(always)]
pub fn squared_potential_force(position: &Vector3<f64>, a_0: &Vector3<f64>) -> Vector3<f64> {
    -a_0.component_mul(position)
}

/// Parameter-bound form of [`squared_potential_force`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquaredPotential {
    pub a_0: Vector3<f64>,
}

impl SquaredPotential {
    pub fn new(a_0: Vector3<f64>) -> Self {
        Self { a_0 }
    }

    /// Same stiffness along every axis
    pub fn isotropic(stiffness: f64) -> Self {
        Self::new(Vector3::repeat(stiffness))
    }
}

impl GravityModel for SquaredPotential {
    fn acceleration(&self, position: &Vector3<f64>) -> Vector3<f64> {
        squared_potential_force(position, &self.a_0)
    }

    fn name(&self) -> &str {
        "squared_potential_force"
    }
}
