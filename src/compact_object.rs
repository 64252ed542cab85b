//! Stateful compact objects stepped with a fixed time step.

use crate::error::{ClusterChainError, Result};
use nalgebra::Vector3;
use std::fmt;

/// Variant-specific feedback physics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectKind {
    /// No feedback force, constant mass loss
    StarCluster { mass_loss_rate: f64 },
    /// Propelled along its direction of travel with a force proportional to
    /// its mass, constant mass loss
    SelfPropellingMolecularCloud {
        feedback_factor: f64,
        mass_loss_rate: f64,
    },
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::StarCluster { .. } => "StarCluster",
            ObjectKind::SelfPropellingMolecularCloud { .. } => "SelfPropellingMolecularCloud",
        }
    }

    pub fn mass_loss_rate(&self) -> f64 {
        match *self {
            ObjectKind::StarCluster { mass_loss_rate }
            | ObjectKind::SelfPropellingMolecularCloud { mass_loss_rate, .. } => mass_loss_rate,
        }
    }
}

/// A single point-mass body with provenance and mutable simulation state.
///
/// Stepping mutates the `current_*` fields in place, so one object must not
/// be stepped from several places at once.
#[derive(Debug, Clone)]
pub struct CompactObject {
    pub kind: ObjectKind,
    initial_mass: f64,
    initial_position: Vector3<f64>,
    initial_velocity: Vector3<f64>,
    initial_time: f64,
    pub current_mass: f64,
    pub current_position: Vector3<f64>,
    pub current_velocity: Vector3<f64>,
    pub current_time: f64,
}

impl CompactObject {
    pub fn new(
        kind: ObjectKind,
        mass: f64,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        time: f64,
    ) -> Result<Self> {
        if !(mass.is_finite() && mass >= 0.0) {
            return Err(ClusterChainError::invalid(format!(
                "{}: initial mass must be finite and non-negative, got {mass}",
                kind.name()
            )));
        }
        Ok(Self {
            kind,
            initial_mass: mass,
            initial_position: position,
            initial_velocity: velocity,
            initial_time: time,
            current_mass: mass,
            current_position: position,
            current_velocity: velocity,
            current_time: time,
        })
    }

    pub fn star_cluster(
        mass: f64,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        mass_loss_rate: f64,
    ) -> Result<Self> {
        Self::new(
            ObjectKind::StarCluster { mass_loss_rate },
            mass,
            position,
            velocity,
            0.0,
        )
    }

    pub fn molecular_cloud(
        mass: f64,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        feedback_factor: f64,
        mass_loss_rate: f64,
    ) -> Result<Self> {
        Self::new(
            ObjectKind::SelfPropellingMolecularCloud {
                feedback_factor,
                mass_loss_rate,
            },
            mass,
            position,
            velocity,
            0.0,
        )
    }

    pub fn initial_mass(&self) -> f64 {
        self.initial_mass
    }

    pub fn initial_position(&self) -> Vector3<f64> {
        self.initial_position
    }

    pub fn initial_velocity(&self) -> Vector3<f64> {
        self.initial_velocity
    }

    pub fn initial_time(&self) -> f64 {
        self.initial_time
    }

    /// Time elapsed since creation
    pub fn age(&self) -> f64 {
        self.current_time - self.initial_time
    }

    /// Feedback force and mass-loss rate for the current state
    pub fn feedback_and_massloss(&self) -> (Vector3<f64>, f64) {
        match self.kind {
            ObjectKind::StarCluster { mass_loss_rate } => (Vector3::zeros(), mass_loss_rate),
            ObjectKind::SelfPropellingMolecularCloud {
                feedback_factor,
                mass_loss_rate,
            } => {
                let speed = self.current_velocity.norm();
                let direction = if speed > 0.0 {
                    self.current_velocity / speed
                } else {
                    Vector3::zeros()
                };
                (
                    self.current_mass * feedback_factor * direction,
                    mass_loss_rate,
                )
            }
        }
    }

    /// Advances the object by `dt` under gravitational acceleration `a_g`.
    ///
    /// Velocity is updated first and the position moves with the new
    /// velocity. Mass never drops below zero; once it is zero the force per
    /// unit mass is undefined and the call fails without touching the state.
    pub fn propagate(&mut self, dt: f64, a_g: &Vector3<f64>) -> Result<()> {
        if self.current_mass <= 0.0 {
            return Err(ClusterChainError::MassExhausted {
                time: self.current_time,
            });
        }
        let (force, mdot) = self.feedback_and_massloss();
        let a_f = force / self.current_mass;
        let acceleration = a_g + a_f;

        self.current_velocity += acceleration * dt;
        self.current_position += self.current_velocity * dt;
        self.current_mass = (self.current_mass - mdot * dt).max(0.0);
        self.current_time += dt;
        Ok(())
    }

    /// Creates a new object from this one. Chaining is not supported by
    /// any variant.
    pub fn spawn(&self) -> Result<CompactObject> {
        Err(ClusterChainError::NotImplemented {
            operation: match self.kind {
                ObjectKind::StarCluster { .. } => "spawning from a star cluster",
                ObjectKind::SelfPropellingMolecularCloud { .. } => {
                    "spawning from a molecular cloud"
                }
            },
        })
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_mass <= 0.0
    }
}

impl fmt::Display for CompactObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(m={:.2}, p=[{:.2}, {:.2}, {:.2}], v=[{:.2}, {:.2}, {:.2}], t={:.2}",
            self.kind.name(),
            self.current_mass,
            self.current_position.x,
            self.current_position.y,
            self.current_position.z,
            self.current_velocity.x,
            self.current_velocity.y,
            self.current_velocity.z,
            self.current_time
        )?;
        match self.kind {
            ObjectKind::StarCluster { mass_loss_rate } => {
                write!(f, ", mass_loss_rate={:.2e})", mass_loss_rate)
            }
            ObjectKind::SelfPropellingMolecularCloud {
                feedback_factor,
                mass_loss_rate,
            } => write!(
                f,
                ", feedback_factor={:.2e}, mass_loss_rate={:.2e})",
                feedback_factor, mass_loss_rate
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_molecular_cloud_single_step() {
        let mut cloud = CompactObject::molecular_cloud(
            100.0,
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
            2.0,
            0.5,
        )
        .unwrap();

        let (force, mdot) = cloud.feedback_and_massloss();
        assert_relative_eq!(force, Vector3::new(200.0, 0.0, 0.0));
        assert_eq!(mdot, 0.5);

        cloud.propagate(1.0, &Vector3::zeros()).unwrap();
        assert_relative_eq!(cloud.current_mass, 99.5);
        assert_relative_eq!(cloud.current_velocity, Vector3::new(3.0, 0.0, 0.0));
        assert_relative_eq!(cloud.current_position, Vector3::new(3.0, 0.0, 0.0));
        assert_eq!(cloud.current_time, 1.0);
    }

    #[test]
    fn test_star_cluster_single_step() {
        let mut cluster =
            CompactObject::star_cluster(100.0, Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0), 1.0)
                .unwrap();

        let (force, mdot) = cluster.feedback_and_massloss();
        assert_eq!(force, Vector3::zeros());
        assert_eq!(mdot, 1.0);

        cluster.propagate(1.0, &Vector3::zeros()).unwrap();
        assert_eq!(cluster.current_mass, 99.0);
        assert_eq!(cluster.current_velocity, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(cluster.current_position, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(cluster.current_time, 1.0);
        assert_eq!(cluster.age(), 1.0);
        assert_eq!(cluster.initial_mass(), 100.0);
    }

    #[test]
    fn test_cloud_at_rest_has_no_feedback() {
        for (mass, factor) in [(1.0, 1.0), (1e6, 42.0), (0.0, -3.0)] {
            let (origin, at_rest) = (Vector3::zeros(), Vector3::zeros());
            let cloud =
                CompactObject::molecular_cloud(mass, origin, at_rest, factor, 0.1).unwrap();
            let (force, _) = cloud.feedback_and_massloss();
            assert_eq!(force, Vector3::zeros());
        }
    }

    #[test]
    fn test_semi_implicit_position_update() {
        let mut cluster =
            CompactObject::star_cluster(10.0, Vector3::zeros(), Vector3::zeros(), 0.0).unwrap();
        cluster.propagate(0.5, &Vector3::new(0.0, 0.0, -2.0)).unwrap();
        // v = -1 after the kick; the drift uses it
        assert_eq!(cluster.current_velocity.z, -1.0);
        assert_eq!(cluster.current_position.z, -0.5);
    }

    #[test]
    fn test_mass_never_negative() {
        let mut cloud = CompactObject::molecular_cloud(
            1.0,
            Vector3::zeros(),
            Vector3::new(0.0, 1.0, 0.0),
            1.0,
            0.3,
        )
        .unwrap();
        for _ in 0..3 {
            cloud.propagate(1.0, &Vector3::zeros()).unwrap();
            assert!(cloud.current_mass >= 0.0);
        }
        // 1.0 - 0.9 left, this step overshoots
        cloud.propagate(1.0, &Vector3::zeros()).unwrap();
        assert_eq!(cloud.current_mass, 0.0);
        assert!(cloud.is_exhausted());

        let before = cloud.clone();
        let err = cloud.propagate(1.0, &Vector3::zeros());
        assert!(matches!(err, Err(ClusterChainError::MassExhausted { .. })));
        assert_eq!(cloud.current_position, before.current_position);
        assert_eq!(cloud.current_time, before.current_time);
        assert_eq!(cloud.current_mass, 0.0);
    }

    #[test]
    fn test_huge_mass_loss_clamps_to_zero() {
        let mut cluster =
            CompactObject::star_cluster(5.0, Vector3::zeros(), Vector3::zeros(), 1e12).unwrap();
        cluster.propagate(1.0, &Vector3::zeros()).unwrap();
        assert_eq!(cluster.current_mass, 0.0);
    }

    #[test]
    fn test_spawn_is_not_implemented() {
        let cluster =
            CompactObject::star_cluster(1.0, Vector3::zeros(), Vector3::zeros(), 0.0).unwrap();
        let cloud =
            CompactObject::molecular_cloud(1.0, Vector3::zeros(), Vector3::zeros(), 1.0, 0.0)
                .unwrap();
        for object in [cluster, cloud] {
            assert!(matches!(
                object.spawn(),
                Err(ClusterChainError::NotImplemented { .. })
            ));
        }
    }

    #[test]
    fn test_display_includes_variant_parameters() {
        let cloud = CompactObject::molecular_cloud(
            100.0,
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::zeros(),
            2.0,
            0.5,
        )
        .unwrap();
        let text = cloud.to_string();
        assert!(text.starts_with("SelfPropellingMolecularCloud(m=100.00, p=[1.00, 2.00, 3.00]"));
        assert!(text.contains("feedback_factor=2.00e0"));
        assert!(text.contains("mass_loss_rate=5.00e-1"));
    }
}
