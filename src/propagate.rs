//! Construction and fixed-step evolution of [`CompactObject`]s.

use crate::compact_object::{CompactObject, ObjectKind};
use crate::error::{ClusterChainError, Result};
use crate::forces::GravityModel;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Object type names understood by [`create_object`]
pub const OBJECT_KINDS: &[&str] = &["star_cluster", "molecular_cloud"];

/// Loose constructor arguments; which fields are required depends on the
/// object type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectParams {
    pub initial_mass: Option<f64>,
    pub initial_position: Option<[f64; 3]>,
    pub initial_velocity: Option<[f64; 3]>,
    pub initial_time: Option<f64>,
    pub mass_loss_rate: Option<f64>,
    pub feedback_factor: Option<f64>,
}

fn required<T: Copy>(value: Option<T>, variant: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| ClusterChainError::missing(variant, field))
}

/// Builds an object of type `kind` ("star_cluster" or "molecular_cloud")
pub fn create_object(kind: &str, params: &ObjectParams) -> Result<CompactObject> {
    let object_kind = match kind {
        "star_cluster" => ObjectKind::StarCluster {
            mass_loss_rate: required(params.mass_loss_rate, "StarCluster", "mass_loss_rate")?,
        },
        "molecular_cloud" => {
            let variant = "SelfPropellingMolecularCloud";
            ObjectKind::SelfPropellingMolecularCloud {
                feedback_factor: required(params.feedback_factor, variant, "feedback_factor")?,
                mass_loss_rate: required(params.mass_loss_rate, variant, "mass_loss_rate")?,
            }
        }
        _ => {
            return Err(ClusterChainError::UnknownObjectKind {
                name: kind.to_string(),
                expected: OBJECT_KINDS,
            })
        }
    };
    let variant = object_kind.name();
    let mass = required(params.initial_mass, variant, "initial_mass")?;
    let position = required(params.initial_position, variant, "initial_position")?;
    let velocity = required(params.initial_velocity, variant, "initial_velocity")?;

    let object = CompactObject::new(
        object_kind,
        mass,
        Vector3::from(position),
        Vector3::from(velocity),
        params.initial_time.unwrap_or(0.0),
    )?;
    log::debug!("Created {}", object);
    Ok(object)
}

/// State of an object after one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectSnapshot {
    pub time: f64,
    pub mass: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl From<&CompactObject> for ObjectSnapshot {
    fn from(object: &CompactObject) -> Self {
        Self {
            time: object.current_time,
            mass: object.current_mass,
            position: object.current_position,
            velocity: object.current_velocity,
        }
    }
}

/// Steps `object` `n_steps` times by `dt`, evaluating `gravity` at the
/// object's position before every step.
///
/// The returned history starts with the initial state. Evolution stops
/// early once the object's mass is exhausted.
pub fn evolve_object(
    object: &mut CompactObject,
    gravity: &dyn GravityModel,
    dt: f64,
    n_steps: usize,
) -> Result<Vec<ObjectSnapshot>> {
    if !(dt.is_finite() && dt != 0.0) {
        return Err(ClusterChainError::invalid(format!(
            "time step must be finite and non-zero, got {dt}"
        )));
    }
    let mut history = Vec::with_capacity(n_steps + 1);
    history.push(ObjectSnapshot::from(&*object));

    for step in 0..n_steps {
        let a_g = gravity.acceleration(&object.current_position);
        match object.propagate(dt, &a_g) {
            Ok(()) => history.push(ObjectSnapshot::from(&*object)),
            Err(ClusterChainError::MassExhausted { time }) => {
                log::warn!(
                    "{} exhausted its mass at t = {} after {} of {} steps",
                    object.kind.name(),
                    time,
                    step,
                    n_steps
                );
                break;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(history)
}
