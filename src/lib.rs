//! Trajectories of a single star cluster or molecular cloud moving through
//! a galactic potential under feedback forces.
//!
//! The functional path composes a [`GravityModel`] and a [`FeedbackModel`]
//! into the phase-space derivative and integrates it with an adaptive
//! Dormand–Prince integrator ([`single_object_solve`]). The stateful path
//! steps a [`CompactObject`] that carries its own mass loss and feedback
//! ([`evolve_object`]).

pub mod compact_object;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod experiment;
pub mod forces;
pub mod integrator;
pub mod observe;
pub mod params;
pub mod propagate;
pub mod registry;
pub mod solve;

pub use compact_object::{CompactObject, ObjectKind};
pub use dynamics::{derivative, OdeSystem, PhaseState, TrajectoryDynamics};
pub use error::{ClusterChainError, Result};
pub use forces::{FeedbackModel, GravityModel};
pub use integrator::{
    DormandPrince45, Integrator, IntegratorConfig, SolverStatus, Tolerances, Trajectory,
    DEFAULT_ATOL, DEFAULT_RTOL,
};
pub use observe::{observe_single_object, Observation};
pub use params::{ModelParams, ParamValue};
pub use propagate::{create_object, evolve_object, ObjectParams, ObjectSnapshot};
pub use registry::{FeedbackKind, FeedbackSelector, GravityKind, PotentialSelector};
pub use solve::{single_object_solve, solve_with_config};
