//! Resolution of force-model selectors into bound models.
//!
//! A selector is either a name looked up in a closed registry or an
//! already-constructed model. Potential names are tried against the
//! galactic potentials first and the built-in gravity models second.

use crate::error::{ClusterChainError, Result};
use crate::forces::{
    galactic, ConstantFeedback, FeedbackModel, GalacticGravity, GravityModel, LinearFeedback,
    LinearFeedbackNoSignFlip, PulsedFeedback, SquaredPotential,
};
use crate::params::ModelParams;
use std::fmt;
use std::sync::Arc;

/// Built-in analytic gravity models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GravityKind {
    Squared,
}

impl GravityKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "squared_potential_force" | "squared" => Some(GravityKind::Squared),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GravityKind::Squared => "squared_potential_force",
        }
    }

    /// Binds the model's parameters
    pub fn bind(&self, params: &ModelParams) -> Result<Arc<dyn GravityModel>> {
        match self {
            GravityKind::Squared => Ok(Arc::new(SquaredPotential::new(
                params.vector3(self.name(), "a_0")?,
            ))),
        }
    }
}

/// Built-in feedback profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Constant,
    Linear,
    LinearNoSignFlip,
    Pulsed,
}

impl FeedbackKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "constant_feedback" | "constant" => Some(FeedbackKind::Constant),
            "linear_feedback" | "linear" => Some(FeedbackKind::Linear),
            "linear_feedback_no_sign_flip" | "linear_no_sign_flip" => {
                Some(FeedbackKind::LinearNoSignFlip)
            }
            "pulsed_feedback" | "pulsed" => Some(FeedbackKind::Pulsed),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeedbackKind::Constant => "constant_feedback",
            FeedbackKind::Linear => "linear_feedback",
            FeedbackKind::LinearNoSignFlip => "linear_feedback_no_sign_flip",
            FeedbackKind::Pulsed => "pulsed_feedback",
        }
    }

    /// Binds the profile's parameters
    pub fn bind(&self, params: &ModelParams) -> Result<Arc<dyn FeedbackModel>> {
        let model = self.name();
        let bound: Arc<dyn FeedbackModel> = match self {
            FeedbackKind::Constant => {
                Arc::new(ConstantFeedback::new(params.vector3(model, "a_0")?))
            }
            FeedbackKind::Linear => Arc::new(LinearFeedback::new(
                params.vector3(model, "a_0")?,
                params.vector3(model, "a_1")?,
            )),
            FeedbackKind::LinearNoSignFlip => Arc::new(LinearFeedbackNoSignFlip::new(
                params.vector3(model, "a_0")?,
                params.vector3(model, "a_1")?,
            )),
            FeedbackKind::Pulsed => Arc::new(PulsedFeedback::from_arrays(
                &params.vectors(model, "a_0")?,
                &params.list(model, "t_pulse")?,
                &params.list(model, "sigma_t")?,
            )?),
        };
        Ok(bound)
    }
}

/// Which gravity model to use
#[derive(Clone)]
pub enum PotentialSelector {
    Named(String),
    Model(Arc<dyn GravityModel>),
}

impl PotentialSelector {
    pub fn named(name: impl Into<String>) -> Self {
        PotentialSelector::Named(name.into())
    }

    pub fn model<G: GravityModel + 'static>(model: G) -> Self {
        PotentialSelector::Model(Arc::new(model))
    }
}

impl fmt::Debug for PotentialSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PotentialSelector::Named(name) => f.debug_tuple("Named").field(name).finish(),
            PotentialSelector::Model(model) => f.debug_tuple("Model").field(&model.name()).finish(),
        }
    }
}

impl From<&str> for PotentialSelector {
    fn from(name: &str) -> Self {
        PotentialSelector::named(name)
    }
}

/// Which feedback model to use
#[derive(Clone)]
pub enum FeedbackSelector {
    Named(String),
    Model(Arc<dyn FeedbackModel>),
}

impl FeedbackSelector {
    pub fn named(name: impl Into<String>) -> Self {
        FeedbackSelector::Named(name.into())
    }

    pub fn model<F: FeedbackModel + 'static>(model: F) -> Self {
        FeedbackSelector::Model(Arc::new(model))
    }
}

impl fmt::Debug for FeedbackSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackSelector::Named(name) => f.debug_tuple("Named").field(name).finish(),
            FeedbackSelector::Model(model) => f.debug_tuple("Model").field(&model.name()).finish(),
        }
    }
}

impl From<&str> for FeedbackSelector {
    fn from(name: &str) -> Self {
        FeedbackSelector::named(name)
    }
}

/// Resolves a potential selector, binding `params` for built-in models.
///
/// Galactic potentials take no parameters; `params` is ignored for them.
pub fn resolve_potential(
    selector: &PotentialSelector,
    params: Option<&ModelParams>,
) -> Result<Arc<dyn GravityModel>> {
    let name = match selector {
        PotentialSelector::Model(model) => return Ok(Arc::clone(model)),
        PotentialSelector::Named(name) => name,
    };

    if let Some(potential) = galactic::lookup(name) {
        log::debug!("Resolved potential '{}' as galactic potential", name);
        return Ok(Arc::new(GalacticGravity::new(potential)));
    }
    if !galactic::is_available() && galactic::POTENTIAL_NAMES.contains(&name.as_str()) {
        log::warn!(
            "Potential '{}' needs the `galactic` feature, which this build lacks",
            name
        );
    }

    let kind = GravityKind::from_name(name).ok_or_else(|| ClusterChainError::UnknownPotential {
        name: name.clone(),
    })?;
    let empty = ModelParams::new();
    let model = kind.bind(params.unwrap_or(&empty))?;
    log::debug!("Resolved potential '{}' as built-in {}", name, kind.name());
    Ok(model)
}

/// Resolves a feedback selector, binding `params` for built-in profiles
pub fn resolve_feedback(
    selector: &FeedbackSelector,
    params: &ModelParams,
) -> Result<Arc<dyn FeedbackModel>> {
    match selector {
        FeedbackSelector::Model(model) => Ok(Arc::clone(model)),
        FeedbackSelector::Named(name) => {
            let kind = FeedbackKind::from_name(name).ok_or_else(|| {
                ClusterChainError::UnknownFeedback { name: name.clone() }
            })?;
            let model = kind.bind(params)?;
            log::debug!("Resolved feedback '{}' as {}", name, kind.name());
            Ok(model)
        }
    }
}
