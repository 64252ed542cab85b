use thiserror::Error;

/// Errors produced while resolving models, integrating trajectories or
/// stepping compact objects.
#[derive(Debug, Error)]
pub enum ClusterChainError {
    #[error("unknown potential '{name}': not a galactic potential nor a built-in gravity model")]
    UnknownPotential { name: String },

    #[error("unknown feedback model '{name}'")]
    UnknownFeedback { name: String },

    #[error("unknown object type '{name}', must be one of {expected:?}")]
    UnknownObjectKind {
        name: String,
        expected: &'static [&'static str],
    },

    #[error("missing required parameter '{field}' for {model}")]
    MissingParameter { model: String, field: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("mass exhausted at t = {time}, cannot compute force per unit mass")]
    MassExhausted { time: f64 },

    #[error("{operation} is not implemented")]
    NotImplemented { operation: &'static str },

    #[error("integration failed: {message}")]
    SolverFailure { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ClusterChainError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn missing(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingParameter {
            model: model.into(),
            field: field.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClusterChainError>;
