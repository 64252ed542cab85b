//! Named model parameters, as read from scenario files or built in code.
//!
//! A named force model is bound by pulling its required keys out of a
//! [`ModelParams`] map; a missing key or a value of the wrong shape is
//! reported against the model name.

use crate::error::{ClusterChainError, Result};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(f64),
    List(Vec<f64>),
    Vectors(Vec<Vec<f64>>),
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<Vector3<f64>> for ParamValue {
    fn from(value: Vector3<f64>) -> Self {
        ParamValue::List(value.iter().copied().collect())
    }
}

impl From<[f64; 3]> for ParamValue {
    fn from(value: [f64; 3]) -> Self {
        ParamValue::List(value.to_vec())
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(value: Vec<f64>) -> Self {
        ParamValue::List(value)
    }
}

impl From<Vec<Vector3<f64>>> for ParamValue {
    fn from(value: Vec<Vector3<f64>>) -> Self {
        ParamValue::Vectors(value.iter().map(|v| v.iter().copied().collect()).collect())
    }
}

fn to_vector3(model: &str, key: &str, values: &[f64]) -> Result<Vector3<f64>> {
    if values.len() != 3 {
        return Err(ClusterChainError::invalid(format!(
            "{model}: parameter '{key}' must be a 3-vector, got {} components",
            values.len()
        )));
    }
    Ok(Vector3::from_column_slice(values))
}

/// Parameters of one named model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelParams(BTreeMap<String, ParamValue>);

impl ModelParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, model: &str, key: &str) -> Result<&ParamValue> {
        self.0
            .get(key)
            .ok_or_else(|| ClusterChainError::missing(model, key))
    }

    /// Reads a required scalar
    pub fn scalar(&self, model: &str, key: &str) -> Result<f64> {
        match self.require(model, key)? {
            ParamValue::Scalar(value) => Ok(*value),
            ParamValue::List(values) if values.len() == 1 => Ok(values[0]),
            _ => Err(ClusterChainError::invalid(format!(
                "{model}: parameter '{key}' must be a scalar"
            ))),
        }
    }

    /// Reads a required 3-vector
    pub fn vector3(&self, model: &str, key: &str) -> Result<Vector3<f64>> {
        match self.require(model, key)? {
            ParamValue::List(values) => to_vector3(model, key, values),
            ParamValue::Scalar(_) => Err(ClusterChainError::invalid(format!(
                "{model}: parameter '{key}' must be a 3-vector, got a scalar"
            ))),
            ParamValue::Vectors(_) => Err(ClusterChainError::invalid(format!(
                "{model}: parameter '{key}' must be a 3-vector, got a list of vectors"
            ))),
        }
    }

    /// Reads a required list of scalars; a lone scalar counts as a list of one
    pub fn list(&self, model: &str, key: &str) -> Result<Vec<f64>> {
        match self.require(model, key)? {
            ParamValue::Scalar(value) => Ok(vec![*value]),
            ParamValue::List(values) => Ok(values.clone()),
            ParamValue::Vectors(_) => Err(ClusterChainError::invalid(format!(
                "{model}: parameter '{key}' must be a list of scalars"
            ))),
        }
    }

    /// Reads a required list of 3-vectors; a lone 3-vector counts as a list of
    /// one and `[]` as an empty list
    pub fn vectors(&self, model: &str, key: &str) -> Result<Vec<Vector3<f64>>> {
        match self.require(model, key)? {
            ParamValue::Vectors(rows) => rows
                .iter()
                .map(|row| to_vector3(model, key, row))
                .collect(),
            ParamValue::List(values) if values.is_empty() => Ok(Vec::new()),
            ParamValue::List(values) => Ok(vec![to_vector3(model, key, values)?]),
            ParamValue::Scalar(_) => Err(ClusterChainError::invalid(format!(
                "{model}: parameter '{key}' must be a list of 3-vectors"
            ))),
        }
    }
}
