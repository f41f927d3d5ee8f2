//! Vehicle feature data model and the regression collaborator.
//!
//! A [`FeatureVector`] is built per request from untrusted JSON, validated
//! once and immutable afterwards. Cache keys are derived from it on demand.

pub mod dataset;
pub mod rating;
pub mod regression;
pub mod storage;

use crate::constants::fields;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub use dataset::Dataset;
pub use rating::EmissionRating;
pub use regression::{LinearRegressor, TrainingReport};

/// The six vehicle specifications consumed by the regressor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "Engine Size(L)")]
    pub engine_size_liters: f64,
    #[serde(rename = "Cylinders")]
    pub cylinders: i64,
    #[serde(rename = "Fuel Consumption Comb (L/100 km)")]
    pub fuel_consumption_combined: f64,
    #[serde(rename = "Horsepower")]
    pub horsepower: f64,
    #[serde(rename = "Weight (kg)")]
    pub weight_kg: f64,
    #[serde(rename = "Year")]
    pub year: i64,
}

/// Why a payload could not be turned into a [`FeatureVector`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("Payload must be a JSON object")]
    NotAnObject,

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' {reason}")]
    InvalidField { field: &'static str, reason: &'static str },
}

impl FeatureVector {
    /// Validate a JSON payload. Every field must be present; nothing is defaulted.
    pub fn from_payload(payload: &Value) -> Result<Self, PayloadError> {
        let object = payload.as_object().ok_or(PayloadError::NotAnObject)?;
        Self::from_object(object)
    }

    pub fn from_object(object: &Map<String, Value>) -> Result<Self, PayloadError> {
        Ok(Self {
            engine_size_liters: float_field(object, fields::ENGINE_SIZE)?,
            cylinders: int_field(object, fields::CYLINDERS)?,
            fuel_consumption_combined: float_field(object, fields::FUEL_CONSUMPTION_COMB)?,
            horsepower: float_field(object, fields::HORSEPOWER)?,
            weight_kg: float_field(object, fields::WEIGHT)?,
            year: int_field(object, fields::YEAR)?,
        })
    }

    /// Values in model column order
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.engine_size_liters,
            self.cylinders as f64,
            self.fuel_consumption_combined,
            self.horsepower,
            self.weight_kg,
            self.year as f64,
        ]
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::from(self)
    }

    pub fn scalar_key(&self) -> ScalarKey {
        ScalarKey::from(self)
    }
}

fn float_field(object: &Map<String, Value>, field: &'static str) -> Result<f64, PayloadError> {
    let value = object.get(field).ok_or(PayloadError::MissingField(field))?;
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(PayloadError::InvalidField { field, reason: "must be finite" }),
        None => Err(PayloadError::InvalidField { field, reason: "must be a number" }),
    }
}

fn int_field(object: &Map<String, Value>, field: &'static str) -> Result<i64, PayloadError> {
    let value = object.get(field).ok_or(PayloadError::MissingField(field))?;
    if let Some(v) = value.as_i64() {
        return Ok(v);
    }
    // 4.0 is accepted as 4, 4.5 is not
    match value.as_f64() {
        Some(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        Some(_) => Err(PayloadError::InvalidField { field, reason: "must be an integer" }),
        None => Err(PayloadError::InvalidField { field, reason: "must be a number" }),
    }
}

/// Canonical exact-match cache key.
///
/// Built from the parsed, typed field values in fixed model order, so the
/// order in which a caller supplied fields never matters, and `2`, `2.0`
/// and `2.00` on the wire all produce the same key. `f64`'s `Display` is the
/// shortest text that round-trips, so distinct values never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&FeatureVector> for CacheKey {
    fn from(features: &FeatureVector) -> Self {
        let values = [
            features.engine_size_liters.to_string(),
            features.cylinders.to_string(),
            features.fuel_consumption_combined.to_string(),
            features.horsepower.to_string(),
            features.weight_kg.to_string(),
            features.year.to_string(),
        ];
        let key = fields::FEATURES
            .iter()
            .zip(values.iter())
            .map(|(name, value)| format!("{}:{}", name, value))
            .collect::<Vec<_>>()
            .join("|");
        CacheKey(key)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Memoization key made of the raw scalar arguments (float bit patterns and integers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScalarKey {
    engine_size: u64,
    cylinders: i64,
    fuel_consumption: u64,
    horsepower: u64,
    weight: u64,
    year: i64,
}

impl From<&FeatureVector> for ScalarKey {
    fn from(f: &FeatureVector) -> Self {
        Self {
            engine_size: f.engine_size_liters.to_bits(),
            cylinders: f.cylinders,
            fuel_consumption: f.fuel_consumption_combined.to_bits(),
            horsepower: f.horsepower.to_bits(),
            weight: f.weight_kg.to_bits(),
            year: f.year,
        }
    }
}
