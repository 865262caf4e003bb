//! Weight tables
//!
//! A weight table states which indicators take part in scoring and how much
//! each one counts. Tables are plain data so scorers stay independent of the
//! concrete weighting.

use countrysim_core::Indicator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Indicator weights, iterated in a fixed order so that floating point
/// accumulation is reproducible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightTable {
    weights: BTreeMap<Indicator, f64>,
}

impl WeightTable {
    /// Create a table from explicit weights, validating them
    pub fn new(weights: BTreeMap<Indicator, f64>) -> Result<Self, WeightError> {
        let table = Self { weights };
        table.validate()?;
        Ok(table)
    }

    /// Weights used by the ratio scorer. `corruptionIndex` is tracked in the
    /// data model but intentionally carries no weight.
    pub fn ratio_default() -> Self {
        Self {
            weights: BTreeMap::from([
                (Indicator::Gdp, 0.25),
                (Indicator::LifeExpectancy, 0.20),
                (Indicator::Education, 0.20),
                (Indicator::Co2Emissions, 0.15),
                (Indicator::Population, 0.10),
                (Indicator::UnemploymentRate, 0.05),
                (Indicator::HappinessScore, 0.05),
            ]),
        }
    }

    /// Weights used by the relative-difference scorer
    pub fn relative_difference_default() -> Self {
        Self {
            weights: BTreeMap::from([
                (Indicator::Gdp, 0.30),
                (Indicator::LifeExpectancy, 0.25),
                (Indicator::Education, 0.25),
                (Indicator::Co2Emissions, 0.20),
            ]),
        }
    }

    /// Validate the table
    /// - at least one indicator
    /// - no negative or non-finite weight
    /// - positive total
    pub fn validate(&self) -> Result<(), WeightError> {
        if self.weights.is_empty() {
            return Err(WeightError::Empty);
        }

        for (indicator, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(WeightError::InvalidWeight(*indicator));
            }
        }

        if self.total() <= 0.0 {
            return Err(WeightError::ZeroTotalWeight);
        }

        Ok(())
    }

    #[inline]
    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        self.weights.get(&indicator).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Indicator, f64)> + '_ {
        self.weights.iter().map(|(i, w)| (*i, *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Return a copy with some weights replaced.
    ///
    /// Indicators not present in the table are ignored and negative weights
    /// are treated as zero. The result must still be a valid table.
    pub fn with_overrides(&self, overrides: &BTreeMap<Indicator, f64>) -> Result<Self, WeightError> {
        let mut modified = self.clone();
        for (indicator, new_weight) in overrides {
            if let Some(weight) = modified.weights.get_mut(indicator) {
                *weight = new_weight.max(0.0);
            }
        }
        modified.validate()?;
        Ok(modified)
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::ratio_default()
    }
}

/// Errors that can occur during weight table validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightError {
    #[error("Weight table cannot be empty")]
    Empty,

    #[error("Indicator '{0}' has a negative or non-finite weight")]
    InvalidWeight(Indicator),

    #[error("Total weight cannot be zero")]
    ZeroTotalWeight,
}

impl From<WeightError> for countrysim_core::Error {
    fn from(e: WeightError) -> Self {
        countrysim_core::Error::InvalidConfig(e.to_string())
    }
}
