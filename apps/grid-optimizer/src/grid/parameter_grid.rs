//! Parameter grid for grid search optimization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::GridError;
use crate::params::{Direction, ParamError, ParamKey, ParamValue, ParameterSet, Timeframe};

/// A parameter grid: one ordered, non-empty candidate list per key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    axes: BTreeMap<ParamKey, Vec<ParamValue>>,
}

impl ParameterGrid {
    /// Create a new parameter grid builder.
    #[must_use]
    pub fn builder() -> ParameterGridBuilder {
        ParameterGridBuilder::new()
    }

    /// Get the total number of parameter combinations.
    #[must_use]
    pub fn total_combinations(&self) -> usize {
        self.axes.values().map(Vec::len).product()
    }

    /// Candidate values of `key`.
    #[must_use]
    pub fn values(&self, key: ParamKey) -> &[ParamValue] {
        self.axes.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Axes in key order.
    pub fn axes(&self) -> impl Iterator<Item = (ParamKey, &[ParamValue])> {
        self.axes.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Generate all parameter combinations.
    ///
    /// The last key in [`ParamKey::ALL`] varies fastest.
    #[must_use]
    pub fn combinations(&self) -> Vec<ParameterSet> {
        let mut result = vec![ParameterSet::default()];

        for (key, values) in &self.axes {
            let mut next = Vec::with_capacity(result.len() * values.len());
            for combo in &result {
                // Kinds were validated by the builder.
                next.extend(values.iter().filter_map(|v| combo.with(*key, *v).ok()));
            }
            result = next;
        }

        result
    }

    /// Combinations with interaction-invalid sets removed when `validate` is
    /// set. Returns the kept sets and the number skipped.
    #[must_use]
    pub fn valid_combinations(&self, validate: bool) -> (Vec<ParameterSet>, usize) {
        let all = self.combinations();
        if !validate {
            return (all, 0);
        }
        let total = all.len();
        let kept: Vec<ParameterSet> = all
            .into_iter()
            .filter(ParameterSet::has_valid_interactions)
            .collect();
        let skipped = total - kept.len();
        (kept, skipped)
    }
}

/// Builder for parameter grids.
#[derive(Debug, Default)]
pub struct ParameterGridBuilder {
    axes: BTreeMap<ParamKey, Vec<ParamValue>>,
}

impl ParameterGridBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the candidate values of `key`.
    #[must_use]
    pub fn axis(mut self, key: ParamKey, values: Vec<ParamValue>) -> Self {
        self.axes.insert(key, values);
        self
    }

    /// Add float parameter values.
    #[must_use]
    pub fn add_float_param(self, key: ParamKey, values: Vec<f64>) -> Self {
        self.axis(key, values.into_iter().map(ParamValue::Float).collect())
    }

    /// Add integer parameter values.
    #[must_use]
    pub fn add_int_param(self, key: ParamKey, values: Vec<i64>) -> Self {
        self.axis(key, values.into_iter().map(ParamValue::Int).collect())
    }

    /// Add filter timeframe values.
    #[must_use]
    pub fn add_timeframes(self, values: Vec<Timeframe>) -> Self {
        self.axis(
            ParamKey::FilterTf,
            values.into_iter().map(ParamValue::Timeframe).collect(),
        )
    }

    /// Add direction values.
    #[must_use]
    pub fn add_directions(self, values: Vec<Direction>) -> Self {
        self.axis(
            ParamKey::Direction,
            values.into_iter().map(ParamValue::Direction).collect(),
        )
    }

    /// Build the parameter grid.
    ///
    /// Every key needs a non-empty axis of matching, finite values. Exact
    /// duplicates within an axis are dropped, keeping first occurrence.
    pub fn build(self) -> Result<ParameterGrid, GridError> {
        let mut axes = BTreeMap::new();

        for key in ParamKey::ALL {
            let Some(values) = self.axes.get(&key) else {
                return Err(GridError::MissingAxis { key });
            };

            let mut unique: Vec<ParamValue> = Vec::with_capacity(values.len());
            for value in values {
                if !value.matches_kind(key) {
                    return Err(ParamError::TypeMismatch {
                        key,
                        expected: "matching",
                        actual: value.to_string(),
                    }
                    .into());
                }
                if value.as_f64().is_some_and(|v| !v.is_finite()) {
                    return Err(ParamError::NonFinite { key }.into());
                }
                if !unique.contains(value) {
                    unique.push(*value);
                }
            }

            if unique.is_empty() {
                return Err(GridError::EmptyAxis { key });
            }
            axes.insert(key, unique);
        }

        Ok(ParameterGrid { axes })
    }
}
