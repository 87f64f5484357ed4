//! Parameter sets identifying a cached artifact.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::descriptors::{BondDim, CorrelationType};
use crate::errors::{ErrorInfo, LadderError};
use crate::numfmt::py_float;

/// Parameter names understood by the cache codec and the evaluators.
pub mod keys {
    /// System size (number of rungs).
    pub const L: &str = "L";
    /// Filling fraction.
    pub const FILLING: &str = "filling";
    /// Bond dimension or extrapolation descriptor.
    pub const BOND_DIM: &str = "bond_dim";
    /// Correlation reduction strategy.
    pub const CORRELATION_TYPE: &str = "correlation_type";
    /// Coordinate selecting a full-output extrapolation scatter.
    pub const AT_X: &str = "at_x";
    /// Number of largest sizes used by the amplitude fit.
    pub const AMPLITUDE_POINTS: &str = "amplitude_points";
    /// Switches size sweeps to odd ladders.
    pub const ODD_SIZES: &str = "odd_sizes";
}

/// Single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integral value such as a system size.
    Int(i64),
    /// Real value such as a filling.
    Float(f64),
    /// Boolean switch.
    Flag(bool),
    /// Free-form label.
    Text(String),
    /// Bond dimension or extrapolation descriptor.
    BondDim(BondDim),
    /// Correlation reduction strategy.
    Correlation(CorrelationType),
    /// Optional point count, `None` meaning all points.
    Count(Option<usize>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Float(value) => f.write_str(&py_float(*value)),
            ParamValue::Flag(value) => f.write_str(if *value { "True" } else { "False" }),
            ParamValue::Text(value) => f.write_str(value),
            ParamValue::BondDim(value) => write!(f, "{value}"),
            ParamValue::Correlation(value) => write!(f, "{value}"),
            ParamValue::Count(Some(value)) => write!(f, "{value}"),
            ParamValue::Count(None) => f.write_str("All"),
        }
    }
}

impl ParamValue {
    /// Numeric view of the value, when it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(value) => Some(*value as f64),
            ParamValue::Float(value) => Some(*value),
            ParamValue::BondDim(BondDim::Fixed(value)) => Some(f64::from(*value)),
            ParamValue::Count(Some(value)) => Some(*value as f64),
            _ => None,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<BondDim> for ParamValue {
    fn from(value: BondDim) -> Self {
        ParamValue::BondDim(value)
    }
}

impl From<CorrelationType> for ParamValue {
    fn from(value: CorrelationType) -> Self {
        ParamValue::Correlation(value)
    }
}

impl From<Option<usize>> for ParamValue {
    fn from(value: Option<usize>) -> Self {
        ParamValue::Count(value)
    }
}

fn param_error(code: &str, message: &str, key: &str) -> LadderError {
    LadderError::Structure(ErrorInfo::new(code, message).with_context("parameter", key))
}

/// Named parameters that uniquely determine a cached artifact.
///
/// Entries are kept sorted by name, so insertion order never leaks into
/// cache names or logs.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns a copy without `key`.
    pub fn without(&self, key: &str) -> Self {
        let mut copy = self.clone();
        copy.0.remove(key);
        copy
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Returns true when `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterates parameters in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.0.iter()
    }

    /// System size `L`.
    pub fn size(&self) -> Result<usize, LadderError> {
        match self.get(keys::L) {
            Some(ParamValue::Int(value)) if *value > 0 => Ok(*value as usize),
            Some(_) => Err(param_error(
                "invalid-parameter",
                "L must be a positive integer",
                keys::L,
            )),
            None => Err(param_error("missing-parameter", "parameter is required", keys::L)),
        }
    }

    /// Filling fraction.
    pub fn filling(&self) -> Result<f64, LadderError> {
        let value = self.get(keys::FILLING).ok_or_else(|| {
            param_error("missing-parameter", "parameter is required", keys::FILLING)
        })?;
        value.as_f64().ok_or_else(|| {
            param_error("invalid-parameter", "filling must be numeric", keys::FILLING)
        })
    }

    /// Bond dimension or extrapolation descriptor.
    pub fn bond_dim(&self) -> Result<BondDim, LadderError> {
        match self.get(keys::BOND_DIM) {
            Some(ParamValue::BondDim(value)) => Ok(*value),
            Some(ParamValue::Int(value)) => u32::try_from(*value)
                .map(BondDim::Fixed)
                .map_err(|_| {
                    param_error("invalid-parameter", "bond dimension out of range", keys::BOND_DIM)
                }),
            Some(ParamValue::Text(value)) => value.parse(),
            Some(_) => Err(param_error(
                "invalid-parameter",
                "bond_dim must be an integer or an extrapolation descriptor",
                keys::BOND_DIM,
            )),
            None => Err(param_error("missing-parameter", "parameter is required", keys::BOND_DIM)),
        }
    }

    /// Correlation reduction strategy.
    pub fn correlation_type(&self) -> Result<CorrelationType, LadderError> {
        match self.get(keys::CORRELATION_TYPE) {
            Some(ParamValue::Correlation(value)) => Ok(*value),
            Some(ParamValue::Text(value)) => value.parse(),
            Some(_) => Err(param_error(
                "invalid-parameter",
                "correlation_type must be avg or start<n>",
                keys::CORRELATION_TYPE,
            )),
            None => Err(param_error(
                "missing-parameter",
                "parameter is required",
                keys::CORRELATION_TYPE,
            )),
        }
    }

    /// Full-output coordinate, when requested.
    pub fn at_x(&self) -> Option<f64> {
        self.get(keys::AT_X).and_then(ParamValue::as_f64)
    }

    /// Amplitude fit point cap; `None` when absent or when all sizes are used.
    pub fn amplitude_points(&self) -> Option<usize> {
        match self.get(keys::AMPLITUDE_POINTS) {
            Some(ParamValue::Count(value)) => *value,
            Some(ParamValue::Int(value)) if *value > 0 => Some(*value as usize),
            _ => None,
        }
    }

    /// True when the set requests odd system sizes.
    pub fn odd_sizes(&self) -> bool {
        match self.get(keys::ODD_SIZES) {
            Some(ParamValue::Flag(value)) => *value,
            Some(_) => true,
            None => false,
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (key, value)) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{ControlVariable, ExtrapolationDescriptor};

    #[test]
    fn typed_accessors_read_back_values() {
        let desc = ExtrapolationDescriptor::new(ControlVariable::BondDim, 1, Some(3));
        let params = ParameterSet::new()
            .with(keys::L, 32)
            .with(keys::FILLING, 0.875)
            .with(keys::BOND_DIM, BondDim::from(desc));
        assert_eq!(params.size().unwrap(), 32);
        assert_eq!(params.filling().unwrap(), 0.875);
        assert_eq!(params.bond_dim().unwrap().extrapolation(), Some(&desc));
        assert!(!params.odd_sizes());
    }

    #[test]
    fn textual_descriptors_are_parsed() {
        let params = ParameterSet::new()
            .with(keys::BOND_DIM, "extrap_variance_deg2_numAll")
            .with(keys::CORRELATION_TYPE, "start4");
        assert!(params.bond_dim().unwrap().extrapolation().is_some());
        assert_eq!(
            params.correlation_type().unwrap(),
            CorrelationType::FixedStart { start: 4 }
        );
    }

    #[test]
    fn missing_size_is_structural() {
        let err = ParameterSet::new().size().unwrap_err();
        assert!(matches!(err, LadderError::Structure(_)));
        assert_eq!(err.info().context.get("parameter").map(String::as_str), Some("L"));
    }
}
