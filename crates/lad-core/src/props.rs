//! Property dictionaries carried by every dataset and cache entry.

use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, LadderError};
use crate::numfmt::py_float;

/// A single property value: the three shapes the cache header can encode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    /// Scalar numeric value.
    Float(f64),
    /// Free-form string value.
    Text(String),
    /// One-dimensional numeric array.
    Array(Vec<f64>),
}

impl PropValue {
    /// Returns the scalar value when the property is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string value when the property is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the array value when the property is an array.
    pub fn as_array(&self) -> Option<&[f64]> {
        match self {
            PropValue::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Total order used to sort grouping keys deterministically.
    ///
    /// Values of different shapes order as float < text < array.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PropValue::Float(a), PropValue::Float(b)) => a.total_cmp(b),
            (PropValue::Text(a), PropValue::Text(b)) => a.cmp(b),
            (PropValue::Array(a), PropValue::Array(b)) => {
                for (lhs, rhs) in a.iter().zip(b.iter()) {
                    let ord = lhs.total_cmp(rhs);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            PropValue::Float(_) => 0,
            PropValue::Text(_) => 1,
            PropValue::Array(_) => 2,
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Float(value) => write!(f, "{}", py_float(*value)),
            PropValue::Text(value) => write!(f, "{value}"),
            PropValue::Array(values) => {
                write!(f, "[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", py_float(*value))?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<usize> for PropValue {
    fn from(value: usize) -> Self {
        PropValue::Float(value as f64)
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        PropValue::Float(f64::from(value))
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Float(f64::from(value))
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<Vec<f64>> for PropValue {
    fn from(values: Vec<f64>) -> Self {
        PropValue::Array(values)
    }
}

/// Ordered property dictionary (provenance plus fit metadata).
///
/// Keys iterate in sorted order, which is also the cache header write order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Props(BTreeMap<String, PropValue>);

impl Props {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts or replaces a property.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`Props::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    /// Returns true when `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Removes a property, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.0.remove(key)
    }

    /// Copies every entry of `other` into `self`, overwriting duplicates.
    pub fn extend(&mut self, other: &Props) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, PropValue> {
        self.0.iter()
    }

    /// Number of stored properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no properties are stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a numeric property or `None` when absent or non-numeric.
    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PropValue::as_f64)
    }

    /// Returns a textual property or `None` when absent or non-textual.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropValue::as_str)
    }

    /// Returns an array property or `None` when absent or not an array.
    pub fn array(&self, key: &str) -> Option<&[f64]> {
        self.get(key).and_then(PropValue::as_array)
    }

    /// Returns a numeric property, failing with a structural error when absent.
    pub fn require_float(&self, key: &str) -> Result<f64, LadderError> {
        self.float(key).ok_or_else(|| {
            LadderError::Structure(
                ErrorInfo::new("missing-property", "required numeric property is missing")
                    .with_context("key", key),
            )
        })
    }
}

impl FromIterator<(String, PropValue)> for Props {
    fn from_iter<I: IntoIterator<Item = (String, PropValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Props {
    type Item = (&'a String, &'a PropValue);
    type IntoIter = btree_map::Iter<'a, String, PropValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
