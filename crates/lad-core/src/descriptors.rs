//! Extrapolation and correlation strategies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, LadderError};

fn descriptor_error(code: &str, message: impl Into<String>, input: &str) -> LadderError {
    LadderError::Structure(ErrorInfo::new(code, message).with_context("input", input))
}

/// Property holding the bond dimension of a run.
pub const BOND_DIMENSION_PROP: &str = "max_bond_dimension";
/// Property holding the energy variance of a run.
pub const VARIANCE_PROP: &str = "EnergyVariance";
/// Property holding the final truncated weight of a run.
pub const TRUNCATION_PROP: &str = "TruncatedWeight";

/// Abscissa used when extrapolating towards the exact limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlVariable {
    /// Inverse bond dimension.
    BondDim,
    /// Energy variance.
    Variance,
    /// Truncated weight of the final sweep.
    Truncation,
}

impl ControlVariable {
    /// Identifier used in cache names and configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlVariable::BondDim => "bonddim",
            ControlVariable::Variance => "variance",
            ControlVariable::Truncation => "truncation",
        }
    }

    /// Run property the control variable is derived from.
    pub fn source_prop(&self) -> &'static str {
        match self {
            ControlVariable::BondDim => BOND_DIMENSION_PROP,
            ControlVariable::Variance => VARIANCE_PROP,
            ControlVariable::Truncation => TRUNCATION_PROP,
        }
    }

    /// Maps a raw property value onto the extrapolation axis.
    pub fn transform(&self, raw: f64) -> f64 {
        match self {
            ControlVariable::BondDim => 1.0 / raw,
            ControlVariable::Variance | ControlVariable::Truncation => raw,
        }
    }
}

impl fmt::Display for ControlVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlVariable {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bonddim" => Ok(ControlVariable::BondDim),
            "variance" => Ok(ControlVariable::Variance),
            "truncation" => Ok(ControlVariable::Truncation),
            other => Err(descriptor_error(
                "unknown-extrapolation-type",
                "extrapolation type must be bonddim, variance or truncation",
                other,
            )),
        }
    }
}

/// Extrapolation strategy: control variable, polynomial degree and point cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtrapolationDescriptor {
    /// Control variable on the x axis.
    pub variable: ControlVariable,
    /// Polynomial degree of the fit.
    pub degree: usize,
    /// Only fit the runs closest to the exact limit when set.
    #[serde(default)]
    pub num_points: Option<usize>,
}

impl ExtrapolationDescriptor {
    /// Creates a descriptor.
    pub fn new(variable: ControlVariable, degree: usize, num_points: Option<usize>) -> Self {
        Self {
            variable,
            degree,
            num_points,
        }
    }
}

impl fmt::Display for ExtrapolationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "extrap_{}_deg{}_num", self.variable, self.degree)?;
        match self.num_points {
            Some(points) => write!(f, "{points}"),
            None => write!(f, "All"),
        }
    }
}

impl FromStr for ExtrapolationDescriptor {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || {
            descriptor_error(
                "malformed-extrapolation",
                "expected extrap_<type>_deg<n>_num<n|All>",
                s,
            )
        };
        let rest = s.strip_prefix("extrap_").ok_or_else(malformed)?;
        let mut parts = rest.split('_');
        let variable: ControlVariable = parts.next().ok_or_else(malformed)?.parse()?;
        let degree = parts
            .next()
            .and_then(|part| part.strip_prefix("deg"))
            .and_then(|deg| deg.parse().ok())
            .ok_or_else(malformed)?;
        let num_points = match parts.next().and_then(|part| part.strip_prefix("num")) {
            Some("All") => None,
            Some(num) => Some(num.parse().map_err(|_| malformed())?),
            None => return Err(malformed()),
        };
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(Self::new(variable, degree, num_points))
    }
}

/// Control parameter of a request: one concrete run or an extrapolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BondDim {
    /// A single simulation at this bond dimension.
    Fixed(u32),
    /// The limit obtained by extrapolating over all bond dimensions.
    Extrapolated(ExtrapolationDescriptor),
}

impl BondDim {
    /// Returns the descriptor when the parameter requests an extrapolation.
    pub fn extrapolation(&self) -> Option<&ExtrapolationDescriptor> {
        match self {
            BondDim::Fixed(_) => None,
            BondDim::Extrapolated(descriptor) => Some(descriptor),
        }
    }
}

impl fmt::Display for BondDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BondDim::Fixed(value) => write!(f, "{value}"),
            BondDim::Extrapolated(descriptor) => write!(f, "{descriptor}"),
        }
    }
}

impl FromStr for BondDim {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<u32>() {
            Ok(value) => Ok(BondDim::Fixed(value)),
            Err(_) => s.parse().map(BondDim::Extrapolated),
        }
    }
}

impl From<ExtrapolationDescriptor> for BondDim {
    fn from(descriptor: ExtrapolationDescriptor) -> Self {
        BondDim::Extrapolated(descriptor)
    }
}

/// How a two-point correlation matrix is reduced to a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CorrelationType {
    /// Slice outward from a fixed rung.
    FixedStart {
        /// Reference rung.
        start: usize,
    },
    /// Average over a band of windows centred on the middle of the ladder.
    Averaged,
}

impl fmt::Display for CorrelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationType::FixedStart { start } => write!(f, "start{start}"),
            CorrelationType::Averaged => write!(f, "avg"),
        }
    }
}

impl FromStr for CorrelationType {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "avg" {
            return Ok(CorrelationType::Averaged);
        }
        s.strip_prefix("start")
            .and_then(|start| start.parse().ok())
            .map(|start| CorrelationType::FixedStart { start })
            .ok_or_else(|| {
                descriptor_error(
                    "unknown-correlation-type",
                    "correlation type must be avg or start<n>",
                    s,
                )
            })
    }
}
