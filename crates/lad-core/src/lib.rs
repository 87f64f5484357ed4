#![deny(missing_docs)]
#![doc = "Core value types for the ladder DMRG analysis pipeline: datasets, property \
          dictionaries, parameter sets, strategy descriptors and the shared error taxonomy."]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

mod dataset;
pub mod descriptors;
pub mod errors;
pub mod numfmt;
pub mod params;
pub mod props;

pub use dataset::{Dataset, Table};
pub use descriptors::{BondDim, ControlVariable, CorrelationType, ExtrapolationDescriptor};
pub use errors::{ErrorInfo, LadderError};
pub use params::{keys, ParamValue, ParameterSet};
pub use props::{PropValue, Props};

/// Every cacheable artifact produced by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservableKind {
    /// Rung density profile of one run.
    Density,
    /// Friedel-oscillation fit of the density profile.
    DensityFit,
    /// Finite-size fit of the density oscillation amplitudes.
    DensityAmplitudes,
    /// Connected density-density correlation.
    Densdens,
    /// Rung singlet pair-field correlation.
    Pairfield,
    /// Ground-state energy of one run.
    Energy,
    /// Extrapolation scatter of the density at one coordinate.
    ExtrapDensity,
    /// Extrapolation scatter of the density-density correlation.
    ExtrapDensdens,
    /// Extrapolation scatter of the pair-field correlation.
    ExtrapPairfield,
    /// Extrapolation scatter and fitted limit of the energy.
    ExtrapEnergy,
}

impl ObservableKind {
    /// All kinds in declaration order.
    pub const ALL: [ObservableKind; 10] = [
        ObservableKind::Density,
        ObservableKind::DensityFit,
        ObservableKind::DensityAmplitudes,
        ObservableKind::Densdens,
        ObservableKind::Pairfield,
        ObservableKind::Energy,
        ObservableKind::ExtrapDensity,
        ObservableKind::ExtrapDensdens,
        ObservableKind::ExtrapPairfield,
        ObservableKind::ExtrapEnergy,
    ];

    /// Canonical name, used as the cache file prefix.
    pub fn name(&self) -> &'static str {
        match self {
            ObservableKind::Density => "density",
            ObservableKind::DensityFit => "density_fit",
            ObservableKind::DensityAmplitudes => "density_amplitudes",
            ObservableKind::Densdens => "densdens",
            ObservableKind::Pairfield => "pairfield",
            ObservableKind::Energy => "energy",
            ObservableKind::ExtrapDensity => "extrap_density",
            ObservableKind::ExtrapDensdens => "extrap_densdens",
            ObservableKind::ExtrapPairfield => "extrap_pairfield",
            ObservableKind::ExtrapEnergy => "extrap_energy",
        }
    }
}

impl fmt::Display for ObservableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObservableKind {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObservableKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                LadderError::Structure(
                    ErrorInfo::new("unknown-observable", "not a valid measurement")
                        .with_context("kind", s),
                )
            })
    }
}
