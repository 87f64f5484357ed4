use std::fs;
use std::path::Path;

use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::{
    keys, BondDim, CorrelationType, ExtrapolationDescriptor, ObservableKind, ParameterSet,
};
use serde::{Deserialize, Serialize};

use crate::config::config_error;

/// Bond dimension entry of a sweep: a number, a descriptor name such as
/// `extrap_variance_deg2_numAll`, or a descriptor written out as a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BondDimSpec {
    /// Concrete bond dimension.
    Fixed(u32),
    /// Extrapolation descriptor by name.
    Named(String),
    /// Extrapolation descriptor by fields.
    Descriptor(ExtrapolationDescriptor),
}

impl BondDimSpec {
    /// Resolves the entry into a [`BondDim`].
    pub fn resolve(&self) -> Result<BondDim, LadderError> {
        match self {
            BondDimSpec::Fixed(value) => Ok(BondDim::Fixed(*value)),
            BondDimSpec::Named(name) => name.parse(),
            BondDimSpec::Descriptor(descriptor) => Ok(BondDim::Extrapolated(*descriptor)),
        }
    }
}

/// One block of a sweep plan: every observable at every combination of its
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    /// Filling fractions to visit.
    pub fillings: Vec<f64>,
    /// System sizes to visit.
    #[serde(default)]
    pub sizes: Vec<usize>,
    /// Bond dimensions or extrapolation descriptors to visit.
    pub bond_dims: Vec<BondDimSpec>,
    /// Observables to prepare.
    pub observables: Vec<ObservableKind>,
    /// Correlation reductions, as `avg` or `start<n>`.
    #[serde(default)]
    pub correlation_types: Vec<String>,
    /// Coordinates for full-output extrapolation scatters.
    #[serde(default)]
    pub at_x: Vec<f64>,
    /// Amplitude fit point caps; `null` uses every size.
    #[serde(default)]
    pub amplitude_points: Vec<Option<usize>>,
    /// Amplitude fits run over the odd system sizes.
    #[serde(default)]
    pub odd_sizes: bool,
}

/// Cache preparation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    /// Sweeps executed in order.
    pub sweeps: Vec<Sweep>,
}

impl SweepPlan {
    /// Parses a YAML plan.
    pub fn from_yaml_str(text: &str) -> Result<Self, LadderError> {
        serde_yaml::from_str(text).map_err(|err| config_error("plan-yaml", err))
    }

    /// Expands the plan into `(kind, params)` requests in execution order.
    ///
    /// Extrapolation kinds are only generated for extrapolation descriptors;
    /// full-output kinds other than energy need at least one `at_x`.
    pub fn jobs(&self) -> Result<Vec<(ObservableKind, ParameterSet)>, LadderError> {
        let mut jobs = Vec::new();
        for sweep in &self.sweeps {
            sweep.expand_into(&mut jobs)?;
        }
        Ok(jobs)
    }
}

impl Sweep {
    fn expand_into(
        &self,
        jobs: &mut Vec<(ObservableKind, ParameterSet)>,
    ) -> Result<(), LadderError> {
        let bond_dims = self
            .bond_dims
            .iter()
            .map(BondDimSpec::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        let correlation_types = self
            .correlation_types
            .iter()
            .map(|name| name.parse::<CorrelationType>())
            .collect::<Result<Vec<_>, _>>()?;

        for kind in &self.observables {
            let kind = *kind;
            if needs_correlation(kind) && correlation_types.is_empty() {
                return Err(LadderError::Config(
                    ErrorInfo::new("plan-correlation-types", "observable needs correlation types")
                        .with_context("kind", kind.name()),
                ));
            }
            for filling in &self.fillings {
                for bond_dim in &bond_dims {
                    let base = ParameterSet::new()
                        .with(keys::FILLING, *filling)
                        .with(keys::BOND_DIM, *bond_dim);
                    if kind == ObservableKind::DensityAmplitudes {
                        self.amplitude_jobs(&base, jobs);
                        continue;
                    }
                    if is_extrapolation(kind) && bond_dim.extrapolation().is_none() {
                        continue;
                    }
                    for size in &self.sizes {
                        let params = base.clone().with(keys::L, *size);
                        self.sized_jobs(kind, params, &correlation_types, jobs);
                    }
                }
            }
        }
        Ok(())
    }

    fn amplitude_jobs(&self, base: &ParameterSet, jobs: &mut Vec<(ObservableKind, ParameterSet)>) {
        let mut base = base.clone();
        if self.odd_sizes {
            base.insert(keys::ODD_SIZES, true);
        }
        if self.amplitude_points.is_empty() {
            jobs.push((ObservableKind::DensityAmplitudes, base));
            return;
        }
        for points in &self.amplitude_points {
            let params = base.clone().with(keys::AMPLITUDE_POINTS, *points);
            jobs.push((ObservableKind::DensityAmplitudes, params));
        }
    }

    fn sized_jobs(
        &self,
        kind: ObservableKind,
        params: ParameterSet,
        correlation_types: &[CorrelationType],
        jobs: &mut Vec<(ObservableKind, ParameterSet)>,
    ) {
        let with_correlations: Vec<ParameterSet> = if needs_correlation(kind) {
            correlation_types
                .iter()
                .map(|ct| params.clone().with(keys::CORRELATION_TYPE, *ct))
                .collect()
        } else {
            vec![params]
        };
        for params in with_correlations {
            if needs_at_x(kind) {
                for at in &self.at_x {
                    jobs.push((kind, params.clone().with(keys::AT_X, *at)));
                }
            } else {
                jobs.push((kind, params));
            }
        }
    }
}

fn needs_correlation(kind: ObservableKind) -> bool {
    matches!(
        kind,
        ObservableKind::Densdens
            | ObservableKind::Pairfield
            | ObservableKind::ExtrapDensdens
            | ObservableKind::ExtrapPairfield
    )
}

fn needs_at_x(kind: ObservableKind) -> bool {
    matches!(
        kind,
        ObservableKind::ExtrapDensity
            | ObservableKind::ExtrapDensdens
            | ObservableKind::ExtrapPairfield
    )
}

fn is_extrapolation(kind: ObservableKind) -> bool {
    needs_at_x(kind) || kind == ObservableKind::ExtrapEnergy
}

/// Loads a sweep plan from a YAML file.
pub fn load_plan<P: AsRef<Path>>(path: P) -> Result<SweepPlan, LadderError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| {
        LadderError::Config(
            ErrorInfo::new("plan-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    SweepPlan::from_yaml_str(&text)
}
