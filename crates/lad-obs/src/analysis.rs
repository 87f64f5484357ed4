//! Cached entry points for every observable.
//!
//! [`Analysis::result`] resolves a request through the result cache. On a
//! miss the observable is evaluated either from a single raw run (concrete
//! bond dimension) or by extrapolating the cached single-run results over
//! all configured bond dimensions (extrapolation descriptor).

use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::{
    keys, BondDim, CorrelationType, Dataset, ExtrapolationDescriptor, ObservableKind, ParameterSet,
};
use lad_extrap::{extrapolate, ExtrapolationOutput, DEFAULT_FOREACH};
use lad_store::{Entry, ResultCache};
use tracing::{info, warn};

use crate::amplitude::fit_amplitudes;
use crate::archive::{names, Measurement, RawArchive};
use crate::config::AnalysisConfig;
use crate::correlations::{
    density_correlation, pairfield_correlation, CorrelationMatrix, DENSDENS_MEASUREMENTS,
    PAIRFIELD_MEASUREMENTS,
};
use crate::density::{is_symmetric, reduce_density, DENSITY_MEASUREMENTS};
use crate::density_fit::{fit_density, FriedelProfile, ProfileFit, SolverOptions};
use crate::energy::reduce_energy;
use crate::lattice::reduce_correlation;
use crate::locate::RunLocator;

fn request_error(
    code: &str,
    message: &str,
    kind: ObservableKind,
    params: &ParameterSet,
) -> LadderError {
    LadderError::Structure(
        ErrorInfo::new(code, message)
            .with_context("kind", kind.name())
            .with_context("params", params.to_string()),
    )
}

/// Observables reduced from a single raw run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunObservable {
    Density,
    Densdens,
    Pairfield,
    Energy,
}

impl RunObservable {
    fn kind(self) -> ObservableKind {
        match self {
            RunObservable::Density => ObservableKind::Density,
            RunObservable::Densdens => ObservableKind::Densdens,
            RunObservable::Pairfield => ObservableKind::Pairfield,
            RunObservable::Energy => ObservableKind::Energy,
        }
    }

    fn is_correlation(self) -> bool {
        matches!(self, RunObservable::Densdens | RunObservable::Pairfield)
    }

    /// Coordinate recorded in full-output requests for a requested `at_x`.
    fn full_output_at(self, at_x: f64) -> f64 {
        match self {
            RunObservable::Density => at_x + 0.5,
            _ => at_x,
        }
    }
}

/// Analysis context: configuration, result cache, raw-run locator and the
/// raw archive collaborator.
pub struct Analysis<A> {
    config: AnalysisConfig,
    cache: ResultCache,
    locator: RunLocator,
    archive: A,
    solver: SolverOptions,
}

impl<A: RawArchive> Analysis<A> {
    /// Creates a context reading raw runs through `archive`.
    pub fn new(config: AnalysisConfig, archive: A) -> Self {
        Self {
            cache: ResultCache::new(config.cache_config()),
            locator: config.locator(),
            config,
            archive,
            solver: SolverOptions::default(),
        }
    }

    /// Replaces the density profile solver settings.
    pub fn with_solver(mut self, solver: SolverOptions) -> Self {
        self.solver = solver;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Underlying result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Loads or computes the entry for `kind` at `params`.
    ///
    /// `Ok(None)` means the result is not available yet (missing raw data,
    /// too few datasets); nothing is stored in that case.
    pub fn result(
        &self,
        kind: ObservableKind,
        params: &ParameterSet,
    ) -> Result<Option<Entry>, LadderError> {
        self.cache.resolve(kind, params, |params| {
            match self.evaluate(kind, params)? {
                Some(dataset) => Ok(Some(Entry::new(dataset.to_table()?, dataset.props))),
                None => Ok(None),
            }
        })
    }

    /// Like [`Analysis::result`], returning the entry as a dataset.
    pub fn dataset(
        &self,
        kind: ObservableKind,
        params: &ParameterSet,
    ) -> Result<Option<Dataset>, LadderError> {
        Ok(self
            .result(kind, params)?
            .map(|entry| Dataset::from_table(entry.table.as_ref(), entry.props)))
    }

    /// Luttinger parameter from the amplitude scaling fit.
    pub fn krho(&self, params: &ParameterSet) -> Result<Option<f64>, LadderError> {
        let Some(amplitudes) = self.dataset(ObservableKind::DensityAmplitudes, params)? else {
            return Ok(None);
        };
        amplitudes
            .props
            .require_float("fitted_Krho")
            .map(Some)
    }

    fn evaluate(
        &self,
        kind: ObservableKind,
        params: &ParameterSet,
    ) -> Result<Option<Dataset>, LadderError> {
        match kind {
            ObservableKind::Density => self.run_observable(RunObservable::Density, params),
            ObservableKind::Densdens => self.run_observable(RunObservable::Densdens, params),
            ObservableKind::Pairfield => self.run_observable(RunObservable::Pairfield, params),
            ObservableKind::Energy => self.run_observable(RunObservable::Energy, params),
            ObservableKind::DensityFit => self.density_fit(params),
            ObservableKind::DensityAmplitudes => self.density_amplitudes(params),
            ObservableKind::ExtrapDensity => {
                self.extrapolation_at(RunObservable::Density, kind, params)
            }
            ObservableKind::ExtrapDensdens => {
                self.extrapolation_at(RunObservable::Densdens, kind, params)
            }
            ObservableKind::ExtrapPairfield => {
                self.extrapolation_at(RunObservable::Pairfield, kind, params)
            }
            ObservableKind::ExtrapEnergy => {
                let descriptor = require_descriptor(kind, params)?;
                self.energy_scatter(params, &descriptor)
            }
        }
    }

    fn run_observable(
        &self,
        observable: RunObservable,
        params: &ParameterSet,
    ) -> Result<Option<Dataset>, LadderError> {
        match params.bond_dim()? {
            BondDim::Fixed(bond_dim) => self.single_run(observable, params, bond_dim),
            BondDim::Extrapolated(descriptor) if observable == RunObservable::Energy => {
                self.energy_scatter(params, &descriptor)
            }
            BondDim::Extrapolated(descriptor) => {
                let output = self.extrapolate_runs(observable, params, &descriptor, &[])?;
                let Some(mut dataset) = output.extrapolated.into_iter().next() else {
                    warn!(
                        kind = %observable.kind(),
                        params = %params,
                        "no extrapolation available"
                    );
                    return Ok(None);
                };
                dataset.props.insert("extrap_type", descriptor.to_string());
                Ok(Some(dataset))
            }
        }
    }

    fn load_run(
        &self,
        params: &ParameterSet,
        bond_dim: u32,
        names: &[&str],
    ) -> Result<Option<Vec<Measurement>>, LadderError> {
        let size = params.size()?;
        let filling = params.filling()?;
        let Some(run) = self.locator.find(size, filling, bond_dim)? else {
            warn!(L = size, filling, bond_dim, "no raw data available");
            return Ok(None);
        };
        info!(run = %run.display(), "loading raw run");
        self.archive.load_measurements(&run, names).map(Some)
    }

    fn single_run(
        &self,
        observable: RunObservable,
        params: &ParameterSet,
        bond_dim: u32,
    ) -> Result<Option<Dataset>, LadderError> {
        match observable {
            RunObservable::Density => {
                let Some(runs) = self.load_run(params, bond_dim, &DENSITY_MEASUREMENTS)? else {
                    return Ok(None);
                };
                reduce_density(&runs)
            }
            RunObservable::Energy => {
                let Some(runs) = self.load_run(params, bond_dim, &[names::ENERGY])? else {
                    return Ok(None);
                };
                reduce_energy(&runs)
            }
            RunObservable::Densdens => {
                let correlation_type = params.correlation_type()?;
                let Some(runs) = self.load_run(params, bond_dim, &DENSDENS_MEASUREMENTS)? else {
                    return Ok(None);
                };
                self.reduce_matrix(density_correlation(&runs)?, correlation_type)
            }
            RunObservable::Pairfield => {
                let correlation_type = params.correlation_type()?;
                let names: Vec<&str> =
                    PAIRFIELD_MEASUREMENTS.iter().map(|(name, _)| *name).collect();
                let Some(runs) = self.load_run(params, bond_dim, &names)? else {
                    return Ok(None);
                };
                self.reduce_matrix(pairfield_correlation(&runs)?, correlation_type)
            }
        }
    }

    fn reduce_matrix(
        &self,
        corr: Option<CorrelationMatrix>,
        correlation_type: CorrelationType,
    ) -> Result<Option<Dataset>, LadderError> {
        let Some(CorrelationMatrix { matrix, props }) = corr else {
            return Ok(None);
        };
        let (x, y) =
            reduce_correlation(&matrix, correlation_type, &self.config.correlation_shifts)?;
        let props = props.with(keys::CORRELATION_TYPE, correlation_type.to_string());
        Ok(Some(Dataset::new(x, y, props)))
    }

    /// Single-run results at every configured bond dimension, through the cache.
    fn bond_dim_sweep(
        &self,
        observable: RunObservable,
        params: &ParameterSet,
    ) -> Result<Vec<Dataset>, LadderError> {
        let mut base = ParameterSet::new()
            .with(keys::L, params.size()?)
            .with(keys::FILLING, params.filling()?);
        if observable.is_correlation() {
            base.insert(keys::CORRELATION_TYPE, params.correlation_type()?);
        }
        let mut sets = Vec::with_capacity(self.config.bond_dims.len());
        for bond_dim in &self.config.bond_dims {
            let single = base.clone().with(keys::BOND_DIM, BondDim::Fixed(*bond_dim));
            if let Some(dataset) = self.dataset(observable.kind(), &single)? {
                sets.push(dataset);
            }
        }
        if observable == RunObservable::Density {
            sets.retain(|density| is_symmetric(density, self.config.symmetry_tolerance));
        }
        Ok(sets)
    }

    fn extrapolate_runs(
        &self,
        observable: RunObservable,
        params: &ParameterSet,
        descriptor: &ExtrapolationDescriptor,
        full_output_at: &[f64],
    ) -> Result<ExtrapolationOutput, LadderError> {
        let sets = self.bond_dim_sweep(observable, params)?;
        info!(
            kind = %observable.kind(),
            runs = sets.len(),
            extrapolation = %descriptor,
            "extrapolating"
        );
        extrapolate(&sets, descriptor, &DEFAULT_FOREACH, full_output_at)
    }

    fn extrapolation_at(
        &self,
        observable: RunObservable,
        kind: ObservableKind,
        params: &ParameterSet,
    ) -> Result<Option<Dataset>, LadderError> {
        let descriptor = require_descriptor(kind, params)?;
        let at_x = params
            .at_x()
            .ok_or_else(|| request_error("missing-parameter", "at_x is required", kind, params))?;
        let full_output_at = [observable.full_output_at(at_x)];
        let output = self.extrapolate_runs(observable, params, &descriptor, &full_output_at)?;
        let Some(mut scatter) = output.scatter.into_iter().next() else {
            warn!(kind = %kind, params = %params, "no extrapolation scatter available");
            return Ok(None);
        };
        scatter.props.insert("extrap_type", descriptor.to_string());
        Ok(Some(scatter))
    }

    fn energy_scatter(
        &self,
        params: &ParameterSet,
        descriptor: &ExtrapolationDescriptor,
    ) -> Result<Option<Dataset>, LadderError> {
        let output = self.extrapolate_runs(RunObservable::Energy, params, descriptor, &[0.0])?;
        let Some(mut scatter) = output.scatter.into_iter().next() else {
            warn!(params = %params, "no energy extrapolation available");
            return Ok(None);
        };
        let props = &mut scatter.props;
        if let Some(value) = props.float("fitted_value") {
            props.insert("fitted_energy", value);
        }
        if let Some(error) = props.float("fitted_error") {
            props.insert("fitted_energy_error", error);
        }
        props.insert("extrap_type", descriptor.to_string());
        Ok(Some(scatter))
    }

    fn density_fit(&self, params: &ParameterSet) -> Result<Option<Dataset>, LadderError> {
        let base = ParameterSet::new()
            .with(keys::L, params.size()?)
            .with(keys::FILLING, params.filling()?)
            .with(keys::BOND_DIM, params.bond_dim()?);
        let Some(density) = self.dataset(ObservableKind::Density, &base)? else {
            warn!(params = %params, "density not found");
            return Ok(None);
        };
        let model = FriedelProfile::for_density(&density)?;
        match fit_density(&density, &model, &self.solver)? {
            ProfileFit::Converged(fit) => Ok(Some(fit)),
            ProfileFit::FitFailed { window, amplitude } => {
                warn!(params = %params, window, amplitude, "density fit failed");
                Ok(None)
            }
        }
    }

    fn density_amplitudes(&self, params: &ParameterSet) -> Result<Option<Dataset>, LadderError> {
        let filling = params.filling()?;
        let bond_dim = params.bond_dim()?;
        let sizes = if params.odd_sizes() {
            &self.config.odd_sizes
        } else {
            &self.config.sizes
        };
        let mut profiles = Vec::with_capacity(sizes.len());
        for size in sizes {
            let single = ParameterSet::new()
                .with(keys::L, *size)
                .with(keys::FILLING, filling)
                .with(keys::BOND_DIM, bond_dim);
            if let Some(fit) = self.dataset(ObservableKind::DensityFit, &single)? {
                profiles.push(fit);
            }
        }
        fit_amplitudes(&profiles, params.amplitude_points())
    }
}

fn require_descriptor(
    kind: ObservableKind,
    params: &ParameterSet,
) -> Result<ExtrapolationDescriptor, LadderError> {
    match params.bond_dim()? {
        BondDim::Extrapolated(descriptor) => Ok(descriptor),
        BondDim::Fixed(_) => Err(request_error(
            "extrapolation-required",
            "bond_dim must be an extrapolation descriptor",
            kind,
            params,
        )),
    }
}
