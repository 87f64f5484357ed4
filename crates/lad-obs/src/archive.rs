use std::path::Path;

use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::Props;
use serde::{Deserialize, Serialize};

/// Measurement names read from raw simulation archives.
pub mod names {
    /// Local spin-up density.
    pub const DENSITY_UP: &str = "Local density up";
    /// Local spin-down density.
    pub const DENSITY_DOWN: &str = "Local density down";
    /// Up-up density correlator.
    pub const DENS_CORR_UP_UP: &str = "dens corr up-up";
    /// Up-down density correlator.
    pub const DENS_CORR_UP_DOWN: &str = "dens corr up-down";
    /// Down-up density correlator.
    pub const DENS_CORR_DOWN_UP: &str = "dens corr down-up";
    /// Down-down density correlator.
    pub const DENS_CORR_DOWN_DOWN: &str = "dens corr down-down";
    /// First rung singlet pair-field correlator.
    pub const PAIR_FIELD_1: &str = "pair field 1";
    /// Second rung singlet pair-field correlator.
    pub const PAIR_FIELD_2: &str = "pair field 2";
    /// Third rung singlet pair-field correlator.
    pub const PAIR_FIELD_3: &str = "pair field 3";
    /// Fourth rung singlet pair-field correlator.
    pub const PAIR_FIELD_4: &str = "pair field 4";
    /// Ground-state energy.
    pub const ENERGY: &str = "Energy";
}

/// Lattice site of the two-leg ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Site {
    /// Rung index along the ladder.
    pub rung: usize,
    /// Leg index (0 lower, 1 upper).
    pub leg: usize,
}

impl Site {
    /// Creates a site.
    pub fn new(rung: usize, leg: usize) -> Self {
        Self { rung, leg }
    }

    /// Flat index of the site for a ladder of the given width.
    pub fn index(&self, width: usize) -> usize {
        self.rung * width + self.leg
    }
}

/// Measured value at a tuple of sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    /// One site for local observables, two or four for correlators, none for scalars.
    pub sites: Vec<Site>,
    /// Measured value.
    pub value: f64,
}

/// Named measurement of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Measurement name, see [`names`].
    pub name: String,
    /// Run parameters and diagnostics attached by the loader.
    pub props: Props,
    /// Measured points.
    pub points: Vec<MeasurementPoint>,
}

impl Measurement {
    /// Looks up a measurement by name.
    pub fn find<'a>(measurements: &'a [Measurement], name: &str) -> Option<&'a Measurement> {
        measurements.iter().find(|m| m.name == name)
    }
}

/// Loader for raw simulation results.
///
/// Implementations attach `EnergyVariance` and `TruncatedWeight` to the
/// properties of every measurement they return. Measurements absent from
/// the run are left out of the result.
pub trait RawArchive {
    /// Loads the named measurements from one run.
    fn load_measurements(&self, run: &Path, names: &[&str])
        -> Result<Vec<Measurement>, LadderError>;
}

impl<T: RawArchive + ?Sized> RawArchive for &T {
    fn load_measurements(
        &self,
        run: &Path,
        names: &[&str],
    ) -> Result<Vec<Measurement>, LadderError> {
        (**self).load_measurements(run, names)
    }
}

/// Archive used when no raw loader is installed.
///
/// Cached results stay readable; any request that needs raw data fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableArchive;

impl RawArchive for UnavailableArchive {
    fn load_measurements(
        &self,
        run: &Path,
        _names: &[&str],
    ) -> Result<Vec<Measurement>, LadderError> {
        Err(LadderError::Collaborator(
            ErrorInfo::new("archive-unavailable", "no raw archive loader is available")
                .with_context("run", run.display().to_string())
                .with_hint(
                    "new evaluations need a raw archive loader; cached results remain readable",
                ),
        ))
    }
}
