#![deny(missing_docs)]
#![doc = "Observable reductions, density profile fits and cached analysis entry points \
          for two-leg ladder DMRG runs."]

/// Finite-size scaling of density oscillation amplitudes.
pub mod amplitude;
/// Cached analysis context dispatching over observable kinds.
pub mod analysis;
/// Raw simulation archive collaborator and measurement model.
pub mod archive;
/// YAML analysis configuration.
pub mod config;
/// Density-density and pair-field correlators.
pub mod correlations;
/// Rung density reduction and symmetry filter.
pub mod density;
/// Density profile model and damped least-squares fit.
pub mod density_fit;
/// Ground-state energy reduction.
pub mod energy;
/// Correlation-matrix reductions along the ladder.
pub mod lattice;
/// Raw run discovery on disk.
pub mod locate;
/// Cache preparation sweep plans.
pub mod plan;

pub use amplitude::fit_amplitudes;
pub use analysis::Analysis;
pub use archive::{names, Measurement, MeasurementPoint, RawArchive, Site, UnavailableArchive};
pub use config::{load_config, AnalysisConfig};
pub use density_fit::{fit_density, FriedelProfile, ProfileFit, ProfileModel, SolverOptions};
pub use locate::{particles_per_spin, RunLocator};
pub use plan::{load_plan, BondDimSpec, Sweep, SweepPlan};
