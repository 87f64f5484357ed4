//! Rung density of a single run.

use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::{Dataset, Props};
use lad_extrap::intersect_props;
use tracing::{debug, warn};

use crate::archive::{names, Measurement};
use crate::lattice::middle_asymmetry;

/// Measurements consumed by [`reduce_density`].
pub const DENSITY_MEASUREMENTS: [&str; 2] = [names::DENSITY_UP, names::DENSITY_DOWN];

/// Number of particles per spin species reported by the run.
pub(crate) fn up_particles(props: &Props) -> Result<f64, LadderError> {
    props.require_float("Nup_total")
}

/// Effective filling of a ladder, ignoring the extra pair on odd ladders.
pub fn effective_filling(size: usize, nup: f64) -> f64 {
    let leff = if size % 2 == 0 { size as f64 } else { (size - 1) as f64 };
    if nup as i64 % 2 == 0 {
        nup / leff
    } else {
        (nup - 1.0) / leff
    }
}

/// Sums spin-up and spin-down densities over both legs of every rung.
///
/// Returns `Ok(None)` when either density measurement is missing from the
/// run.
pub fn reduce_density(measurements: &[Measurement]) -> Result<Option<Dataset>, LadderError> {
    let mut selected = Vec::with_capacity(DENSITY_MEASUREMENTS.len());
    for name in DENSITY_MEASUREMENTS {
        match Measurement::find(measurements, name) {
            Some(found) => selected.push(found),
            None => {
                warn!(measurement = name, "measurement not found in run");
                return Ok(None);
            }
        }
    }

    let mut props = intersect_props(selected.iter().map(|m| &m.props));
    let size = props.require_float("L")? as usize;
    let nup = up_particles(&props)?;

    let mut density = vec![0.0; size];
    for measurement in &selected {
        for point in &measurement.points {
            let site = point.sites.first().ok_or_else(|| {
                LadderError::structure("missing-site", "local measurement point without a site")
            })?;
            let slot = density.get_mut(site.rung).ok_or_else(|| {
                LadderError::Structure(
                    ErrorInfo::new("site-out-of-range", "measurement site lies outside the ladder")
                        .with_context("rung", site.rung.to_string())
                        .with_context("L", size.to_string()),
                )
            })?;
            *slot += point.value;
        }
    }

    props.insert("observable", "Rung density");
    props.insert("nholes", size as f64 - nup);
    props.insert("filling", effective_filling(size, nup));
    let x = (0..size).map(|j| j as f64 + 0.5).collect();
    debug!(size, nup, "reduced rung density");
    Ok(Some(Dataset::new(x, density, props)))
}

/// True when the mid-chain density is symmetric within `tolerance`.
///
/// Logs a warning naming the run when it is not.
pub fn is_symmetric(density: &Dataset, tolerance: f64) -> bool {
    match middle_asymmetry(&density.y) {
        Some(delta) if delta > tolerance => {
            warn!(
                L = ?density.props.float("L"),
                filling = ?density.props.float("filling"),
                bond_dim = ?density.props.float("max_bond_dimension"),
                delta,
                "discarding run, middle density not symmetric"
            );
            false
        }
        _ => true,
    }
}
