//! Finite-size scaling of the Friedel oscillation amplitude.
//!
//! The mid-chain amplitude decays as `L^(-Krho/2)`, so a straight line in
//! log-log axes yields the Luttinger parameter from its slope.

use lad_core::{Dataset, LadderError, PropValue};
use lad_extrap::{collect_xy, fit, r_squared};
use tracing::{info, warn};

/// Minimum number of fitted density profiles needed for a scaling fit.
pub const MIN_PROFILES: usize = 3;

fn keeps_even_pairs(profile: &Dataset) -> bool {
    let odd_size = profile.props.float("L").map_or(false, |size| size as i64 % 2 != 0);
    let even_pairs = profile
        .props
        .float("Nup_total")
        .map_or(false, |nup| nup as i64 % 2 == 0);
    odd_size || even_pairs
}

fn amplitude_of(profile: &Dataset) -> Result<Dataset, LadderError> {
    let at_middle = profile.props.require_float("density_fitted_at_middle")?;
    let n0 = profile.props.require_float("density_fitted_n0")?;
    let amplitude = (at_middle - n0).abs();
    if let Some(error) = profile.props.float("density_fit_error") {
        if error > amplitude {
            warn!(
                error,
                amplitude,
                L = ?profile.props.float("L"),
                bond_dim = ?profile.props.float("max_bond_dimension"),
                "density fit error exceeds amplitude"
            );
        }
    }
    let props = profile.props.clone().with("observable", "Amplitude");
    Ok(Dataset::new(Vec::new(), vec![amplitude], props))
}

/// Fits `log(amplitude)` against `log(L)` over the given density fits.
///
/// Only the `amplitude_points` largest sizes enter the fit when set; R² is
/// reported against all sizes. Returns `Ok(None)` with fewer than
/// [`MIN_PROFILES`] profiles.
pub fn fit_amplitudes(
    profiles: &[Dataset],
    amplitude_points: Option<usize>,
) -> Result<Option<Dataset>, LadderError> {
    if profiles.len() < MIN_PROFILES {
        warn!(
            valid = profiles.len(),
            required = MIN_PROFILES,
            "not enough valid densities for amplitude fit"
        );
        return Ok(None);
    }
    let amplitudes = profiles
        .iter()
        .filter(|profile| keeps_even_pairs(profile))
        .map(amplitude_of)
        .collect::<Result<Vec<_>, _>>()?;
    let (amplitudes, vanishing): (Vec<Dataset>, Vec<Dataset>) = amplitudes
        .into_iter()
        .partition(|amplitude| amplitude.y.iter().all(|v| v.is_finite() && *v > 0.0));
    if !vanishing.is_empty() {
        warn!(dropped = vanishing.len(), "dropping profiles without a positive amplitude");
    }
    let Some(mut series) = collect_xy(&amplitudes, "L", &[])?.into_iter().next() else {
        warn!("no amplitudes left after particle-number filter");
        return Ok(None);
    };
    if series.x.len() < MIN_PROFILES {
        warn!(
            valid = series.x.len(),
            required = MIN_PROFILES,
            "not enough amplitudes left for amplitude fit"
        );
        return Ok(None);
    }

    let log_x: Vec<f64> = series.x.iter().map(|v| v.ln()).collect();
    let log_y: Vec<f64> = series.y.iter().map(|v| v.ln()).collect();
    let start = match amplitude_points {
        Some(points) if points < log_x.len() => log_x.len() - points,
        _ => 0,
    };
    let result = fit(&log_x[start..], &log_y[start..], 1)?;
    let r2 = r_squared(&log_x, &log_y, &result.polynomial);
    let slope = result.polynomial.coefficients()[1];
    let slope_error = result
        .covariance
        .as_ref()
        .map_or(f64::NAN, |cov| cov[(1, 1)].sqrt());
    let krho = -2.0 * slope;
    let krho_error = 2.0 * slope_error;
    info!(
        bond_dim = ?series.props.float("max_bond_dimension"),
        filling = ?series.props.float("filling"),
        krho,
        krho_error,
        r2,
        "fitted amplitude scaling"
    );

    let first = series.x[start];
    let last = series.x[series.x.len() - 1];
    let props = &mut series.props;
    props.insert("fit_range", vec![first, last]);
    if let Some(points) = amplitude_points {
        props.insert("fit_numpoints", points);
    }
    props.insert("fitted_coeff", PropValue::Array(result.polynomial.descending()));
    props.insert("fitted_Krho", krho);
    props.insert("fitted_Krho_error", krho_error);
    props.insert("fitted_r2", r2);
    Ok(Some(series))
}
