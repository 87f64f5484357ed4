//! Friedel-oscillation fit of the rung density profile.
//!
//! The fit window starts at a quarter of the ladder on either side of the
//! middle. When the fitted mid-chain amplitude cannot be told apart from the
//! background the window shrinks by a factor 1.5, down to a floor of `L/12`.

use std::f64::consts::PI;

use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::numfmt::linspace;
use lad_core::Dataset;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Number of samples on the fitted output curve.
pub const PROFILE_CURVE_POINTS: usize = 1000;

/// Closed-form density profile fitted around the middle of the ladder.
pub trait ProfileModel {
    /// Name recorded in `density_fit_function`.
    fn name(&self) -> &str;
    /// Starting parameters of every fit attempt.
    fn initial(&self) -> Vec<f64>;
    /// Profile value at `x`.
    fn eval(&self, x: f64, params: &[f64]) -> f64;
    /// Background density `n0`.
    fn background(&self, params: &[f64]) -> f64;
    /// Decay exponent of the oscillation.
    fn exponent(&self, params: &[f64]) -> f64;
}

/// Friedel oscillations of a Luttinger liquid with open boundaries.
///
/// Parameters are `[n0, A, alpha]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FriedelProfile {
    size: f64,
    nholes: f64,
}

impl FriedelProfile {
    /// Profile for a ladder of `size` rungs doped with `nholes` holes.
    pub fn new(size: f64, nholes: f64) -> Self {
        Self { size, nholes }
    }

    /// Builds the profile from the `L` and `nholes` properties of a density.
    pub fn for_density(density: &Dataset) -> Result<Self, LadderError> {
        Ok(Self::new(
            density.props.require_float("L")?,
            density.props.require_float("nholes")?,
        ))
    }
}

impl ProfileModel for FriedelProfile {
    fn name(&self) -> &str {
        "fit_func"
    }

    fn initial(&self) -> Vec<f64> {
        vec![self.nholes / self.size, 1.0, 0.5]
    }

    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        let (n0, amplitude, alpha) = (params[0], params[1], params[2]);
        let leff = self.size - 2.0;
        let k = self.nholes / leff;
        let mut shift = -PI * self.nholes * self.size / leff;
        if self.size as i64 % 2 != 0 {
            shift += PI;
        }
        let shift2 = PI / 2.0 * (1.0 - self.size / leff);
        let envelope = (2.0 * leff / PI) * (PI * x / leff + shift2).sin();
        amplitude * (2.0 * PI * k * x + shift).cos() / envelope.powf(alpha) + n0
    }

    fn background(&self, params: &[f64]) -> f64 {
        params[0]
    }

    fn exponent(&self, params: &[f64]) -> f64 {
        params[2]
    }
}

/// Settings of the damped least-squares solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Maximum number of accepted or rejected steps.
    pub max_iterations: usize,
    /// Relative cost decrease below which the fit is considered converged.
    pub tolerance: f64,
    /// Mid-chain amplitude below which the fit window shrinks.
    pub min_amplitude: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 400,
            tolerance: 1e-14,
            min_amplitude: 1e-8,
        }
    }
}

/// Outcome of [`fit_density`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileFit {
    /// Fitted curve with its diagnostics in the properties.
    Converged(Dataset),
    /// The window reached its floor without a distinguishable amplitude.
    FitFailed {
        /// Half-width of the last window tried.
        window: f64,
        /// Mid-chain amplitude of the last attempt.
        amplitude: f64,
    },
}

fn residuals<M: ProfileModel + ?Sized>(
    model: &M,
    x: &[f64],
    y: &[f64],
    params: &[f64],
) -> DVector<f64> {
    DVector::from_iterator(
        x.len(),
        x.iter().zip(y).map(|(xi, yi)| yi - model.eval(*xi, params)),
    )
}

fn cost(residuals: &DVector<f64>) -> f64 {
    let value = residuals.norm_squared();
    if value.is_finite() {
        value
    } else {
        f64::INFINITY
    }
}

fn jacobian<M: ProfileModel + ?Sized>(
    model: &M,
    x: &[f64],
    y: &[f64],
    params: &[f64],
    base: &DVector<f64>,
) -> DMatrix<f64> {
    let mut jac = DMatrix::zeros(x.len(), params.len());
    let mut shifted = params.to_vec();
    for j in 0..params.len() {
        let step = f64::EPSILON.sqrt() * params[j].abs().max(1.0);
        shifted[j] = params[j] + step;
        let moved = residuals(model, x, y, &shifted);
        jac.set_column(j, &((moved - base) / step));
        shifted[j] = params[j];
    }
    jac
}

/// Levenberg-Marquardt minimisation of the squared residuals.
///
/// Returns the best parameters found; callers judge the quality of the fit.
pub fn least_squares<M: ProfileModel + ?Sized>(
    model: &M,
    x: &[f64],
    y: &[f64],
    initial: Vec<f64>,
    options: &SolverOptions,
) -> Vec<f64> {
    let mut params = initial;
    let mut current = residuals(model, x, y, &params);
    let mut current_cost = cost(&current);
    if !current_cost.is_finite() {
        return params;
    }
    let mut lambda = 1e-3;

    for _ in 0..options.max_iterations {
        let jac = jacobian(model, x, y, &params, &current);
        let jt = jac.transpose();
        let normal = &jt * &jac;
        let gradient = &jt * &current;

        let mut damped = normal.clone();
        for i in 0..params.len() {
            damped[(i, i)] += lambda * normal[(i, i)].max(1e-12);
        }
        let Some(step) = damped.lu().solve(&(-gradient)) else {
            lambda *= 10.0;
            continue;
        };

        let candidate: Vec<f64> = params.iter().zip(step.iter()).map(|(p, s)| p + s).collect();
        let trial = residuals(model, x, y, &candidate);
        let trial_cost = cost(&trial);
        if trial_cost < current_cost {
            let decrease = current_cost - trial_cost;
            params = candidate;
            current = trial;
            current_cost = trial_cost;
            lambda = (lambda / 10.0).max(1e-12);
            let threshold = options.tolerance * current_cost.max(f64::MIN_POSITIVE);
            if decrease <= threshold || current_cost == 0.0 {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e16 {
                break;
            }
        }
    }
    params
}

fn selection(x: &[f64], y: &[f64], middle: f64, window: f64) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter(|(xi, _)| **xi > middle - window && **xi < middle + window)
        .map(|(xi, yi)| (*xi, *yi))
        .unzip()
}

/// Fits `model` to the rung density profile.
///
/// The returned curve spans `[0.5, L - 0.5]` and carries the fit
/// diagnostics as `density_fit*` and `density_fitted_*` properties.
pub fn fit_density<M: ProfileModel + ?Sized>(
    density: &Dataset,
    model: &M,
    options: &SolverOptions,
) -> Result<ProfileFit, LadderError> {
    let size = density.props.require_float("L")?;
    if density.x.len() != density.y.len() {
        return Err(LadderError::Structure(
            ErrorInfo::new("column-length", "density coordinates and values differ in length")
                .with_context("L", size.to_string()),
        ));
    }
    let middle = size / 2.0;
    let floor = size / 12.0;
    let mut window = size / 4.0;

    let (params, sel_x, sel_y) = loop {
        let (sel_x, sel_y) = selection(&density.x, &density.y, middle, window);
        let initial = model.initial();
        let amplitude = if sel_x.len() < initial.len() {
            f64::NAN
        } else {
            let params = least_squares(model, &sel_x, &sel_y, initial, options);
            let amplitude = (model.eval(middle, &params) - model.background(&params)).abs();
            if amplitude >= options.min_amplitude {
                break (params, sel_x, sel_y);
            }
            amplitude
        };
        window /= 1.5;
        warn!(amplitude, window, "reducing fit range, amplitude too small");
        if window < floor {
            warn!(L = size, "density profile fit failed");
            return Ok(ProfileFit::FitFailed { window, amplitude });
        }
    };

    let chi2: f64 = sel_x
        .iter()
        .zip(&sel_y)
        .map(|(xi, yi)| (yi - model.eval(*xi, &params)).powi(2))
        .sum();
    let error = (chi2 / sel_x.len() as f64).sqrt();
    let n0 = model.background(&params);
    let krho = 2.0 * model.exponent(&params);
    let at_middle = model.eval(middle, &params);
    info!(L = size, nholes = ?density.props.float("nholes"), krho, "fitted density profile");

    let curve_x = linspace(0.5, size - 0.5, PROFILE_CURVE_POINTS);
    let curve_y = curve_x.iter().map(|xi| model.eval(*xi, &params)).collect();
    let props = density
        .props
        .clone()
        .with("density_fit_function", model.name())
        .with("density_fit_sel", vec![middle - window, middle + window])
        .with("density_fit_chi2", chi2)
        .with("density_fit_error", error)
        .with("density_fitted_n0", n0)
        .with("density_fitted_Krho", krho)
        .with("density_fitted_at_middle", at_middle);
    Ok(ProfileFit::Converged(Dataset::new(curve_x, curve_y, props)))
}
