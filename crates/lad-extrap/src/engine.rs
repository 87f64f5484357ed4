//! Per-group polynomial extrapolation towards the exact limit.
//!
//! Each group of runs sharing the same physical parameters is fitted, one
//! coordinate at a time, against the control variable of the descriptor.
//! The fitted constant term is the extrapolated observable.

use lad_core::descriptors::{BOND_DIMENSION_PROP, TRUNCATION_PROP, VARIANCE_PROP};
use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::numfmt::linspace;
use lad_core::{ControlVariable, Dataset, ExtrapolationDescriptor, PropValue, Props};
use tracing::{debug, warn};

use crate::group::{group_by, intersect_props};
use crate::polyfit::{polyfit, r_squared, Polynomial};

/// Tolerance when comparing coordinates across runs and against full-output requests.
pub const COORDINATE_TOLERANCE: f64 = 1e-10;

/// Number of samples on each dense fit curve.
pub const FIT_CURVE_POINTS: usize = 50;

/// Grouping properties used for every observable.
pub const DEFAULT_FOREACH: [&str; 4] = ["L", "t'", "Nup_total", "Ndown_total"];

/// Results of one extrapolation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtrapolationOutput {
    /// One dataset per group with the extrapolated value at every coordinate.
    pub extrapolated: Vec<Dataset>,
    /// Control variable vs. observable at each requested full-output coordinate.
    pub scatter: Vec<Dataset>,
    /// Dense fitted curves matching [`ExtrapolationOutput::scatter`].
    pub fits: Vec<Dataset>,
}

/// Outcome of the fit at a single coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFit {
    /// Fitted polynomial.
    pub polynomial: Polynomial,
    /// Fitted value at zero control variable.
    pub value: f64,
    /// Half the distance between the limit and the most accurate sample.
    pub error: f64,
    /// Coefficient of determination against all group points.
    pub r2: f64,
}

/// Fits `y` against ascending `x` using the `num_points` samples nearest zero.
pub fn extrapolate_point(
    x: &[f64],
    y: &[f64],
    degree: usize,
    num_points: Option<usize>,
) -> Result<PointFit, LadderError> {
    let window = window_len(x.len(), num_points);
    let polynomial = polyfit(&x[..window], &y[..window], degree)?;
    let value = polynomial.constant();
    let error = y.first().map(|nearest| 0.5 * (value - nearest).abs()).unwrap_or(f64::NAN);
    let r2 = r_squared(x, y, &polynomial);
    Ok(PointFit {
        polynomial,
        value,
        error,
        r2,
    })
}

fn window_len(len: usize, num_points: Option<usize>) -> usize {
    match num_points {
        Some(points) if points < len => points,
        _ => len,
    }
}

/// Properties pinned on extrapolated results for each control variable.
pub fn limit_props(variable: ControlVariable) -> Props {
    let props = Props::new().with(BOND_DIMENSION_PROP, "inf");
    match variable {
        ControlVariable::BondDim => props,
        ControlVariable::Variance => props.with(VARIANCE_PROP, 0.0),
        ControlVariable::Truncation => props.with(TRUNCATION_PROP, 0.0),
    }
}

fn fit_props(common: &Props, descriptor: &ExtrapolationDescriptor) -> Props {
    let mut props = common.clone();
    props.insert("fit_deg", descriptor.degree);
    if let Some(points) = descriptor.num_points {
        props.insert("fit_numpoints", points);
    }
    props
}

struct Member<'a> {
    control: f64,
    bond_dim: f64,
    dataset: &'a Dataset,
}

/// Extrapolates every group of `datasets` sharing the `foreach` properties.
///
/// Groups too small for the requested degree are skipped with a warning.
/// Members of one group must share the same coordinate grid.
pub fn extrapolate(
    datasets: &[Dataset],
    descriptor: &ExtrapolationDescriptor,
    foreach: &[&str],
    full_output_at: &[f64],
) -> Result<ExtrapolationOutput, LadderError> {
    let mut output = ExtrapolationOutput::default();
    let degree = descriptor.degree;
    let variable = descriptor.variable;

    for group in group_by(datasets, foreach)? {
        let len = group.members.len();
        if window_len(len, descriptor.num_points) < degree + 1 {
            warn!(
                members = len,
                degree,
                num_points = ?descriptor.num_points,
                "extrapolation not possible, group too small"
            );
            continue;
        }

        let grid = &group.members[0].x;
        let aligned = group.members.iter().all(|member| {
            member.x.len() == grid.len()
                && member.y.len() == grid.len()
                && member
                    .x
                    .iter()
                    .zip(grid)
                    .all(|(a, b)| (a - b).abs() <= COORDINATE_TOLERANCE)
        });
        if !aligned {
            return Err(LadderError::Structure(
                ErrorInfo::new(
                    "grid-mismatch",
                    "coordinate grids differ within an extrapolation group",
                )
                .with_context("group", format!("{:?}", group.key)),
            ));
        }

        let mut members = group
            .members
            .iter()
            .map(|&dataset| {
                let raw = dataset.props.require_float(variable.source_prop())?;
                Ok(Member {
                    control: variable.transform(raw),
                    bond_dim: dataset.props.require_float(BOND_DIMENSION_PROP)?,
                    dataset,
                })
            })
            .collect::<Result<Vec<_>, LadderError>>()?;
        members.sort_by(|a, b| a.control.total_cmp(&b.control));

        let common = intersect_props(group.members.iter().map(|d| &d.props));
        let controls: Vec<f64> = members.iter().map(|m| m.control).collect();
        let bond_dims: Vec<f64> = members.iter().map(|m| m.bond_dim).collect();
        let window = window_len(len, descriptor.num_points);
        let fit_cut = controls[window - 1];

        let mut values = Vec::with_capacity(grid.len());
        for (index, xi) in grid.iter().enumerate() {
            let observed: Vec<f64> = members.iter().map(|m| m.dataset.y[index]).collect();
            let fitted = extrapolate_point(&controls, &observed, degree, descriptor.num_points);
            let point = match fitted {
                Ok(point) => point,
                Err(err) => {
                    warn!(coordinate = xi, error = %err, "fit failed at coordinate");
                    values.push(f64::NAN);
                    continue;
                }
            };
            values.push(point.value);

            if full_output_at
                .iter()
                .any(|at| (at - xi).abs() <= COORDINATE_TOLERANCE)
            {
                let coeff = PropValue::Array(point.polynomial.descending());
                let mut shared = fit_props(&common, descriptor);
                shared.insert("fitted_x", *xi);
                shared.insert("fitted_r2", point.r2);
                shared.insert("fit_cut", fit_cut);
                shared.insert("fitted_coeff", coeff);

                let max_control = controls.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let curve_x = linspace(0.0, max_control, FIT_CURVE_POINTS);
                let curve_y = curve_x.iter().map(|v| point.polynomial.eval(*v)).collect();
                output.fits.push(Dataset::new(curve_x, curve_y, shared.clone()));

                let scatter_props = shared
                    .with("line", "scatter")
                    .with("bond_dims", bond_dims.clone())
                    .with("fitted_value", point.value)
                    .with("fitted_error", point.error);
                output
                    .scatter
                    .push(Dataset::new(controls.clone(), observed, scatter_props));
            }
        }

        let mut props = fit_props(&common, descriptor);
        props.extend(&limit_props(variable));
        debug!(group = ?group.key, members = len, "extrapolated group");
        output
            .extrapolated
            .push(Dataset::new(grid.clone(), values, props));
    }
    Ok(output)
}
