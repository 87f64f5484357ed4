use lad_core::errors::{ErrorInfo, LadderError};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

fn fit_error(code: &str, message: impl Into<String>) -> LadderError {
    LadderError::Fit(ErrorInfo::new(code, message))
}

/// Polynomial with coefficients in ascending powers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    /// Creates a polynomial from ascending coefficients.
    pub fn new(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    /// Coefficients, constant term first.
    pub fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    /// Coefficients, highest power first.
    pub fn descending(&self) -> Vec<f64> {
        self.coeffs.iter().rev().copied().collect()
    }

    /// Value at zero.
    pub fn constant(&self) -> f64 {
        self.coeffs.first().copied().unwrap_or(0.0)
    }

    /// Degree of the polynomial.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Evaluates the polynomial with Horner's scheme.
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}

/// Least-squares fit result.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyFit {
    /// Fitted polynomial.
    pub polynomial: Polynomial,
    /// Coefficient covariance in ascending order, when estimable.
    pub covariance: Option<DMatrix<f64>>,
    /// Sum of squared residuals over the fitted points.
    pub residual: f64,
}

/// Fits a polynomial of `degree` to the points by least squares.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Polynomial, LadderError> {
    fit(x, y, degree).map(|fit| fit.polynomial)
}

/// Like [`polyfit`], also estimating the coefficient covariance.
///
/// The covariance is scaled by `SS_res / (n - (degree + 1))` and is only
/// reported when more than two points and more points than coefficients
/// are fitted.
pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<PolyFit, LadderError> {
    if x.len() != y.len() {
        return Err(LadderError::Fit(
            ErrorInfo::new("length-mismatch", "x and y differ in length")
                .with_context("x", x.len().to_string())
                .with_context("y", y.len().to_string()),
        ));
    }
    let order = degree + 1;
    let n = x.len();
    if n < order {
        return Err(LadderError::Fit(
            ErrorInfo::new("underdetermined", "fewer points than coefficients")
                .with_context("points", n.to_string())
                .with_context("degree", degree.to_string()),
        ));
    }
    if x.iter().chain(y).any(|value| !value.is_finite()) {
        return Err(fit_error("non-finite-input", "fit input contains NaN or infinity"));
    }

    let mut design = DMatrix::from_fn(n, order, |row, col| x[row].powi(col as i32));
    let scales: Vec<f64> = (0..order)
        .map(|col| {
            let norm = design.column(col).norm();
            if norm > 0.0 {
                norm
            } else {
                1.0
            }
        })
        .collect();
    for (col, scale) in scales.iter().enumerate() {
        design.column_mut(col).unscale_mut(*scale);
    }

    let rhs = DVector::from_column_slice(y);
    let svd = design.clone().svd(true, true);
    let tolerance = svd.singular_values.max() * n as f64 * f64::EPSILON;
    let scaled = svd
        .solve(&rhs, tolerance)
        .map_err(|err| fit_error("svd-solve", err))?;
    let coeffs: Vec<f64> = scaled
        .iter()
        .zip(&scales)
        .map(|(coeff, scale)| coeff / scale)
        .collect();
    let polynomial = Polynomial::new(coeffs);

    let residual: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - polynomial.eval(*xi)).powi(2))
        .sum();

    let covariance = if n > 2 && n > order {
        let factor = residual / (n - order) as f64;
        (design.transpose() * &design).try_inverse().map(|base| {
            DMatrix::from_fn(order, order, |i, j| base[(i, j)] / (scales[i] * scales[j]) * factor)
        })
    } else {
        None
    };

    Ok(PolyFit {
        polynomial,
        covariance,
        residual,
    })
}

/// Coefficient of determination of `poly` against the points.
///
/// Computed as `1 - SS_res / SS_tot`. A constant series scores 1.0 when it
/// is reproduced exactly and 0.0 otherwise.
pub fn r_squared(x: &[f64], y: &[f64], poly: &Polynomial) -> f64 {
    if y.is_empty() {
        return f64::NAN;
    }
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let ss_tot: f64 = y.iter().map(|yi| (yi - mean).powi(2)).sum();
    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - poly.eval(*xi)).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
