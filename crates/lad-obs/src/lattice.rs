//! Ladder geometry helpers and correlation-matrix reductions.

use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::CorrelationType;
use nalgebra::DMatrix;

/// Number of legs assumed when the run does not report a width.
pub const DEFAULT_WIDTH: usize = 2;

fn lattice_error(code: &str, message: &str, size: usize) -> LadderError {
    LadderError::Structure(ErrorInfo::new(code, message).with_context("L", size.to_string()))
}

/// Reduces a rung-rung correlation matrix to a curve of distance vs. value.
pub fn reduce_correlation(
    corr: &DMatrix<f64>,
    correlation_type: CorrelationType,
    shifts: &[i64],
) -> Result<(Vec<f64>, Vec<f64>), LadderError> {
    let size = corr.nrows();
    match correlation_type {
        CorrelationType::FixedStart { start } => {
            if start >= size {
                return Err(lattice_error(
                    "start-out-of-range",
                    "correlation start rung lies outside the ladder",
                    size,
                ));
            }
            let y: Vec<f64> = (start + 1..size).map(|j| corr[(start, j)]).collect();
            let x = (1..=y.len()).map(|d| d as f64).collect();
            Ok((x, y))
        }
        CorrelationType::Averaged => average_around_middle(corr, shifts),
    }
}

/// Averages `C[i, i + l]` over windows centred on the middle of the ladder.
///
/// For each distance `l` the left end is `floor(L/2 - l/2 + shift)`;
/// distances run from 1 while the widest shift still fits.
pub fn average_around_middle(
    corr: &DMatrix<f64>,
    shifts: &[i64],
) -> Result<(Vec<f64>, Vec<f64>), LadderError> {
    let size = corr.nrows();
    let max_shift = shifts.iter().copied().max().ok_or_else(|| {
        lattice_error("empty-shifts", "at least one window shift is required", size)
    })?;
    let upper = size as i64 - 1 - 2 * max_shift - 2;
    let mut x = Vec::new();
    let mut y = Vec::new();
    for distance in 1..upper.max(1) {
        let mut total = 0.0;
        for shift in shifts {
            let left = (size as f64 / 2.0 - distance as f64 / 2.0 + *shift as f64).trunc() as i64;
            let right = left + distance;
            if left < 0 || right >= size as i64 {
                return Err(lattice_error(
                    "window-out-of-range",
                    "averaging window leaves the ladder",
                    size,
                ));
            }
            total += corr[(left as usize, right as usize)];
        }
        x.push(distance as f64);
        y.push(total / shifts.len() as f64);
    }
    Ok((x, y))
}

/// Difference between the rung densities on either side of the middle.
///
/// Even ladders compare rungs `L/2` and `L/2 - 1`; odd ladders compare
/// `L/2 + 1` and `L/2 - 1` around the central rung.
pub fn middle_asymmetry(density: &[f64]) -> Option<f64> {
    let size = density.len();
    let mid = size / 2;
    if mid == 0 {
        return None;
    }
    let (a, b) = if size % 2 == 0 { (mid, mid - 1) } else { (mid + 1, mid - 1) };
    Some((density.get(a)? - density.get(b)?).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance_matrix(size: usize) -> DMatrix<f64> {
        DMatrix::from_fn(size, size, |i, j| (j as f64 - i as f64).abs())
    }

    #[test]
    fn fixed_start_slices_row() {
        let corr = distance_matrix(6);
        let (x, y) =
            reduce_correlation(&corr, CorrelationType::FixedStart { start: 2 }, &[0]).unwrap();
        assert_eq!(x, vec![1.0, 2.0, 3.0]);
        assert_eq!(y, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn averaged_windows_recover_distance() {
        let corr = distance_matrix(32);
        let shifts: Vec<i64> = (-5..=5).collect();
        let (x, y) = average_around_middle(&corr, &shifts).unwrap();
        assert_eq!(x.len(), 18);
        assert_eq!(x, y);
    }

    #[test]
    fn asymmetry_uses_parity() {
        assert_eq!(middle_asymmetry(&[1.0, 0.9, 0.8, 1.0]), Some(0.09999999999999998));
        assert_eq!(middle_asymmetry(&[1.0, 0.9, 0.5, 0.9, 1.0]), Some(0.0));
    }
}
