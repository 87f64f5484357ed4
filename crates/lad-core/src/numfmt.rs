//! Number formatting shared by cache keys and raw-run patterns.

/// Formats a float the way the upstream analysis scripts rendered it.
///
/// Integral values keep a trailing `.0`, very small and very large
/// magnitudes switch to a signed two-digit exponent (`1e-05`).
pub fn py_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let abs = value.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let repr = format!("{value:e}");
        if let Some((mantissa, exponent)) = repr.split_once('e') {
            if let Ok(exponent) = exponent.parse::<i32>() {
                let sign = if exponent < 0 { '-' } else { '+' };
                return format!("{mantissa}e{sign}{:02}", exponent.abs());
            }
        }
        return repr;
    }
    let repr = format!("{value}");
    if repr.contains('.') {
        repr
    } else {
        format!("{repr}.0")
    }
}

/// Returns `count` evenly spaced samples over `[start, stop]`, both inclusive.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|idx| {
                    if idx + 1 == count {
                        stop
                    } else {
                        start + idx as f64 * step
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_values_keep_decimal_point() {
        assert_eq!(py_float(32.0), "32.0");
        assert_eq!(py_float(-0.0), "-0.0");
        assert_eq!(py_float(0.875), "0.875");
    }

    #[test]
    fn extreme_magnitudes_use_exponent() {
        assert_eq!(py_float(1e-5), "1e-05");
        assert_eq!(py_float(2.5e-7), "2.5e-07");
        assert_eq!(py_float(1e20), "1e+20");
    }

    #[test]
    fn linspace_hits_both_ends() {
        let grid = linspace(0.0, 1.0, 5);
        assert_eq!(grid, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}
