use lad_core::params::keys;
use lad_core::{ObservableKind, ParamValue, ParameterSet};

/// Parameters that contribute to a cache file name, in segment order.
///
/// Any other parameter is dropped from the name. Two sets that differ only
/// in unlisted parameters therefore map to the same file.
pub const RECOGNISED_KEYS: [&str; 7] = [
    keys::CORRELATION_TYPE,
    keys::ODD_SIZES,
    keys::L,
    keys::FILLING,
    keys::BOND_DIM,
    keys::AT_X,
    keys::AMPLITUDE_POINTS,
];

fn segment(key: &str, value: &ParamValue) -> String {
    match key {
        keys::CORRELATION_TYPE => format!("_{value}"),
        keys::ODD_SIZES => "_Lodd".to_string(),
        keys::L => format!("_L{value}"),
        keys::FILLING => format!("_n{value}"),
        keys::BOND_DIM => format!("_M{value}"),
        keys::AT_X => match value.as_f64() {
            Some(at) => format!("_at{at:.0}"),
            None => format!("_at{value}"),
        },
        keys::AMPLITUDE_POINTS => format!("_ampl_fit{value}"),
        _ => String::new(),
    }
}

/// Returns the relative cache file name for `kind` at `params`.
///
/// ```
/// use lad_core::{keys, ObservableKind, ParameterSet};
/// use lad_store::cache_file_name;
///
/// let params = ParameterSet::new()
///     .with(keys::L, 32)
///     .with(keys::FILLING, 0.875)
///     .with(keys::BOND_DIM, 1200);
/// assert_eq!(
///     cache_file_name(ObservableKind::Density, &params),
///     "density_L32_n0.875_M1200.txt"
/// );
/// ```
pub fn cache_file_name(kind: ObservableKind, params: &ParameterSet) -> String {
    let mut name = kind.name().to_string();
    for key in RECOGNISED_KEYS {
        if let Some(value) = params.get(key) {
            name.push_str(&segment(key, value));
        }
    }
    name.push_str(".txt");
    name
}
