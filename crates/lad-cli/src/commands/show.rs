use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use lad_core::{keys, BondDim, CorrelationType, ObservableKind, ParameterSet, Props, Table};
use lad_obs::{Analysis, UnavailableArchive};
use serde::Serialize;

use super::analysis_config;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// YAML analysis configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Observable kind, e.g. `density` or `extrap_energy`.
    #[arg(long)]
    pub kind: String,
    /// System size.
    #[arg(long = "L")]
    pub size: Option<usize>,
    /// Filling fraction.
    #[arg(long)]
    pub filling: f64,
    /// Bond dimension or extrapolation descriptor such as `extrap_variance_deg2_numAll`.
    #[arg(long)]
    pub bond_dim: String,
    /// Correlation reduction, `avg` or `start<n>`.
    #[arg(long)]
    pub correlation_type: Option<String>,
    /// Coordinate of the extrapolation scatter.
    #[arg(long)]
    pub at_x: Option<f64>,
    /// Amplitude fit point cap, or `All`.
    #[arg(long)]
    pub amplitude_points: Option<String>,
    /// Amplitude fit over odd system sizes.
    #[arg(long)]
    pub odd_sizes: bool,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    kind: ObservableKind,
    params: &'a ParameterSet,
    props: Option<Props>,
    table: Option<Table>,
}

fn parameters(args: &ShowArgs) -> Result<ParameterSet, Box<dyn Error>> {
    let mut params = ParameterSet::new()
        .with(keys::FILLING, args.filling)
        .with(keys::BOND_DIM, args.bond_dim.parse::<BondDim>()?);
    if let Some(size) = args.size {
        params.insert(keys::L, size);
    }
    if let Some(correlation_type) = &args.correlation_type {
        params.insert(keys::CORRELATION_TYPE, correlation_type.parse::<CorrelationType>()?);
    }
    if let Some(at_x) = args.at_x {
        params.insert(keys::AT_X, at_x);
    }
    if let Some(points) = &args.amplitude_points {
        let points = if points == "All" { None } else { Some(points.parse::<usize>()?) };
        params.insert(keys::AMPLITUDE_POINTS, points);
    }
    if args.odd_sizes {
        params.insert(keys::ODD_SIZES, true);
    }
    Ok(params)
}

pub fn run(args: &ShowArgs) -> Result<(), Box<dyn Error>> {
    let config = analysis_config(args.config.as_deref())?;
    let kind: ObservableKind = args.kind.parse()?;
    let params = parameters(args)?;
    let analysis = Analysis::new(config, UnavailableArchive);

    let entry = analysis.result(kind, &params)?;
    let (props, table) = match entry {
        Some(entry) => (Some(entry.props), entry.table),
        None => {
            tracing::warn!(kind = %kind, params = %params, "no result available");
            (None, None)
        }
    };
    let output = ShowOutput {
        kind,
        params: &params,
        props,
        table,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(bond_dim: &str) -> ShowArgs {
        ShowArgs {
            config: None,
            kind: "extrap_density".to_string(),
            size: Some(32),
            filling: 0.875,
            bond_dim: bond_dim.to_string(),
            correlation_type: None,
            at_x: Some(16.0),
            amplitude_points: Some("All".to_string()),
            odd_sizes: false,
        }
    }

    #[test]
    fn parameters_parse_descriptor_names() {
        let params = parameters(&args("extrap_variance_deg2_numAll")).unwrap();
        assert!(params.bond_dim().unwrap().extrapolation().is_some());
        assert_eq!(params.amplitude_points(), None);
        assert_eq!(params.get(keys::AT_X), Some(&lad_core::ParamValue::Float(16.0)));
    }

    #[test]
    fn malformed_bond_dimension_is_rejected() {
        assert!(parameters(&args("extrap_bogus")).is_err());
    }
}
