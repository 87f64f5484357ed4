//! Connected density-density and rung-singlet pair-field correlators.

use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::Props;
use lad_extrap::intersect_props;
use nalgebra::{DMatrix, DVector};
use tracing::warn;

use crate::archive::{names, Measurement, Site};
use crate::lattice::DEFAULT_WIDTH;

/// Measurements consumed by [`density_correlation`].
pub const DENSDENS_MEASUREMENTS: [&str; 6] = [
    names::DENS_CORR_UP_UP,
    names::DENS_CORR_UP_DOWN,
    names::DENS_CORR_DOWN_UP,
    names::DENS_CORR_DOWN_DOWN,
    names::DENSITY_UP,
    names::DENSITY_DOWN,
];

/// Measurements consumed by [`pairfield_correlation`], with their signs.
pub const PAIRFIELD_MEASUREMENTS: [(&str, f64); 4] = [
    (names::PAIR_FIELD_1, 1.0),
    (names::PAIR_FIELD_2, -1.0),
    (names::PAIR_FIELD_3, -1.0),
    (names::PAIR_FIELD_4, 1.0),
];

/// Rung-rung correlation matrix of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    /// `L x L` matrix indexed by rung.
    pub matrix: DMatrix<f64>,
    /// Properties shared by the source measurements plus `observable`.
    pub props: Props,
}

fn site_error(site: &Site, sites: usize) -> LadderError {
    LadderError::Structure(
        ErrorInfo::new("site-out-of-range", "measurement site lies outside the ladder")
            .with_context("rung", site.rung.to_string())
            .with_context("leg", site.leg.to_string())
            .with_context("sites", sites.to_string()),
    )
}

fn select<'a>(measurements: &'a [Measurement], wanted: &[&str]) -> Option<Vec<&'a Measurement>> {
    let mut selected = Vec::with_capacity(wanted.len());
    for name in wanted {
        match Measurement::find(measurements, name) {
            Some(found) => selected.push(found),
            None => {
                warn!(measurement = *name, "measurement not found in run");
                return None;
            }
        }
    }
    Some(selected)
}

struct Geometry {
    size: usize,
    width: usize,
}

impl Geometry {
    fn from_props(props: &Props) -> Result<Self, LadderError> {
        let size = props.require_float("L")? as usize;
        let width = props.float("W").map_or(DEFAULT_WIDTH, |w| w as usize);
        Ok(Self { size, width })
    }

    fn sites(&self) -> usize {
        self.size * self.width
    }

    fn index(&self, site: &Site) -> Result<usize, LadderError> {
        if site.rung >= self.size || site.leg >= self.width {
            return Err(site_error(site, self.sites()));
        }
        Ok(site.index(self.width))
    }

    fn local(&self, measurement: &Measurement) -> Result<DVector<f64>, LadderError> {
        let mut values = DVector::zeros(self.sites());
        for point in &measurement.points {
            if let Some(site) = point.sites.first() {
                values[self.index(site)?] = point.value;
            }
        }
        Ok(values)
    }

    fn two_point(&self, measurement: &Measurement) -> Result<DMatrix<f64>, LadderError> {
        let mut values = DMatrix::zeros(self.sites(), self.sites());
        for point in &measurement.points {
            if let [a, b] = point.sites.as_slice() {
                let (i, j) = (self.index(a)?, self.index(b)?);
                values[(i, j)] = point.value;
                values[(j, i)] = point.value;
            }
        }
        Ok(values)
    }
}

/// Connected rung density-density correlation `<N_i N_j> - <N_i><N_j>`.
///
/// `N_i` is the total density on rung `i`. Returns `Ok(None)` when any of
/// the six source measurements is missing.
pub fn density_correlation(
    measurements: &[Measurement],
) -> Result<Option<CorrelationMatrix>, LadderError> {
    let Some(selected) = select(measurements, &DENSDENS_MEASUREMENTS) else {
        return Ok(None);
    };
    let mut props = intersect_props(selected.iter().map(|m| &m.props));
    let geometry = Geometry::from_props(&props)?;
    let (correlators, densities) = selected.split_at(4);

    let mut site_corr = DMatrix::zeros(geometry.sites(), geometry.sites());
    for measurement in correlators {
        site_corr += geometry.two_point(measurement)?;
    }
    let mut site_density = DVector::zeros(geometry.sites());
    for measurement in densities {
        site_density += geometry.local(measurement)?;
    }

    let width = geometry.width;
    let rung_density = DVector::from_fn(geometry.size, |i, _| {
        (0..width).map(|leg| site_density[i * width + leg]).sum::<f64>()
    });
    let matrix = DMatrix::from_fn(geometry.size, geometry.size, |i, j| {
        let mut total = 0.0;
        for a in 0..width {
            for b in 0..width {
                total += site_corr[(i * width + a, j * width + b)];
            }
        }
        total - rung_density[i] * rung_density[j]
    });

    props.insert("observable", "Density Correlation");
    Ok(Some(CorrelationMatrix { matrix, props }))
}

/// Rung-singlet pair-field correlation `P1 - P2 - P3 + P4`.
///
/// Only points of the form `((i,0), (i,1), (j,0), (j,1))` contribute.
/// Returns `Ok(None)` when any of the four source measurements is missing.
pub fn pairfield_correlation(
    measurements: &[Measurement],
) -> Result<Option<CorrelationMatrix>, LadderError> {
    let wanted: Vec<&str> = PAIRFIELD_MEASUREMENTS.iter().map(|(name, _)| *name).collect();
    let Some(selected) = select(measurements, &wanted) else {
        return Ok(None);
    };
    let mut props = intersect_props(selected.iter().map(|m| &m.props));
    let geometry = Geometry::from_props(&props)?;

    let mut matrix = DMatrix::zeros(geometry.size, geometry.size);
    for (measurement, (_, sign)) in selected.iter().zip(PAIRFIELD_MEASUREMENTS) {
        let mut term = DMatrix::zeros(geometry.size, geometry.size);
        for point in &measurement.points {
            let [a, b, c, d] = point.sites.as_slice() else {
                continue;
            };
            for site in [a, b, c, d] {
                geometry.index(site)?;
            }
            let singlets = a.rung == b.rung && c.rung == d.rung;
            if singlets && (a.leg, b.leg, c.leg, d.leg) == (0, 1, 0, 1) {
                term[(a.rung, c.rung)] = point.value;
            }
        }
        matrix += term * sign;
    }

    props.insert("observable", "Pairfield Correlation");
    Ok(Some(CorrelationMatrix { matrix, props }))
}
