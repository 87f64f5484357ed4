use lad_core::{Dataset, LadderError};
use tracing::warn;

use crate::archive::{names, Measurement};

/// Ground-state energy of one run as a single point at `x = 0`.
pub fn reduce_energy(measurements: &[Measurement]) -> Result<Option<Dataset>, LadderError> {
    let Some(energy) = Measurement::find(measurements, names::ENERGY) else {
        warn!(measurement = names::ENERGY, "measurement not found in run");
        return Ok(None);
    };
    let Some(point) = energy.points.first() else {
        return Err(LadderError::structure("empty-measurement", "energy measurement has no value"));
    };
    let props = energy.props.clone().with("observable", names::ENERGY);
    Ok(Some(Dataset::new(vec![0.0], vec![point.value], props)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MeasurementPoint;
    use lad_core::Props;

    #[test]
    fn energy_is_single_point() {
        let runs = vec![Measurement {
            name: names::ENERGY.to_string(),
            props: Props::new().with("EnergyVariance", 0.01),
            points: vec![MeasurementPoint { sites: Vec::new(), value: -10.0 }],
        }];
        let energy = reduce_energy(&runs).unwrap().unwrap();
        assert_eq!(energy.x, vec![0.0]);
        assert_eq!(energy.y, vec![-10.0]);
        assert_eq!(energy.props.float("EnergyVariance"), Some(0.01));
    }
}
