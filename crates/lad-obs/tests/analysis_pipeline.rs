use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use lad_core::{
    keys, BondDim, ControlVariable, CorrelationType, ExtrapolationDescriptor, LadderError,
    ObservableKind, ParameterSet, Props,
};
use lad_obs::{
    names, Analysis, AnalysisConfig, FriedelProfile, Measurement, MeasurementPoint, ProfileModel,
    RawArchive, Site, UnavailableArchive,
};

const BOND_DIMS: [u32; 4] = [1200, 1600, 2000, 2800];
const ENERGIES: [f64; 4] = [-10.0, -10.05, -10.08, -10.095];
const VARIANCES: [f64; 4] = [0.01, 0.0075, 0.005, 0.0025];
const PROFILE: [f64; 3] = [1.75, 0.05, 0.6];
/// Run whose middle rung is perturbed so the symmetry filter rejects it.
const ASYMMETRIC_RUN: (usize, u32) = (48, 2800);

/// Connected rung density-density correlation at distance `r` in the exact limit.
fn densdens_at(r: usize) -> f64 {
    0.1 / ((r + 1) as f64).powi(2)
}

/// Rung-singlet pair-field correlation at distance `r` in the exact limit.
fn pairfield_at(r: usize) -> f64 {
    0.2 / (r + 1) as f64
}

fn site_of(index: usize) -> Site {
    Site::new(index / 2, index % 2)
}

/// Synthetic archive: Friedel density profiles and a fixed energy table.
#[derive(Default)]
struct SyntheticArchive {
    loads: Cell<usize>,
}

fn parse_run(run: &Path) -> (usize, f64, u32) {
    let file = run.file_name().unwrap().to_str().unwrap();
    let bond_dim = file
        .rsplit_once('M')
        .unwrap()
        .1
        .trim_end_matches(".out.res.h5")
        .parse()
        .unwrap();
    let dir = run.parent().unwrap().parent().unwrap();
    let dir = dir.file_name().unwrap().to_str().unwrap();
    let (size, rest) = dir.trim_start_matches('L').split_once("Nu").unwrap();
    let nup = rest.split_once("Nd").unwrap().0;
    (size.parse().unwrap(), nup.parse().unwrap(), bond_dim)
}

impl RawArchive for SyntheticArchive {
    fn load_measurements(
        &self,
        run: &Path,
        wanted: &[&str],
    ) -> Result<Vec<Measurement>, LadderError> {
        self.loads.set(self.loads.get() + 1);
        let (size, nup, bond_dim) = parse_run(run);
        let slot = BOND_DIMS.iter().position(|m| *m == bond_dim).unwrap();
        let truncated_weight = 1e-3 / f64::from(bond_dim);
        let props = Props::new()
            .with("L", size)
            .with("t'", 1.0)
            .with("Nup_total", nup)
            .with("Ndown_total", nup)
            .with("max_bond_dimension", bond_dim)
            .with("EnergyVariance", VARIANCES[slot])
            .with("TruncatedWeight", truncated_weight);
        let model = FriedelProfile::new(size as f64, size as f64 - nup);
        let spin_density = |site: Site| {
            let mut value = model.eval(site.rung as f64 + 0.5, &PROFILE) / 4.0;
            if (size, bond_dim) == ASYMMETRIC_RUN && site.rung == size / 2 {
                value += 2.5e-4;
            }
            value
        };

        let mut out = Vec::new();
        for name in wanted {
            let points = match *name {
                names::ENERGY => vec![MeasurementPoint {
                    sites: Vec::new(),
                    value: ENERGIES[slot],
                }],
                names::DENSITY_UP | names::DENSITY_DOWN => (0..2 * size)
                    .map(site_of)
                    .map(|site| MeasurementPoint {
                        sites: vec![site],
                        value: spin_density(site),
                    })
                    .collect(),
                names::DENS_CORR_UP_UP
                | names::DENS_CORR_UP_DOWN
                | names::DENS_CORR_DOWN_UP
                | names::DENS_CORR_DOWN_DOWN => {
                    let scale = 1.0 + 10.0 * VARIANCES[slot];
                    let mut points = Vec::new();
                    for a in 0..2 * size {
                        for b in a..2 * size {
                            let (sa, sb) = (site_of(a), site_of(b));
                            let connected = densdens_at(sa.rung.abs_diff(sb.rung)) * scale / 16.0;
                            points.push(MeasurementPoint {
                                sites: vec![sa, sb],
                                value: spin_density(sa) * spin_density(sb) + connected,
                            });
                        }
                    }
                    points
                }
                names::PAIR_FIELD_1
                | names::PAIR_FIELD_2
                | names::PAIR_FIELD_3
                | names::PAIR_FIELD_4 => {
                    let weight = match *name {
                        names::PAIR_FIELD_1 => 2.0,
                        names::PAIR_FIELD_4 => 0.0,
                        _ => 0.5,
                    };
                    let mut points = Vec::new();
                    for i in 0..size {
                        for j in 0..size {
                            let value = pairfield_at(i.abs_diff(j)) + 100.0 * truncated_weight;
                            points.push(MeasurementPoint {
                                sites: vec![
                                    Site::new(i, 0),
                                    Site::new(i, 1),
                                    Site::new(j, 0),
                                    Site::new(j, 1),
                                ],
                                value: weight * value,
                            });
                        }
                    }
                    points
                }
                _ => continue,
            };
            out.push(Measurement {
                name: name.to_string(),
                props: props.clone(),
                points,
            });
        }
        Ok(out)
    }
}

fn touch_run(raw: &Path, size: usize, nup: usize, bond_dim: u32) {
    let dir = raw.join(format!("L{size}Nu{nup}Nd{nup}")).join("t10U8");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("sim.M{bond_dim}.out.res.h5")), b"").unwrap();
}

fn setup(root: &Path) -> AnalysisConfig {
    let raw = root.join("raw");
    for (size, nup) in [(32, 28), (48, 42), (64, 56)] {
        for bond_dim in BOND_DIMS {
            touch_run(&raw, size, nup, bond_dim);
        }
    }
    AnalysisConfig {
        cache_dir: root.join("cache"),
        raw_dir: raw,
        bond_dims: BOND_DIMS.to_vec(),
        sizes: vec![32, 48, 64],
        ..AnalysisConfig::default()
    }
}

fn single(size: usize, bond_dim: u32) -> ParameterSet {
    ParameterSet::new()
        .with(keys::L, size)
        .with(keys::FILLING, 0.875)
        .with(keys::BOND_DIM, BondDim::Fixed(bond_dim))
}

fn variance(num_points: Option<usize>) -> BondDim {
    BondDim::from(ExtrapolationDescriptor::new(ControlVariable::Variance, 2, num_points))
}

fn cache_path(config: &AnalysisConfig, name: &str) -> PathBuf {
    config.cache_dir.join(name)
}

#[test]
fn cached_density_does_not_touch_archive_again() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let archive = SyntheticArchive::default();
    let analysis = Analysis::new(config.clone(), &archive);

    let first = analysis.dataset(ObservableKind::Density, &single(32, 1200)).unwrap().unwrap();
    assert_eq!(archive.loads.get(), 1);
    assert_eq!(first.len(), 32);
    assert_eq!(first.props.text("observable"), Some("Rung density"));
    assert!(cache_path(&config, "density_L32_n0.875_M1200.txt").exists());

    let second = analysis.dataset(ObservableKind::Density, &single(32, 1200)).unwrap().unwrap();
    assert_eq!(archive.loads.get(), 1);
    assert_eq!(first, second);
}

#[test]
fn missing_raw_run_is_absent_and_not_stored() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let analysis = Analysis::new(config.clone(), SyntheticArchive::default());

    let result = analysis.result(ObservableKind::Density, &single(80, 1200)).unwrap();
    assert!(result.is_none());
    assert!(!cache_path(&config, "density_L80_n0.875_M1200.txt").exists());
}

#[test]
fn unavailable_archive_only_fails_on_raw_loads() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    Analysis::new(config.clone(), SyntheticArchive::default())
        .result(ObservableKind::Energy, &single(32, 1200))
        .unwrap()
        .unwrap();

    let offline = Analysis::new(config, UnavailableArchive);
    let cached = offline.dataset(ObservableKind::Energy, &single(32, 1200)).unwrap().unwrap();
    assert_eq!(cached.y, vec![-10.0]);

    let err = offline.result(ObservableKind::Energy, &single(32, 1600)).unwrap_err();
    assert!(matches!(err, LadderError::Collaborator(_)));
    assert_eq!(err.info().code, "archive-unavailable");
}

#[test]
fn energy_extrapolation_improves_with_all_points() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let archive = SyntheticArchive::default();
    let analysis = Analysis::new(config.clone(), &archive);

    let params = |num_points| {
        ParameterSet::new()
            .with(keys::L, 32)
            .with(keys::FILLING, 0.875)
            .with(keys::BOND_DIM, variance(num_points))
    };
    let three = analysis.dataset(ObservableKind::ExtrapEnergy, &params(Some(3))).unwrap().unwrap();
    let all = analysis.dataset(ObservableKind::ExtrapEnergy, &params(None)).unwrap().unwrap();

    assert_eq!(archive.loads.get(), BOND_DIMS.len());
    assert_eq!(three.x, vec![0.0025, 0.005, 0.0075, 0.01]);
    let r2_three = three.props.float("fitted_r2").unwrap();
    let r2_all = all.props.float("fitted_r2").unwrap();
    assert!(r2_three < r2_all);
    assert!((all.props.float("fitted_energy").unwrap() + 10.09125).abs() < 1e-9);
    assert!((all.props.float("fitted_energy_error").unwrap() - 0.001875).abs() < 1e-9);
    assert_eq!(all.props.text("extrap_type"), Some("extrap_variance_deg2_numAll"));
    let uncached = "extrap_energy_L32_n0.875_Mextrap_variance_deg2_numAll.txt";
    assert!(!cache_path(&config, uncached).exists());
}

#[test]
fn amplitude_scaling_recovers_luttinger_parameter() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let analysis = Analysis::new(config.clone(), SyntheticArchive::default());
    let params = ParameterSet::new()
        .with(keys::FILLING, 0.875)
        .with(keys::BOND_DIM, BondDim::Fixed(1200));

    let krho = analysis.krho(&params).unwrap().unwrap();
    assert!((krho - 1.2).abs() < 0.15, "krho = {krho}");

    let fit = analysis.dataset(ObservableKind::DensityFit, &single(48, 1200)).unwrap().unwrap();
    assert!((fit.props.float("density_fitted_Krho").unwrap() - 1.2).abs() < 1e-4);
    assert!(cache_path(&config, "density_amplitudes_n0.875_M1200.txt").exists());
}

#[test]
fn fixed_bond_dimension_cannot_request_scatter() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let analysis = Analysis::new(config, SyntheticArchive::default());
    let params = single(32, 1200).with(keys::AT_X, 16.0);
    let err = analysis.result(ObservableKind::ExtrapDensity, &params).unwrap_err();
    assert_eq!(err.info().code, "extrapolation-required");
}

fn extrapolation(variable: ControlVariable, degree: usize) -> BondDim {
    BondDim::from(ExtrapolationDescriptor::new(variable, degree, None))
}

fn sweep_params(size: usize, bond_dim: BondDim) -> ParameterSet {
    ParameterSet::new()
        .with(keys::L, size)
        .with(keys::FILLING, 0.875)
        .with(keys::BOND_DIM, bond_dim)
}

#[test]
fn density_correlation_is_cached_per_reduction() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let analysis = Analysis::new(config.clone(), SyntheticArchive::default());
    let scale = 1.0 + 10.0 * VARIANCES[0];

    let start =
        single(32, 1200).with(keys::CORRELATION_TYPE, CorrelationType::FixedStart { start: 4 });
    let fixed = analysis.dataset(ObservableKind::Densdens, &start).unwrap().unwrap();
    assert_eq!(fixed.len(), 27);
    assert_eq!(fixed.x[0], 1.0);
    for (x, y) in fixed.x.iter().zip(&fixed.y) {
        assert!((y - densdens_at(*x as usize) * scale).abs() < 1e-12, "x = {x}");
    }
    assert_eq!(fixed.props.text("correlation_type"), Some("start4"));
    assert_eq!(fixed.props.text("observable"), Some("Density Correlation"));
    assert!(cache_path(&config, "densdens_start4_L32_n0.875_M1200.txt").exists());

    let avg = single(32, 1200).with(keys::CORRELATION_TYPE, CorrelationType::Averaged);
    let averaged = analysis.dataset(ObservableKind::Densdens, &avg).unwrap().unwrap();
    assert_eq!(averaged.len(), 18);
    for (x, y) in averaged.x.iter().zip(&averaged.y) {
        assert!((y - densdens_at(*x as usize) * scale).abs() < 1e-12, "x = {x}");
    }
    assert!(cache_path(&config, "densdens_avg_L32_n0.875_M1200.txt").exists());
}

#[test]
fn pairfield_extrapolates_in_truncated_weight() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let archive = SyntheticArchive::default();
    let analysis = Analysis::new(config.clone(), &archive);
    let params = sweep_params(32, extrapolation(ControlVariable::Truncation, 1))
        .with(keys::CORRELATION_TYPE, CorrelationType::Averaged);

    let pairfield = analysis.dataset(ObservableKind::Pairfield, &params).unwrap().unwrap();
    assert_eq!(archive.loads.get(), BOND_DIMS.len());
    assert_eq!(pairfield.props.text("extrap_type"), Some("extrap_truncation_deg1_numAll"));
    assert_eq!(pairfield.props.float("TruncatedWeight"), Some(0.0));
    assert_eq!(pairfield.props.text("max_bond_dimension"), Some("inf"));
    assert_eq!(pairfield.len(), 18);
    for (x, y) in pairfield.x.iter().zip(&pairfield.y) {
        assert!((y - pairfield_at(*x as usize)).abs() < 1e-8, "x = {x}");
    }
    assert!(cache_path(&config, "pairfield_avg_L32_n0.875_M2800.txt").exists());
    let uncached = "pairfield_avg_L32_n0.875_Mextrap_truncation_deg1_numAll.txt";
    assert!(!cache_path(&config, uncached).exists());
}

#[test]
fn density_correlation_scatter_at_distance() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let analysis = Analysis::new(config, SyntheticArchive::default());
    let params = sweep_params(32, extrapolation(ControlVariable::Variance, 1))
        .with(keys::CORRELATION_TYPE, CorrelationType::FixedStart { start: 4 })
        .with(keys::AT_X, 3.0);

    let scatter = analysis.dataset(ObservableKind::ExtrapDensdens, &params).unwrap().unwrap();
    assert_eq!(scatter.x, vec![0.0025, 0.005, 0.0075, 0.01]);
    for (variance, y) in scatter.x.iter().zip(&scatter.y) {
        assert!((y - densdens_at(3) * (1.0 + 10.0 * variance)).abs() < 1e-12);
    }
    assert_eq!(scatter.props.float("fitted_x"), Some(3.0));
    assert_eq!(scatter.props.text("line"), Some("scatter"));
    assert_eq!(scatter.props.text("extrap_type"), Some("extrap_variance_deg1_numAll"));
    assert!((scatter.props.float("fitted_value").unwrap() - densdens_at(3)).abs() < 1e-10);
}

#[test]
fn asymmetric_runs_are_left_out_of_density_extrapolation() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    let analysis = Analysis::new(config, SyntheticArchive::default());
    let (size, _) = ASYMMETRIC_RUN;
    let params = sweep_params(size, extrapolation(ControlVariable::Variance, 1));

    let profile = analysis.dataset(ObservableKind::Density, &params).unwrap().unwrap();
    assert_eq!(profile.len(), size);
    assert_eq!(profile.props.text("extrap_type"), Some("extrap_variance_deg1_numAll"));
    let model = FriedelProfile::new(size as f64, 6.0);
    for (x, y) in profile.x.iter().zip(&profile.y) {
        assert!((y - model.eval(*x, &PROFILE)).abs() < 1e-10, "x = {x}");
    }

    let at_middle = params.with(keys::AT_X, 24.0);
    let scatter = analysis.dataset(ObservableKind::ExtrapDensity, &at_middle).unwrap().unwrap();
    assert_eq!(scatter.props.float("fitted_x"), Some(24.5));
    assert_eq!(scatter.x, vec![0.005, 0.0075, 0.01]);
    assert_eq!(scatter.props.array("bond_dims"), Some(&[2000.0, 1600.0, 1200.0][..]));
}

#[test]
fn odd_pair_counts_leave_no_amplitude_fit() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path());
    for (size, nup) in [(32, 30), (48, 45), (64, 60)] {
        touch_run(&config.raw_dir, size, nup, 1200);
    }
    let analysis = Analysis::new(config.clone(), SyntheticArchive::default());
    let params = ParameterSet::new()
        .with(keys::FILLING, 0.9375)
        .with(keys::BOND_DIM, BondDim::Fixed(1200));

    assert_eq!(analysis.krho(&params).unwrap(), None);
    assert!(!cache_path(&config, "density_amplitudes_n0.9375_M1200.txt").exists());
}
