use std::fs;
use std::path::{Path, PathBuf};

use lad_core::errors::{ErrorInfo, LadderError};
use lad_store::CacheConfig;
use serde::{Deserialize, Serialize};

use crate::locate::RunLocator;

pub(crate) fn config_error(code: &str, err: impl ToString) -> LadderError {
    LadderError::Config(ErrorInfo::new(code, err.to_string()))
}

/// Settings shared by every analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Directory holding derived results.
    #[serde(default = "AnalysisConfig::default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Directory holding raw simulation runs.
    #[serde(default = "AnalysisConfig::default_raw_dir")]
    pub raw_dir: PathBuf,
    /// Inter-leg hopping of the simulated ladder.
    #[serde(default = "AnalysisConfig::default_t_perp")]
    pub t_perp: f64,
    /// Interaction label in raw run directory names.
    #[serde(default = "AnalysisConfig::default_interaction")]
    pub interaction: String,
    /// Persist results requested at an extrapolated bond dimension.
    #[serde(default)]
    pub persist_extrapolations: bool,
    /// Bond dimensions visited by extrapolations.
    #[serde(default = "AnalysisConfig::default_bond_dims")]
    pub bond_dims: Vec<u32>,
    /// Even system sizes visited by amplitude fits.
    #[serde(default = "AnalysisConfig::default_sizes")]
    pub sizes: Vec<usize>,
    /// Odd system sizes visited by amplitude fits.
    #[serde(default = "AnalysisConfig::default_odd_sizes")]
    pub odd_sizes: Vec<usize>,
    /// Window shifts averaged by mid-ladder correlation reductions.
    #[serde(default = "AnalysisConfig::default_correlation_shifts")]
    pub correlation_shifts: Vec<i64>,
    /// Largest mid-ladder density asymmetry accepted before extrapolating.
    #[serde(default = "AnalysisConfig::default_symmetry_tolerance")]
    pub symmetry_tolerance: f64,
}

impl AnalysisConfig {
    fn default_cache_dir() -> PathBuf {
        PathBuf::from("data_extracted")
    }

    fn default_raw_dir() -> PathBuf {
        PathBuf::from("data_raw")
    }

    fn default_t_perp() -> f64 {
        1.0
    }

    fn default_interaction() -> String {
        "U8".to_string()
    }

    fn default_bond_dims() -> Vec<u32> {
        vec![1200, 1600, 2000, 2800, 3200, 3600, 4000, 4800]
    }

    fn default_sizes() -> Vec<usize> {
        vec![32, 48, 64, 80, 96, 128, 160, 192]
    }

    fn default_odd_sizes() -> Vec<usize> {
        vec![33, 49, 65, 81, 97, 129]
    }

    fn default_correlation_shifts() -> Vec<i64> {
        (-5..=5).collect()
    }

    fn default_symmetry_tolerance() -> f64 {
        5e-5
    }

    /// Parses a YAML document; absent fields take their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, LadderError> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|err| config_error("config-yaml", err))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), LadderError> {
        if self.bond_dims.is_empty() {
            return Err(config_error("config-bond-dims", "bond_dims must not be empty"));
        }
        if self.correlation_shifts.is_empty() {
            return Err(config_error(
                "config-shifts",
                "correlation_shifts must not be empty",
            ));
        }
        if self.symmetry_tolerance.is_nan() || self.symmetry_tolerance < 0.0 {
            return Err(config_error(
                "config-tolerance",
                "symmetry_tolerance must be a non-negative number",
            ));
        }
        Ok(())
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            root: self.cache_dir.clone(),
            persist_extrapolations: self.persist_extrapolations,
        }
    }

    /// Raw-run locator derived from this configuration.
    pub fn locator(&self) -> RunLocator {
        RunLocator::new(self.raw_dir.clone(), self.t_perp, self.interaction.clone())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cache_dir: Self::default_cache_dir(),
            raw_dir: Self::default_raw_dir(),
            t_perp: Self::default_t_perp(),
            interaction: Self::default_interaction(),
            persist_extrapolations: false,
            bond_dims: Self::default_bond_dims(),
            sizes: Self::default_sizes(),
            odd_sizes: Self::default_odd_sizes(),
            correlation_shifts: Self::default_correlation_shifts(),
            symmetry_tolerance: Self::default_symmetry_tolerance(),
        }
    }
}

/// Loads an analysis configuration from a YAML file.
///
/// Relative cache and raw directories are resolved against the file's
/// directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AnalysisConfig, LadderError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| {
        LadderError::Config(
            ErrorInfo::new("config-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    let mut config = AnalysisConfig::from_yaml_str(&text)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    if config.cache_dir.is_relative() {
        config.cache_dir = base.join(&config.cache_dir);
    }
    if config.raw_dir.is_relative() {
        config.raw_dir = base.join(&config.raw_dir);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = AnalysisConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.correlation_shifts.len(), 11);
        assert!(!config.cache_config().persist_extrapolations);
    }

    #[test]
    fn empty_bond_dims_are_rejected() {
        let err = AnalysisConfig::from_yaml_str("bond_dims: []").unwrap_err();
        assert!(matches!(err, LadderError::Config(_)));
        assert_eq!(err.info().code, "config-bond-dims");
    }
}
