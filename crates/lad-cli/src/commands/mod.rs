use std::error::Error;
use std::path::Path;

use lad_obs::{load_config, AnalysisConfig};

pub mod prepare;
pub mod show;

/// Loads the analysis configuration, falling back to defaults.
pub fn analysis_config(path: Option<&Path>) -> Result<AnalysisConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}
