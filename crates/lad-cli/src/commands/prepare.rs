use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use lad_obs::{load_plan, Analysis, UnavailableArchive};
use tracing::{info, warn};

use super::analysis_config;

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// YAML analysis configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// YAML sweep plan listing the results to prepare.
    #[arg(long)]
    pub plan: PathBuf,
}

pub fn run(args: &PrepareArgs) -> Result<(), Box<dyn Error>> {
    let config = analysis_config(args.config.as_deref())?;
    let plan = load_plan(&args.plan)?;
    let jobs = plan.jobs()?;
    let analysis = Analysis::new(config, UnavailableArchive);

    let (mut ready, mut absent, mut failed) = (0usize, 0usize, 0usize);
    for (kind, params) in &jobs {
        match analysis.result(*kind, params) {
            Ok(Some(_)) => ready += 1,
            Ok(None) => absent += 1,
            Err(err) => {
                failed += 1;
                warn!(kind = %kind, params = %params, error = %err, "job failed");
            }
        }
    }
    info!(jobs = jobs.len(), ready, absent, failed, "cache preparation finished");
    Ok(())
}
