use std::path::PathBuf;

use glob::Pattern;
use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::numfmt::py_float;
use tracing::debug;

/// Number of particles per spin species for a ladder of `size` rungs.
///
/// Returns `None` when the filling does not divide the size evenly. Odd
/// ladders carry one extra particle on top of the even `size - 1` ladder.
pub fn particles_per_spin(size: usize, filling: f64) -> Option<usize> {
    if filling <= 0.0 || !filling.is_finite() {
        return None;
    }
    if size % 2 == 0 {
        let n = (filling * size as f64).floor();
        (n / filling == size as f64).then_some(n as usize)
    } else {
        let base = (filling * (size - 1) as f64).floor();
        (base / filling == (size - 1) as f64).then_some(base as usize + 1)
    }
}

/// Finds raw simulation runs on disk.
///
/// Runs live at
/// `<raw_dir>/L{L}Nu{N}Nd{N}/t{t_perp}{interaction}/*M{bond_dim}.out.res.h5`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLocator {
    raw_dir: PathBuf,
    t_perp: f64,
    interaction: String,
}

impl RunLocator {
    /// Creates a locator for the given raw directory and ladder couplings.
    pub fn new(raw_dir: PathBuf, t_perp: f64, interaction: String) -> Self {
        Self {
            raw_dir,
            t_perp,
            interaction,
        }
    }

    fn pattern(&self, size: usize, particles: usize, bond_dim: u32) -> String {
        let t_perp = py_float(self.t_perp).replace('.', "");
        let root = Pattern::escape(&self.raw_dir.to_string_lossy());
        let interaction = Pattern::escape(&self.interaction);
        format!(
            "{root}/L{size}Nu{particles}Nd{particles}/t{t_perp}{interaction}\
             /*M{bond_dim}.out.res.h5"
        )
    }

    /// Returns the run for the given parameters.
    ///
    /// When several runs match, the lexicographically last path wins.
    pub fn find(
        &self,
        size: usize,
        filling: f64,
        bond_dim: u32,
    ) -> Result<Option<PathBuf>, LadderError> {
        let Some(particles) = particles_per_spin(size, filling) else {
            debug!(size, filling, "filling does not divide the ladder size");
            return Ok(None);
        };
        let pattern = self.pattern(size, particles, bond_dim);
        let entries = glob::glob(&pattern).map_err(|err| {
            LadderError::Config(
                ErrorInfo::new("raw-pattern", err.to_string())
                    .with_context("pattern", pattern.clone()),
            )
        })?;
        let mut matches: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
        matches.sort();
        debug!(pattern = %pattern, candidates = matches.len(), "searched raw runs");
        Ok(matches.pop())
    }
}
