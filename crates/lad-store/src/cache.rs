use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use lad_core::errors::{ErrorInfo, LadderError};
use lad_core::{ObservableKind, ParameterSet};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::codec::cache_file_name;
use crate::table::{parse_entry, render_entry, Entry};

fn io_error(code: &str, err: impl ToString, path: &Path) -> LadderError {
    LadderError::Store(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

fn default_root() -> PathBuf {
    PathBuf::from("data_extracted")
}

/// Settings for a [`ResultCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding cache files.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Persist results whose bond dimension is an extrapolation descriptor.
    #[serde(default)]
    pub persist_extrapolations: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            persist_extrapolations: false,
        }
    }
}

impl CacheConfig {
    /// Cache rooted at `root` with default policy.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

/// Memoising store for derived results.
///
/// Files are never deleted or overwritten: once an entry exists every later
/// request for the same name is served from disk.
#[derive(Debug, Clone)]
pub struct ResultCache {
    config: CacheConfig,
}

impl ResultCache {
    /// Creates a cache with the given settings.
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    /// Active settings.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Absolute location of the entry for `kind` at `params`.
    pub fn path_for(&self, kind: ObservableKind, params: &ParameterSet) -> PathBuf {
        self.config.root.join(cache_file_name(kind, params))
    }

    /// Loads a stored entry, `None` when it has not been computed yet.
    pub fn lookup(
        &self,
        kind: ObservableKind,
        params: &ParameterSet,
    ) -> Result<Option<Entry>, LadderError> {
        let path = self.path_for(kind, params);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error("cache-read", err, &path)),
        };
        let entry = parse_entry(&text).map_err(|err| match err {
            LadderError::Store(info) => {
                LadderError::Store(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })?;
        debug!(path = %path.display(), "loaded cached result");
        Ok(Some(entry))
    }

    /// Returns the stored entry or evaluates, persists and returns a new one.
    ///
    /// An evaluator returning `Ok(None)` signals unmet preconditions; nothing
    /// is written so a later call retries.
    pub fn resolve<F>(
        &self,
        kind: ObservableKind,
        params: &ParameterSet,
        evaluator: F,
    ) -> Result<Option<Entry>, LadderError>
    where
        F: FnOnce(&ParameterSet) -> Result<Option<Entry>, LadderError>,
    {
        if let Some(entry) = self.lookup(kind, params)? {
            return Ok(Some(entry));
        }
        let Some(entry) = evaluator(params)? else {
            return Ok(None);
        };
        if self.should_persist(params) {
            let path = self.path_for(kind, params);
            self.persist(&path, &entry)?;
            info!(path = %path.display(), "stored new result");
        } else {
            debug!(kind = %kind, params = %params, "extrapolated result not persisted");
        }
        Ok(Some(entry))
    }

    fn should_persist(&self, params: &ParameterSet) -> bool {
        if self.config.persist_extrapolations {
            return true;
        }
        !matches!(params.bond_dim(), Ok(bond_dim) if bond_dim.extrapolation().is_some())
    }

    fn persist(&self, path: &Path, entry: &Entry) -> Result<(), LadderError> {
        let generated_on = chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S%.6f")
            .to_string();
        let body = render_entry(entry, &generated_on)?;
        let dir = &self.config.root;
        fs::create_dir_all(dir).map_err(|err| io_error("cache-dir", err, dir))?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|err| io_error("cache-temp", err, dir))?;
        tmp.write_all(body.as_bytes())
            .and_then(|_| tmp.flush())
            .map_err(|err| io_error("cache-write", err, path))?;
        match tmp.persist_noclobber(path) {
            Ok(_) => Ok(()),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "entry written concurrently, keeping existing file");
                Ok(())
            }
            Err(err) => Err(io_error("cache-persist", err.error, path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lad_core::{keys, BondDim, ControlVariable, ExtrapolationDescriptor, Props};

    fn extrapolated() -> ParameterSet {
        ParameterSet::new().with(keys::L, 32).with(
            keys::BOND_DIM,
            BondDim::from(ExtrapolationDescriptor::new(ControlVariable::Variance, 2, None)),
        )
    }

    #[test]
    fn extrapolations_are_not_persisted_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(CacheConfig::at(dir.path()));
        let entry = Entry::new(None, Props::new().with("E", -1.0));
        let out = cache
            .resolve(ObservableKind::ExtrapEnergy, &extrapolated(), |_| Ok(Some(entry.clone())))
            .unwrap();
        assert_eq!(out, Some(entry));
        assert!(!cache.path_for(ObservableKind::ExtrapEnergy, &extrapolated()).exists());
    }

    #[test]
    fn toggle_persists_extrapolations() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            root: dir.path().join("nested"),
            persist_extrapolations: true,
        };
        let cache = ResultCache::new(config);
        let entry = Entry::new(None, Props::new().with("E", -1.0));
        cache
            .resolve(ObservableKind::ExtrapEnergy, &extrapolated(), |_| Ok(Some(entry.clone())))
            .unwrap();
        let stored = cache
            .lookup(ObservableKind::ExtrapEnergy, &extrapolated())
            .unwrap();
        assert_eq!(stored, Some(entry));
    }
}
