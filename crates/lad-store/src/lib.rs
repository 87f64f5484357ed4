#![deny(missing_docs)]
#![doc = "Parameter-keyed result cache for the ladder analysis pipeline: canonical file \
          names, the header plus table text format, and load-or-evaluate memoisation."]

/// Result cache with load-or-evaluate semantics.
pub mod cache;
/// Canonical cache file names derived from parameter sets.
pub mod codec;
/// Header and numeric table text format.
pub mod table;

pub use cache::{CacheConfig, ResultCache};
pub use codec::{cache_file_name, RECOGNISED_KEYS};
pub use table::{parse_entry, parse_header, render_entry, write_header, Entry};
