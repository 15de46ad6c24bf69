//! Load Cache Module
//! Memoizes reshaped tables per source path for a bounded time window.

use crate::data::loader::{DataLoadError, DataLoader};
use crate::data::processor::ObservationTable;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

struct CacheEntry {
    table: ObservationTable,
    loaded_at: Instant,
}

/// Time-bounded memo of [`DataLoader::load_observations`] results.
///
/// Lives on the UI thread and is only touched through `&mut self`.
pub struct LoadCache {
    ttl: Duration,
    period_column: String,
    entries: HashMap<PathBuf, CacheEntry>,
    revision: u64,
}

impl LoadCache {
    pub fn new(ttl: Duration, period_column: impl Into<String>) -> Self {
        Self {
            ttl,
            period_column: period_column.into(),
            entries: HashMap::new(),
            revision: 0,
        }
    }

    /// Incremented every time a file is actually read.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn load(&mut self, path: &Path) -> Result<&ObservationTable, DataLoadError> {
        let period_column = self.period_column.clone();
        self.load_with(path, Instant::now(), |p| {
            DataLoader::load_observations(p, &period_column)
        })
    }

    fn load_with<F>(
        &mut self,
        path: &Path,
        now: Instant,
        loader: F,
    ) -> Result<&ObservationTable, DataLoadError>
    where
        F: FnOnce(&Path) -> Result<ObservationTable, DataLoadError>,
    {
        let ttl = self.ttl;
        let entry = match self.entries.entry(path.to_path_buf()) {
            Entry::Occupied(occupied)
                if now.saturating_duration_since(occupied.get().loaded_at) < ttl =>
            {
                occupied.into_mut()
            }
            stale_or_missing => {
                debug!(path = %path.display(), "cache miss");
                let table = loader(path)?;
                self.revision += 1;
                info!(path = %path.display(), records = table.len(), "cached observations");
                let loaded = CacheEntry {
                    table,
                    loaded_at: now,
                };
                match stale_or_missing {
                    Entry::Occupied(mut occupied) => {
                        occupied.insert(loaded);
                        occupied.into_mut()
                    }
                    Entry::Vacant(vacant) => vacant.insert(loaded),
                }
            }
        };
        Ok(&entry.table)
    }

    pub fn invalidate(&mut self, path: &Path) {
        if self.entries.remove(path).is_some() {
            debug!(path = %path.display(), "cache entry invalidated");
        }
    }
}
