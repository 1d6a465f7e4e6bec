use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::loader::{parse_bytes, LoadOptions};
use crate::model::SensorTable;

static GLOBAL: Lazy<TableCache> = Lazy::new(TableCache::new);

type CacheKey = (PathBuf, u8);

#[derive(Debug, Clone)]
struct CacheEntry {
    modified: Option<SystemTime>,
    len: u64,
    content_hash: blake3::Hash,
    table: Arc<SensorTable>,
}

/// Read-through cache of parsed tables keyed by canonical path. Entries are
/// revalidated against file metadata on every lookup and re-parsed only when
/// the content hash changes.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static TableCache {
        &GLOBAL
    }

    pub fn get_or_load(
        &self,
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Arc<SensorTable>> {
        let path = path.as_ref();
        let canonical = fs::canonicalize(path).map_err(|err| PipelineError::io(path, err))?;
        let metadata = fs::metadata(&canonical).map_err(|err| PipelineError::io(&canonical, err))?;
        let modified = metadata.modified().ok();
        let len = metadata.len();
        let key = (canonical, options.delimiter);

        let previous = self.lock().get(&key).cloned();
        if let Some(entry) = &previous {
            if entry.modified.is_some() && entry.modified == modified && entry.len == len {
                debug!(path = %key.0.display(), "table cache hit");
                return Ok(Arc::clone(&entry.table));
            }
        }

        let content = fs::read(&key.0).map_err(|err| PipelineError::io(&key.0, err))?;
        let content_hash = blake3::hash(&content);

        let table = match previous {
            Some(entry) if entry.content_hash == content_hash => {
                debug!(path = %key.0.display(), "file touched but content unchanged");
                entry.table
            }
            _ => {
                let table = Arc::new(parse_bytes(&content, options)?);
                info!(
                    path = %key.0.display(),
                    rows = table.len(),
                    hash = %content_hash,
                    "loaded sensor table into cache"
                );
                table
            }
        };

        self.lock().insert(
            key,
            CacheEntry {
                modified,
                len,
                content_hash,
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// Drops every entry for `path`, whatever delimiter it was loaded with.
    pub fn invalidate(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(cached, _), _| *cached != canonical);
        before != entries.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT: &str = "Timestamp,Vibration Level (mm/s),Machine Speed (RPM),Production Quality Score,Optimal Conditions,Energy Consumption (kWh),Temperature (°C)\n\
2024-03-01 10:00:00,2.5,1500,88.1,True,4.2,61.0\n";

    #[test]
    fn reuses_table_until_content_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.csv");
        fs::write(&path, CONTENT).expect("write fixture");

        let cache = TableCache::new();
        let options = LoadOptions::default();
        let first = cache.get_or_load(&path, &options).expect("first load");
        let second = cache.get_or_load(&path, &options).expect("second load");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let grown = format!("{CONTENT}2024-03-01 11:00:00,2.0,1450,90.0,False,4.0,60.0\n");
        fs::write(&path, grown).expect("rewrite fixture");
        let third = cache.get_or_load(&path, &options).expect("third load");
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.len(), 2);
    }

    #[test]
    fn invalidate_forces_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.csv");
        fs::write(&path, CONTENT).expect("write fixture");

        let cache = TableCache::new();
        let options = LoadOptions::default();
        let first = cache.get_or_load(&path, &options).expect("first load");
        assert!(cache.invalidate(&path));
        assert!(cache.is_empty());
        assert!(!cache.invalidate(&path));

        let second = cache.get_or_load(&path, &options).expect("reload");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn parse_errors_are_not_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.csv");
        fs::write(&path, "Timestamp\n2024-03-01 10:00:00\n").expect("write fixture");

        let cache = TableCache::new();
        let err = cache
            .get_or_load(&path, &LoadOptions::default())
            .expect_err("schema error expected");
        assert!(matches!(err, PipelineError::Schema { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = TableCache::new()
            .get_or_load("/definitely/not/here.csv", &LoadOptions::default())
            .expect_err("missing file");
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
