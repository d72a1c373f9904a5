// ja4lens/src/state/db.rs
//
// FingerprintDb: the dataset plus its indexes, built once and shared by Arc.
//
// Lifecycle:
//   - `open` / `from_json_str` / `from_records` build eagerly
//   - `SharedDb` defers the build to first use behind a lock so concurrent
//     first callers trigger exactly one build
//   - nothing is ever patched in place; a new snapshot means a new FingerprintDb
//
// Snapshot format: a JSON array of Record objects. A snapshot that is missing,
// unreadable or not an array is fatal. Individual entries that fail to parse
// are logged and skipped.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::classify;
use crate::engine::{aggregate, suggest};
use crate::error::DbError;
use crate::grammar;
use crate::model::{AggregatedResult, FingerprintFamily, ParsedJa4, Record, RecordId, Suggestion};
use crate::state::index::IndexStore;

pub struct FingerprintDb {
    records:   Vec<Record>,
    index:     IndexStore,
    skipped:   usize,
    loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub total_records:       usize,
    pub unique_fingerprints: usize,
    pub per_family:          Vec<(FingerprintFamily, usize)>,
    pub skipped_records:     usize,
    pub loaded_at:           DateTime<Utc>,
}

impl FingerprintDb {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self::build(records, 0)
    }

    pub fn from_json_str(json: &str) -> Result<Self, DbError> {
        let entries = match serde_json::from_str::<Value>(json)? {
            Value::Array(entries) => entries,
            other => return Err(DbError::NotAnArray(json_kind(&other))),
        };

        let mut records = Vec::with_capacity(entries.len());
        let mut skipped = 0usize;
        for (pos, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Record>(entry) {
                Ok(rec) => records.push(rec),
                Err(e) => {
                    skipped += 1;
                    warn!("Skipping malformed record #{}: {}", pos, e);
                }
            }
        }
        Ok(Self::build(records, skipped))
    }

    pub fn open(path: &Path) -> Result<Self, DbError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    fn build(records: Vec<Record>, skipped: usize) -> Self {
        let index = IndexStore::build(&records);
        info!(
            "Database loaded: {} records, {} unique fingerprints{}",
            records.len(),
            index.unique_fingerprints(),
            if skipped > 0 { format!(", {} skipped", skipped) } else { String::new() },
        );
        Self { records, index, skipped, loaded_at: Utc::now() }
    }

    // ── Query surface ─────────────────────────────────────────────────────────

    pub fn detect(&self, input: &str) -> Option<FingerprintFamily> {
        classify::detect(&self.index, input)
    }

    pub fn search(&self, input: &str) -> Option<AggregatedResult> {
        aggregate::search(self, input)
    }

    pub fn suggest(&self, prefix: &str) -> Vec<Suggestion> {
        suggest::suggest(&self.index, prefix)
    }

    pub fn parse_display(&self, input: &str) -> Option<ParsedJa4> {
        grammar::parse_display(input)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    pub fn stats(&self) -> DbStats {
        DbStats {
            total_records:       self.records.len(),
            unique_fingerprints: self.index.unique_fingerprints(),
            per_family: FingerprintFamily::ALL
                .into_iter()
                .map(|f| (f, self.index.distinct_in(f)))
                .collect(),
            skipped_records: self.skipped,
            loaded_at:       self.loaded_at,
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_)  => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Lazy shared handle ────────────────────────────────────────────────────────

type Loader = Box<dyn Fn() -> Result<FingerprintDb, DbError> + Send + Sync>;

/// Guarded lazy handle: the first `load()` builds, every later call (from any
/// thread) gets the same `Arc`. A failed build leaves the handle empty.
pub struct SharedDb {
    cell:   OnceLock<Arc<FingerprintDb>>,
    init:   Mutex<()>,
    loader: Loader,
}

impl SharedDb {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self::with_loader(move || FingerprintDb::open(&path))
    }

    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> Result<FingerprintDb, DbError> + Send + Sync + 'static,
    {
        Self { cell: OnceLock::new(), init: Mutex::new(()), loader: Box::new(loader) }
    }

    pub fn load(&self) -> Result<Arc<FingerprintDb>, DbError> {
        if let Some(db) = self.cell.get() {
            return Ok(Arc::clone(db));
        }
        let _guard = self.init.lock();
        if let Some(db) = self.cell.get() {
            return Ok(Arc::clone(db));
        }
        let db = Arc::new((self.loader)()?);
        // Only this thread can set while holding `init`.
        let _ = self.cell.set(Arc::clone(&db));
        Ok(db)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn non_array_snapshot_is_fatal() {
        match FingerprintDb::from_json_str(r#"{"records":[]}"#) {
            Err(DbError::NotAnArray(kind)) => assert_eq!(kind, "an object"),
            other => panic!("expected NotAnArray, got {:?}", other.map(|d| d.total_records())),
        }
        assert!(matches!(FingerprintDb::from_json_str("[{"), Err(DbError::Json(_))));
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = FingerprintDb::open(Path::new("/nonexistent/ja4lens/database.json"));
        assert!(matches!(err, Err(DbError::Io { .. })));
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let db = FingerprintDb::from_json_str(
            r#"[
                {"application":"curl","verified":true,"ja4_fingerprint":"t13d1516h2_8daaf6152771_02713d6af862"},
                {"application":"broken"},
                42,
                {"application":"wget","verified":false,"ja4_fingerprint":"t13d1516h2_8daaf6152771_02713d6af862"}
            ]"#,
        ).unwrap();
        let stats = db.stats();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.skipped_records, 2);
        assert_eq!(stats.unique_fingerprints, 1);
        assert_eq!(db.record(1).and_then(|r| r.application.as_deref()), Some("wget"));
    }

    #[test]
    fn concurrent_first_use_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let shared = Arc::new(SharedDb::with_loader(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(FingerprintDb::from_records(vec![Record::default()]))
        }));
        assert!(!shared.is_loaded());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&shared);
                std::thread::spawn(move || s.load().unwrap())
            })
            .collect();
        let dbs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(dbs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(shared.is_loaded());
        // idempotent after the build
        assert!(Arc::ptr_eq(&shared.load().unwrap(), &dbs[0]));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_build_serves_nothing() {
        let shared = SharedDb::from_path("/nonexistent/ja4lens/database.json");
        assert!(shared.load().is_err());
        assert!(!shared.is_loaded());
    }
}
