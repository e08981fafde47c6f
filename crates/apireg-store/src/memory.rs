use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::query::{Entry, Key, Query};
use crate::traits::{Scan, StorageClient};

type Tables = HashMap<String, BTreeMap<String, Document>>;

/// In-memory storage backend.
///
/// Documents are grouped per kind and held behind a `RwLock`, so scans take a
/// consistent snapshot of one kind while writers wait. The whole store can be
/// persisted to and restored from a JSON snapshot file.
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Restore a store from a snapshot written by [`save_snapshot`](Self::save_snapshot).
    pub fn load_snapshot(path: &Path) -> StoreResult<Self> {
        let bytes = std::fs::read(path)?;
        let tables: Tables = serde_json::from_slice(&bytes)?;
        let count: usize = tables.values().map(BTreeMap::len).sum();
        debug!(path = %path.display(), documents = count, "loaded storage snapshot");
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    /// Like [`load_snapshot`](Self::load_snapshot), but an absent file yields an empty store.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if path.exists() {
            Self::load_snapshot(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Write every document to `path` as JSON.
    ///
    /// The snapshot is written to a temporary file in the same directory and
    /// renamed into place, so a crash never leaves a truncated snapshot.
    pub fn save_snapshot(&self, path: &Path) -> StoreResult<()> {
        let bytes = {
            let tables = self.read()?;
            serde_json::to_vec_pretty(&*tables)?
        };
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved storage snapshot");
        Ok(())
    }

    /// Number of documents of `kind`.
    pub fn count(&self, kind: &str) -> StoreResult<usize> {
        Ok(self.read()?.get(kind).map_or(0, BTreeMap::len))
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.values().all(BTreeMap::is_empty))
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageClient for InMemoryStorage {
    fn get(&self, key: &Key) -> StoreResult<Option<Document>> {
        let tables = self.read()?;
        Ok(tables
            .get(&key.kind)
            .and_then(|table| table.get(&key.name))
            .cloned())
    }

    fn put(&self, key: &Key, document: Document) -> StoreResult<Key> {
        let mut tables = self.write()?;
        tables
            .entry(key.kind.clone())
            .or_default()
            .insert(key.name.clone(), document);
        debug!(key = %key, "put");
        Ok(key.clone())
    }

    fn delete(&self, key: &Key) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let removed = tables
            .get_mut(&key.kind)
            .and_then(|table| table.remove(&key.name))
            .is_some();
        if removed {
            debug!(key = %key, "delete");
        }
        Ok(removed)
    }

    fn scan(&self, query: &Query) -> StoreResult<Scan<'_>> {
        let mut rows: Vec<Entry> = {
            let tables = self.read()?;
            match tables.get(query.kind()) {
                Some(table) => table
                    .iter()
                    .filter(|(_, doc)| query.matches(doc))
                    .map(|(name, doc)| Entry {
                        key: Key::new(query.kind(), name.clone()),
                        document: doc.clone(),
                    })
                    .collect(),
                None => Vec::new(),
            }
        };
        rows.sort_by(|a, b| query.compare(a, b));
        Ok(Box::new(rows.into_iter().skip(query.offset()).map(Ok)))
    }

    fn delete_matching(&self, query: &Query) -> StoreResult<usize> {
        let mut tables = self.write()?;
        let Some(table) = tables.get_mut(query.kind()) else {
            return Ok(0);
        };
        let before = table.len();
        table.retain(|_, doc| !query.matches(doc));
        let removed = before - table.len();
        if removed > 0 {
            debug!(kind = query.kind(), removed, "delete matching");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds = self.read().map(|t| t.len()).unwrap_or(0);
        f.debug_struct("InMemoryStorage")
            .field("kinds", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test documents are objects"),
        }
    }

    fn names(store: &InMemoryStorage, query: &Query) -> Vec<String> {
        store
            .scan(query)
            .unwrap()
            .map(|e| e.unwrap().key.name)
            .collect()
    }

    fn seeded() -> InMemoryStorage {
        let store = InMemoryStorage::new();
        for (name, project, t) in [("c", "p1", 3), ("a", "p1", 1), ("b", "p2", 2), ("d", "p1", 2)] {
            store
                .put(&Key::new("apis", name), doc(json!({"project_id": project, "t": t})))
                .unwrap();
        }
        store
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let store = InMemoryStorage::new();
        let key = Key::new("projects", "projects/demo");
        store.put(&key, doc(json!({"display_name": "Demo"}))).unwrap();
        let got = store.get(&key).unwrap().expect("should exist");
        assert_eq!(got.get("display_name"), Some(&json!("Demo")));
    }

    #[test]
    fn get_missing_is_none() {
        let store = InMemoryStorage::new();
        assert!(store.get(&Key::new("projects", "nope")).unwrap().is_none());
    }

    #[test]
    fn put_overwrites() {
        let store = InMemoryStorage::new();
        let key = Key::new("projects", "projects/demo");
        store.put(&key, doc(json!({"v": 1}))).unwrap();
        store.put(&key, doc(json!({"v": 2}))).unwrap();
        assert_eq!(store.get(&key).unwrap().unwrap().get("v"), Some(&json!(2)));
        assert_eq!(store.count("projects").unwrap(), 1);
    }

    #[test]
    fn kinds_are_separate() {
        let store = InMemoryStorage::new();
        store.put(&Key::new("specs", "x"), doc(json!({}))).unwrap();
        assert!(store.get(&Key::new("blobs", "x")).unwrap().is_none());
    }

    #[test]
    fn delete_reports_presence() {
        let store = InMemoryStorage::new();
        let key = Key::new("projects", "p");
        store.put(&key, doc(json!({}))).unwrap();
        assert!(store.delete(&key).unwrap());
        assert!(!store.delete(&key).unwrap());
    }

    // -----------------------------------------------------------------------
    // Scans
    // -----------------------------------------------------------------------

    #[test]
    fn scan_defaults_to_key_order() {
        assert_eq!(names(&seeded(), &Query::new("apis")), ["a", "b", "c", "d"]);
    }

    #[test]
    fn scan_with_requirement_and_order() {
        let q = Query::new("apis").require("project_id", "p1").descending("t");
        assert_eq!(names(&seeded(), &q), ["c", "d", "a"]);
    }

    #[test]
    fn scan_with_offset() {
        let q = Query::new("apis").order("t").apply_offset(2);
        assert_eq!(names(&seeded(), &q), ["d", "c"]);
    }

    #[test]
    fn scan_unknown_kind_is_empty() {
        assert!(names(&seeded(), &Query::new("nothing")).is_empty());
    }

    #[test]
    fn first_returns_head_of_scan() {
        let q = Query::new("apis").descending("t");
        let first = seeded().first(&q).unwrap().unwrap();
        assert_eq!(first.key.name, "c");
    }

    #[test]
    fn delete_matching_removes_only_matches() {
        let store = seeded();
        let removed = store
            .delete_matching(&Query::new("apis").require("project_id", "p1"))
            .unwrap();
        assert_eq!(removed, 3);
        assert_eq!(names(&store, &Query::new("apis")), ["b"]);
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        seeded().save_snapshot(&path).unwrap();

        let restored = InMemoryStorage::load_snapshot(&path).unwrap();
        assert_eq!(names(&restored, &Query::new("apis")), ["a", "b", "c", "d"]);
    }

    #[test]
    fn open_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryStorage::open(&dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty().unwrap());
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_writers() {
        let store = Arc::new(InMemoryStorage::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        store
                            .put(&Key::new("specs", format!("{i}-{j}")), doc(json!({"i": i})))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.count("specs").unwrap(), 400);
    }
}
