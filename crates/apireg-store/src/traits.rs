use crate::document::Document;
use crate::error::StoreResult;
use crate::query::{Entry, Key, Query};

/// Ordered iterator returned by [`StorageClient::scan`].
pub type Scan<'a> = Box<dyn Iterator<Item = StoreResult<Entry>> + Send + 'a>;

/// Key/value storage with ordered scans.
///
/// All implementations must satisfy these invariants:
/// - `put` replaces the whole document under a key atomically.
/// - `scan` yields only documents of the query's kind that satisfy every
///   requirement, ordered by the query's criteria then key name, skipping
///   the first `offset` of them.
/// - Concurrent calls from many threads are safe.
/// - All backend errors are propagated, never silently ignored.
pub trait StorageClient: Send + Sync {
    /// Read a document. Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &Key) -> StoreResult<Option<Document>>;

    /// Write a document, replacing any existing one, and return its key.
    fn put(&self, key: &Key, document: Document) -> StoreResult<Key>;

    /// Delete a document. Returns `true` if it existed.
    fn delete(&self, key: &Key) -> StoreResult<bool>;

    /// Run an ordered scan.
    fn scan(&self, query: &Query) -> StoreResult<Scan<'_>>;

    /// Delete every document matched by `query` and return how many were removed.
    ///
    /// Default implementation scans keys first, then deletes them one by one.
    /// Backends may override for bulk deletes.
    fn delete_matching(&self, query: &Query) -> StoreResult<usize> {
        let keys: Vec<Key> = self
            .scan(query)?
            .map(|entry| entry.map(|e| e.key))
            .collect::<StoreResult<_>>()?;
        let mut removed = 0;
        for key in &keys {
            if self.delete(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// First document matched by `query`, if any.
    fn first(&self, query: &Query) -> StoreResult<Option<Entry>> {
        self.scan(query)?.next().transpose()
    }
}
