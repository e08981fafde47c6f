use std::sync::Arc;

use apireg_filter::Schema;
use apireg_models::{kinds, Blob, Resource};
use apireg_store::{from_document, to_document, Key, Query, StorageClient};
use apireg_types::{gunzip, is_gzip_mime_type, strip_gzip_mime_type, Clock, SystemClock, WILDCARD};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::cursor::{Cursor, Page, PageOptions};
use crate::error::{RegistryError, RegistryResult};

/// Payload returned by the contents getters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contents {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Handle to a registry backed by one storage client.
///
/// Cheap to clone; clones share the storage client and clock.
#[derive(Clone)]
pub struct Registry {
    storage: Arc<dyn StorageClient>,
    clock: Arc<dyn Clock>,
    config: RegistryConfig,
}

impl Registry {
    /// Create a registry over `storage` using the system clock and default config.
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self {
            storage,
            clock: Arc::new(SystemClock::new()),
            config: RegistryConfig::default(),
        }
    }

    /// Replace the clock used for timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn storage(&self) -> &dyn StorageClient {
        self.storage.as_ref()
    }

    // ---- Row helpers ----

    pub(crate) fn load<T: DeserializeOwned>(&self, kind: &str, name: &str) -> RegistryResult<Option<T>> {
        match self.storage.get(&Key::new(kind, name))? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Like [`load`](Self::load), but absence is `NotFound`.
    pub(crate) fn fetch<T: DeserializeOwned>(&self, kind: &str, name: &str) -> RegistryResult<T> {
        self.load(kind, name)?
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub(crate) fn save<T: Serialize>(&self, kind: &str, name: &str, value: &T) -> RegistryResult<()> {
        self.storage.put(&Key::new(kind, name), to_document(value)?)?;
        Ok(())
    }

    pub(crate) fn exists(&self, kind: &str, name: &str) -> RegistryResult<bool> {
        Ok(self.storage.get(&Key::new(kind, name))?.is_some())
    }

    /// Fail with `NotFound` unless the row exists.
    pub(crate) fn require(&self, kind: &str, name: &str) -> RegistryResult<()> {
        if self.exists(kind, name)? {
            Ok(())
        } else {
            Err(RegistryError::NotFound(name.to_string()))
        }
    }

    /// Fail with `AlreadyExists` if the row exists.
    pub(crate) fn require_absent(&self, kind: &str, name: &str) -> RegistryResult<()> {
        if self.exists(kind, name)? {
            Err(RegistryError::AlreadyExists(name.to_string()))
        } else {
            Ok(())
        }
    }

    /// Delete every row of `kinds` whose identifiers match `scope`.
    pub(crate) fn delete_scope(&self, scope: &[(&str, &str)], kinds: &[&str]) -> RegistryResult<usize> {
        let mut removed = 0;
        for kind in kinds {
            removed += self.storage.delete_matching(&scoped(kind, scope))?;
        }
        Ok(removed)
    }

    /// Read a blob, decompressing it unless the caller accepts gzip.
    pub(crate) fn read_blob(&self, name: &str, accept_gzip: bool) -> RegistryResult<Contents> {
        let blob: Blob = self
            .load(kinds::BLOBS, name)?
            .ok_or_else(|| RegistryError::NotFound(format!("contents of {name}")))?;
        if is_gzip_mime_type(&blob.mime_type) && !accept_gzip {
            let data = gunzip(&blob.contents)
                .map_err(|e| RegistryError::Internal(format!("stored contents of {name}: {e}")))?;
            return Ok(Contents {
                mime_type: strip_gzip_mime_type(&blob.mime_type),
                data,
            });
        }
        Ok(Contents {
            mime_type: blob.mime_type,
            data: blob.contents,
        })
    }

    // ---- Listing ----

    /// Scan-filter-collect loop shared by every List operation.
    ///
    /// Rows are scanned from the token's offset. Every consumed row advances
    /// the offset whether or not it matches; the row that would overflow a
    /// full page is left unconsumed so the next page starts with it.
    pub(crate) fn list_resources<T: Resource>(
        &self,
        query: Query,
        options: &PageOptions,
    ) -> RegistryResult<Page<T>> {
        let page_size = self.config.page_size(options.page_size)?;
        let cursor = Cursor::apply(&options.page_token, &options.filter)?;
        let filter = Schema::new(T::FIELDS).compile(&options.filter)?;

        let mut offset = cursor.offset;
        let mut items = Vec::new();
        let query = query.apply_offset(offset as usize);
        for entry in self.storage.scan(&query)? {
            let entry = entry?;
            if items.len() == page_size {
                let token = Cursor {
                    offset,
                    filter: options.filter.clone(),
                }
                .encode()?;
                debug!(kind = T::KIND, offset, returned = items.len(), "page full");
                return Ok(Page {
                    items,
                    next_page_token: token,
                });
            }
            offset += 1;
            let item: T = from_document(entry.document)?;
            if filter.is_empty() || filter.matches(&item.field_map())? {
                items.push(item);
            }
        }
        debug!(kind = T::KIND, offset, returned = items.len(), "scan exhausted");
        Ok(Page {
            items,
            next_page_token: String::new(),
        })
    }
}

/// A query over `kind` requiring each non-wildcard identifier in `scope`.
pub(crate) fn scoped(kind: &str, scope: &[(&str, &str)]) -> Query {
    scope
        .iter()
        .filter(|(_, value)| *value != WILDCARD)
        .fold(Query::new(kind), |q, (field, value)| q.require(*field, *value))
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .finish()
    }
}
