//! Storage client for the API registry.
//!
//! Registry resources are persisted as JSON documents addressed by a
//! [`Key`] (a kind plus the resource name). Backends provide point reads and
//! writes plus an ordered [`Query`] scan with equality requirements and a
//! start offset; everything above this layer (filtering, pagination,
//! revision bookkeeping) is built from those primitives.
//!
//! # Storage Backends
//!
//! All backends implement the [`StorageClient`] trait:
//!
//! - [`InMemoryStorage`] -- `HashMap`-based store with JSON snapshot files
//!
//! # Design Rules
//!
//! 1. `put` overwrites atomically per key; there are no multi-key transactions.
//! 2. Scans observe a consistent snapshot of one kind.
//! 3. Ties in the requested ordering are broken by key name, so scans are
//!    deterministic and offsets are stable between calls.
//! 4. Backends must be safe for concurrent use from many workers.

pub mod document;
pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use document::{from_document, to_document, Document};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStorage;
pub use query::{Entry, Key, Order, Query};
pub use traits::{Scan, StorageClient};
