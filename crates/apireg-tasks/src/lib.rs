//! Bulk work over the API registry.
//!
//! A [`WorkerPool`] runs a fixed number of workers over one bounded queue of
//! [`Task`]s. Bulk commands page through resources with the spec visitor and
//! submit one task per resource; `wait()` returns once every task has run.
//! Individual task failures are logged and counted, never propagated.
//!
//! Registry calls are synchronous. Tasks run them on Tokio's blocking pool
//! through [`blocking`] so workers never stall the async runtime.

pub mod conformance;
pub mod context;
pub mod error;
pub mod import;
pub mod lint;
pub mod pool;
pub mod visitor;

use apireg_engine::{Registry, RegistryResult};

pub use conformance::{ConformanceReport, ConformanceTask, StyleGuide};
pub use context::{CancelHandle, TaskContext};
pub use error::{TaskError, TaskResult};
pub use import::{import_directory, ImportTask};
pub use lint::{LintReport, LintTask, Linter, Linters, TextLinter};
pub use pool::{PoolConfig, PoolSummary, Task, WorkerPool};
pub use visitor::{pinned, visit_specs};

/// Run a registry call on the blocking thread pool.
pub async fn blocking<T, F>(registry: &Registry, call: F) -> TaskResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Registry) -> RegistryResult<T> + Send + 'static,
{
    let registry = registry.clone();
    Ok(tokio::task::spawn_blocking(move || call(&registry)).await??)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use apireg_engine::Registry;
    use apireg_models::SpecMessage;
    use apireg_store::InMemoryStorage;
    use apireg_types::{ManualClock, VersionName};

    use crate::import::ensure_version;

    pub const VERSION: &str = "projects/demo/locations/global/apis/petstore/versions/v1";

    pub fn registry() -> Registry {
        Registry::new(Arc::new(InMemoryStorage::new())).with_clock(Arc::new(ManualClock::epoch()))
    }

    /// A registry with one YAML spec per id under [`VERSION`]. Each spec's
    /// only line ends in a space. Returns the revision ids in order.
    pub fn registry_with_specs(ids: &[&str]) -> (Registry, Vec<String>) {
        let registry = registry();
        let version = VersionName::parse(VERSION).unwrap();
        ensure_version(&registry, &version).unwrap();
        let revisions = ids
            .iter()
            .map(|id| {
                let body = SpecMessage {
                    filename: format!("{id}.yaml"),
                    mime_type: "application/x.openapi+yaml".into(),
                    contents: format!("openapi: {id} \n").into_bytes(),
                    ..Default::default()
                };
                registry
                    .create_spec(&version.spec(*id), &body)
                    .unwrap()
                    .revision_id
            })
            .collect();
        (registry, revisions)
    }
}
