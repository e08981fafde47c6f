//! Resource lifecycle engine for the API registry.
//!
//! [`Registry`] is the single entry point used by every outer surface. It
//! owns no global state: the storage client and clock are injected at
//! construction and shared by all callers, including concurrent workers.
//!
//! # Responsibilities
//!
//! - CRUD for projects, APIs, versions and artifacts, with cascading deletes
//! - the spec revision lifecycle: create, update (in place or forking a new
//!   revision on content change), tag, rollback and delete-revision, keeping
//!   exactly one current revision per spec
//! - filtered listing with opaque page tokens ([`PageOptions`], [`Page`])
//!
//! # Consistency
//!
//! Every write is a sequence of single-key puts. Concurrent content-changing
//! updates to the *same* spec are not serialized and can race; callers that
//! need strict ordering must serialize per spec themselves.

mod apis;
mod artifacts;
pub mod config;
pub mod cursor;
pub mod error;
mod projects;
mod registry;
mod revisions;
mod specs;
mod versions;

pub use config::RegistryConfig;
pub use cursor::{Page, PageOptions};
pub use error::{Code, RegistryError, RegistryResult};
pub use registry::{Contents, Registry};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use apireg_models::{ApiMessage, ProjectMessage, VersionMessage};
    use apireg_store::InMemoryStorage;
    use apireg_types::{ManualClock, SpecName, VersionName};

    use crate::{Registry, RegistryConfig};

    pub const VERSION: &str = "projects/demo/locations/global/apis/petstore/versions/v1";

    pub fn registry() -> Registry {
        Registry::new(Arc::new(InMemoryStorage::new()))
            .with_clock(Arc::new(ManualClock::epoch()))
            .with_config(RegistryConfig::default())
    }

    /// A registry holding project `demo`, api `petstore` and version `v1`.
    pub fn seeded() -> Registry {
        let registry = registry();
        let version = VersionName::parse(VERSION).unwrap();
        let api = version.api();
        registry
            .create_project(&api.project(), &ProjectMessage::default())
            .unwrap();
        registry.create_api(&api, &ApiMessage::default()).unwrap();
        registry
            .create_version(&version, &VersionMessage::default())
            .unwrap();
        registry
    }

    pub fn spec_name(id: &str) -> SpecName {
        VersionName::parse(VERSION).unwrap().spec(id)
    }
}
