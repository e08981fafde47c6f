//! Resource models for the API registry.
//!
//! Each stored kind is a plain serde struct holding identifiers, metadata and
//! microsecond timestamps. Models know how to:
//!
//! - build themselves from a request message ([`ProjectMessage`], ...)
//! - apply a [`FieldMask`]-driven update
//! - render their message view
//! - flatten into a [`FieldMap`](apireg_filter::FieldMap) for filtering
//!
//! Storage keys are `(kind, name)` pairs; the kind constants live in [`kinds`].

pub mod api;
pub mod artifact;
pub mod blob;
pub mod error;
pub mod mask;
pub mod project;
pub mod spec;
pub mod tag;
pub mod version;

use apireg_filter::{Field, FieldMap, Value};
use apireg_types::LabelList;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use api::{Api, ApiMessage};
pub use artifact::{Artifact, ArtifactMessage};
pub use blob::Blob;
pub use error::{ModelError, ModelResult};
pub use mask::FieldMask;
pub use project::{Project, ProjectMessage};
pub use spec::{ContentsChange, Currency, Spec, SpecMessage};
pub use tag::SpecRevisionTag;
pub use version::{Version, VersionMessage};

/// Storage kinds, one per model.
pub mod kinds {
    pub const PROJECTS: &str = "projects";
    pub const APIS: &str = "apis";
    pub const VERSIONS: &str = "versions";
    pub const SPECS: &str = "specs";
    pub const SPEC_REVISION_TAGS: &str = "spec_revision_tags";
    pub const ARTIFACTS: &str = "artifacts";
    pub const BLOBS: &str = "blobs";
}

/// A listable stored resource.
pub trait Resource: Serialize + DeserializeOwned {
    /// Storage kind.
    const KIND: &'static str;

    /// Fields that list filters may reference.
    const FIELDS: &'static [Field];

    /// Name of the storage row. Spec rows are revision-qualified.
    fn key_name(&self) -> String;

    /// Flattened values for filter evaluation.
    fn field_map(&self) -> FieldMap;
}

pub(crate) fn labels_value(labels: &LabelList) -> Value {
    Value::Map(labels.to_map())
}

pub(crate) fn fields<const N: usize>(pairs: [(&str, Value); N]) -> FieldMap {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
