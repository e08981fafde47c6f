//! Core types for the API registry.
//!
//! This crate defines the vocabulary shared by every other registry crate:
//!
//! - **Resource names** ([`ProjectName`], [`ApiName`], [`VersionName`],
//!   [`SpecName`], [`SpecRevisionName`], [`ArtifactName`]) with parsing,
//!   formatting and identifier validation
//! - **Label lists** ([`LabelList`]): key-sorted name/value pairs used for
//!   labels and annotations so serialized forms are deterministic
//! - **Content digests** ([`ContentDigest`]): SHA-256 hashing that sees
//!   through gzip-encoded payloads
//! - **Revision identifiers** ([`new_revision_id`])
//! - **Clocks** ([`Clock`], [`SystemClock`], [`ManualClock`]) producing
//!   microsecond-precision timestamps

pub mod clock;
pub mod contents;
pub mod error;
pub mod labels;
pub mod names;
pub mod revision;
pub mod serde_bytes;

pub use clock::{truncate_micros, Clock, ManualClock, SystemClock};
pub use contents::{
    content_hash, gunzip, gzip, is_gzip_mime_type, strip_gzip_mime_type, ContentDigest,
};
pub use error::{Result, TypeError};
pub use labels::{Label, LabelList};
pub use names::{
    validate_identifier, validate_tag, ApiName, ArtifactName, ArtifactParent, ProjectName,
    SpecName, SpecRevisionName, VersionName, LOCATION, WILDCARD,
};
pub use revision::{new_revision_id, REVISION_ID_LEN};
