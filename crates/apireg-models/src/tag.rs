use apireg_types::{SpecName, SpecRevisionName};
use chrono::serde::ts_microseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kinds;

/// A mutable alias `{spec}@{tag}` pointing at one revision ID.
///
/// Tags are stored apart from revision rows; re-tagging overwrites this row
/// and never touches a revision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpecRevisionTag {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub spec_id: String,
    pub revision_id: String,
    pub tag: String,
    #[serde(with = "ts_microseconds")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    pub update_time: DateTime<Utc>,
}

impl SpecRevisionTag {
    pub const KIND: &'static str = kinds::SPEC_REVISION_TAGS;

    pub fn new(spec: &SpecName, tag: &str, revision_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            project_id: spec.project_id.clone(),
            api_id: spec.api_id.clone(),
            version_id: spec.version_id.clone(),
            spec_id: spec.spec_id.clone(),
            revision_id: revision_id.to_string(),
            tag: tag.to_string(),
            create_time: now,
            update_time: now,
        }
    }

    pub fn spec(&self) -> SpecName {
        SpecName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
            spec_id: self.spec_id.clone(),
        }
    }

    /// Storage row name, `{spec}@{tag}`.
    pub fn key_name(&self) -> String {
        Self::key_for(&self.spec(), &self.tag)
    }

    pub fn key_for(spec: &SpecName, tag: &str) -> String {
        SpecRevisionName {
            spec: spec.clone(),
            revision_id: tag.to_string(),
        }
        .to_string()
    }
}
