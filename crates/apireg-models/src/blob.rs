use apireg_types::ContentDigest;
use chrono::serde::ts_microseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::error::ModelResult;
use crate::kinds;
use crate::spec::Spec;

/// Content payload of a spec revision or artifact.
///
/// Blobs live under the same name as their owner but in their own kind, so
/// metadata scans never load contents. The owner's identifiers are copied in
/// so that cascading deletes can match blobs by parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub spec_id: String,
    pub revision_id: String,
    pub artifact_id: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub hash: String,
    #[serde(with = "apireg_types::serde_bytes")]
    pub contents: Vec<u8>,
    #[serde(with = "ts_microseconds")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    pub update_time: DateTime<Utc>,
}

impl Blob {
    pub const KIND: &'static str = kinds::BLOBS;

    pub fn for_spec(spec: &Spec, contents: Vec<u8>, now: DateTime<Utc>) -> ModelResult<Self> {
        let digest = ContentDigest::compute(&contents, &spec.mime_type)?;
        Ok(Self {
            project_id: spec.project_id.clone(),
            api_id: spec.api_id.clone(),
            version_id: spec.version_id.clone(),
            spec_id: spec.spec_id.clone(),
            revision_id: spec.revision_id.clone(),
            artifact_id: String::new(),
            mime_type: spec.mime_type.clone(),
            size_bytes: digest.size_bytes,
            hash: digest.hash,
            contents,
            create_time: now,
            update_time: now,
        })
    }

    pub fn for_artifact(artifact: &Artifact, contents: Vec<u8>, now: DateTime<Utc>) -> ModelResult<Self> {
        let digest = ContentDigest::compute(&contents, &artifact.mime_type)?;
        Ok(Self {
            project_id: artifact.project_id.clone(),
            api_id: artifact.api_id.clone(),
            version_id: artifact.version_id.clone(),
            spec_id: artifact.spec_id.clone(),
            revision_id: artifact.revision_id.clone(),
            artifact_id: artifact.artifact_id.clone(),
            mime_type: artifact.mime_type.clone(),
            size_bytes: digest.size_bytes,
            hash: digest.hash,
            contents,
            create_time: now,
            update_time: now,
        })
    }

    /// The same payload re-homed under another spec revision.
    pub fn copy_for(&self, spec: &Spec, now: DateTime<Utc>) -> Self {
        Self {
            revision_id: spec.revision_id.clone(),
            mime_type: spec.mime_type.clone(),
            create_time: now,
            update_time: now,
            ..self.clone()
        }
    }
}
