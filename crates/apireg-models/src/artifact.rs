use std::collections::BTreeMap;

use apireg_filter::{Field, FieldMap, FieldType, Value};
use apireg_types::{
    ApiName, ArtifactName, ArtifactParent, ContentDigest, LabelList, ProjectName, SpecName,
    VersionName,
};
use chrono::serde::ts_microseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::{fields, kinds, Resource};

/// Request and response view of an artifact.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactMessage {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub hash: String,
    #[serde(with = "apireg_types::serde_bytes", skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<u8>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

/// Stored artifact row. Spec artifacts always carry a concrete revision ID.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub spec_id: String,
    pub revision_id: String,
    pub artifact_id: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub hash: String,
    pub labels: LabelList,
    pub annotations: LabelList,
    #[serde(with = "ts_microseconds")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    pub update_time: DateTime<Utc>,
}

impl Artifact {
    pub fn new(name: &ArtifactName, body: &ArtifactMessage, now: DateTime<Utc>) -> ModelResult<Self> {
        name.validate()?;
        let digest = ContentDigest::compute(&body.contents, &body.mime_type)?;
        let parent = &name.parent;
        Ok(Self {
            project_id: parent.project_id().to_string(),
            api_id: parent.api_id().to_string(),
            version_id: parent.version_id().to_string(),
            spec_id: parent.spec_id().to_string(),
            revision_id: parent.revision_id().to_string(),
            artifact_id: name.artifact_id.clone(),
            mime_type: body.mime_type.clone(),
            size_bytes: digest.size_bytes,
            hash: digest.hash,
            labels: LabelList::from(&body.labels),
            annotations: LabelList::from(&body.annotations),
            create_time: now,
            update_time: now,
        })
    }

    pub fn parent(&self) -> ArtifactParent {
        let project = ProjectName::new(self.project_id.clone());
        if self.api_id.is_empty() {
            return ArtifactParent::Project(project);
        }
        let api = ApiName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
        };
        if self.version_id.is_empty() {
            return ArtifactParent::Api(api);
        }
        let version: VersionName = api.version(self.version_id.clone());
        if self.spec_id.is_empty() {
            return ArtifactParent::Version(version);
        }
        let spec: SpecName = version.spec(self.spec_id.clone());
        ArtifactParent::Spec(spec.revision(self.revision_id.clone()))
    }

    pub fn name(&self) -> ArtifactName {
        self.parent().artifact(self.artifact_id.clone())
    }

    pub fn message(&self) -> ArtifactMessage {
        ArtifactMessage {
            name: self.name().to_string(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes,
            hash: self.hash.clone(),
            contents: Vec::new(),
            labels: self.labels.to_map(),
            annotations: self.annotations.to_map(),
            create_time: Some(self.create_time),
            update_time: Some(self.update_time),
        }
    }
}

impl Resource for Artifact {
    const KIND: &'static str = kinds::ARTIFACTS;

    const FIELDS: &'static [Field] = &[
        Field::new("name", FieldType::String),
        Field::new("project_id", FieldType::String),
        Field::new("api_id", FieldType::String),
        Field::new("version_id", FieldType::String),
        Field::new("spec_id", FieldType::String),
        Field::new("artifact_id", FieldType::String),
        Field::new("create_time", FieldType::Timestamp),
        Field::new("update_time", FieldType::Timestamp),
        Field::new("mime_type", FieldType::String),
        Field::new("size_bytes", FieldType::Int),
    ];

    fn key_name(&self) -> String {
        self.name().to_string()
    }

    fn field_map(&self) -> FieldMap {
        fields([
            ("name", Value::from(self.name().to_string())),
            ("project_id", Value::from(self.project_id.as_str())),
            ("api_id", Value::from(self.api_id.as_str())),
            ("version_id", Value::from(self.version_id.as_str())),
            ("spec_id", Value::from(self.spec_id.as_str())),
            ("artifact_id", Value::from(self.artifact_id.as_str())),
            ("create_time", Value::from(self.create_time)),
            ("update_time", Value::from(self.update_time)),
            ("mime_type", Value::from(self.mime_type.as_str())),
            ("size_bytes", Value::Int(self.size_bytes)),
        ])
    }
}
