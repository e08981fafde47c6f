use std::collections::BTreeMap;

use apireg_filter::{Field, FieldMap, FieldType, Value};
use apireg_types::{LabelList, VersionName};
use chrono::serde::ts_microseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::mask::FieldMask;
use crate::{fields, kinds, labels_value, Resource};

/// Request and response view of an API version.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionMessage {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub state: String,
    pub primary_spec: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl VersionMessage {
    fn is_populated(&self, path: &str) -> bool {
        match path {
            "display_name" => !self.display_name.is_empty(),
            "description" => !self.description.is_empty(),
            "state" => !self.state.is_empty(),
            "primary_spec" => !self.primary_spec.is_empty(),
            "labels" => !self.labels.is_empty(),
            "annotations" => !self.annotations.is_empty(),
            _ => false,
        }
    }
}

/// Stored version row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub display_name: String,
    pub description: String,
    pub state: String,
    pub primary_spec: String,
    pub labels: LabelList,
    pub annotations: LabelList,
    #[serde(with = "ts_microseconds")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    pub update_time: DateTime<Utc>,
}

impl Version {
    const UPDATABLE: &'static [&'static str] = &[
        "display_name",
        "description",
        "state",
        "primary_spec",
        "labels",
        "annotations",
    ];

    pub fn new(name: &VersionName, body: &VersionMessage, now: DateTime<Utc>) -> ModelResult<Self> {
        name.validate()?;
        Ok(Self {
            project_id: name.project_id.clone(),
            api_id: name.api_id.clone(),
            version_id: name.version_id.clone(),
            display_name: body.display_name.clone(),
            description: body.description.clone(),
            state: body.state.clone(),
            primary_spec: body.primary_spec.clone(),
            labels: LabelList::from(&body.labels),
            annotations: LabelList::from(&body.annotations),
            create_time: now,
            update_time: now,
        })
    }

    pub fn name(&self) -> VersionName {
        VersionName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
        }
    }

    pub fn update(
        &mut self,
        body: &VersionMessage,
        mask: &FieldMask,
        now: DateTime<Utc>,
    ) -> ModelResult<()> {
        for path in mask.resolve(Self::UPDATABLE, |p| body.is_populated(p))? {
            match path {
                "display_name" => self.display_name = body.display_name.clone(),
                "description" => self.description = body.description.clone(),
                "state" => self.state = body.state.clone(),
                "primary_spec" => self.primary_spec = body.primary_spec.clone(),
                "labels" => self.labels = LabelList::from(&body.labels),
                "annotations" => self.annotations = LabelList::from(&body.annotations),
                _ => {}
            }
        }
        self.update_time = now;
        Ok(())
    }

    pub fn message(&self) -> VersionMessage {
        VersionMessage {
            name: self.name().to_string(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            state: self.state.clone(),
            primary_spec: self.primary_spec.clone(),
            labels: self.labels.to_map(),
            annotations: self.annotations.to_map(),
            create_time: Some(self.create_time),
            update_time: Some(self.update_time),
        }
    }
}

impl Resource for Version {
    const KIND: &'static str = kinds::VERSIONS;

    const FIELDS: &'static [Field] = &[
        Field::new("name", FieldType::String),
        Field::new("project_id", FieldType::String),
        Field::new("api_id", FieldType::String),
        Field::new("version_id", FieldType::String),
        Field::new("display_name", FieldType::String),
        Field::new("description", FieldType::String),
        Field::new("create_time", FieldType::Timestamp),
        Field::new("update_time", FieldType::Timestamp),
        Field::new("state", FieldType::String),
        Field::new("labels", FieldType::StringMap),
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
            ("display_name", Value::from(self.display_name.as_str())),
            ("description", Value::from(self.description.as_str())),
            ("create_time", Value::from(self.create_time)),
            ("update_time", Value::from(self.update_time)),
            ("state", Value::from(self.state.as_str())),
            ("labels", labels_value(&self.labels)),
        ])
    }
}
