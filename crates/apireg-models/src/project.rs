use apireg_filter::{Field, FieldMap, FieldType, Value};
use apireg_types::ProjectName;
use chrono::serde::ts_microseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::mask::FieldMask;
use crate::{fields, kinds, Resource};

/// Request and response view of a project.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMessage {
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl ProjectMessage {
    fn is_populated(&self, path: &str) -> bool {
        match path {
            "display_name" => !self.display_name.is_empty(),
            "description" => !self.description.is_empty(),
            _ => false,
        }
    }
}

/// Stored project row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub display_name: String,
    pub description: String,
    #[serde(with = "ts_microseconds")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    pub update_time: DateTime<Utc>,
}

impl Project {
    const UPDATABLE: &'static [&'static str] = &["display_name", "description"];

    pub fn new(name: &ProjectName, body: &ProjectMessage, now: DateTime<Utc>) -> ModelResult<Self> {
        name.validate()?;
        Ok(Self {
            project_id: name.project_id.clone(),
            display_name: body.display_name.clone(),
            description: body.description.clone(),
            create_time: now,
            update_time: now,
        })
    }

    pub fn name(&self) -> ProjectName {
        ProjectName::new(self.project_id.clone())
    }

    pub fn update(
        &mut self,
        body: &ProjectMessage,
        mask: &FieldMask,
        now: DateTime<Utc>,
    ) -> ModelResult<()> {
        for path in mask.resolve(Self::UPDATABLE, |p| body.is_populated(p))? {
            match path {
                "display_name" => self.display_name = body.display_name.clone(),
                "description" => self.description = body.description.clone(),
                _ => {}
            }
        }
        self.update_time = now;
        Ok(())
    }

    pub fn message(&self) -> ProjectMessage {
        ProjectMessage {
            name: self.name().to_string(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            create_time: Some(self.create_time),
            update_time: Some(self.update_time),
        }
    }
}

impl Resource for Project {
    const KIND: &'static str = kinds::PROJECTS;

    const FIELDS: &'static [Field] = &[
        Field::new("name", FieldType::String),
        Field::new("project_id", FieldType::String),
        Field::new("display_name", FieldType::String),
        Field::new("description", FieldType::String),
        Field::new("create_time", FieldType::Timestamp),
        Field::new("update_time", FieldType::Timestamp),
    ];

    fn key_name(&self) -> String {
        self.name().to_string()
    }

    fn field_map(&self) -> FieldMap {
        fields([
            ("name", Value::from(self.name().to_string())),
            ("project_id", Value::from(self.project_id.as_str())),
            ("display_name", Value::from(self.display_name.as_str())),
            ("description", Value::from(self.description.as_str())),
            ("create_time", Value::from(self.create_time)),
            ("update_time", Value::from(self.update_time)),
        ])
    }
}
