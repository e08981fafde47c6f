use std::collections::BTreeMap;

use apireg_filter::{Field, FieldMap, FieldType, Value};
use apireg_types::{ApiName, LabelList};
use chrono::serde::ts_microseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::mask::FieldMask;
use crate::{fields, kinds, labels_value, Resource};

/// Request and response view of an API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiMessage {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub availability: String,
    pub recommended_version: String,
    pub recommended_deployment: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
}

impl ApiMessage {
    fn is_populated(&self, path: &str) -> bool {
        match path {
            "display_name" => !self.display_name.is_empty(),
            "description" => !self.description.is_empty(),
            "availability" => !self.availability.is_empty(),
            "recommended_version" => !self.recommended_version.is_empty(),
            "recommended_deployment" => !self.recommended_deployment.is_empty(),
            "labels" => !self.labels.is_empty(),
            "annotations" => !self.annotations.is_empty(),
            _ => false,
        }
    }
}

/// Stored API row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Api {
    pub project_id: String,
    pub api_id: String,
    pub display_name: String,
    pub description: String,
    pub availability: String,
    pub recommended_version: String,
    pub recommended_deployment: String,
    pub labels: LabelList,
    pub annotations: LabelList,
    #[serde(with = "ts_microseconds")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    pub update_time: DateTime<Utc>,
}

impl Api {
    const UPDATABLE: &'static [&'static str] = &[
        "display_name",
        "description",
        "availability",
        "recommended_version",
        "recommended_deployment",
        "labels",
        "annotations",
    ];

    pub fn new(name: &ApiName, body: &ApiMessage, now: DateTime<Utc>) -> ModelResult<Self> {
        name.validate()?;
        Ok(Self {
            project_id: name.project_id.clone(),
            api_id: name.api_id.clone(),
            display_name: body.display_name.clone(),
            description: body.description.clone(),
            availability: body.availability.clone(),
            recommended_version: body.recommended_version.clone(),
            recommended_deployment: body.recommended_deployment.clone(),
            labels: LabelList::from(&body.labels),
            annotations: LabelList::from(&body.annotations),
            create_time: now,
            update_time: now,
        })
    }

    pub fn name(&self) -> ApiName {
        ApiName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
        }
    }

    pub fn update(&mut self, body: &ApiMessage, mask: &FieldMask, now: DateTime<Utc>) -> ModelResult<()> {
        for path in mask.resolve(Self::UPDATABLE, |p| body.is_populated(p))? {
            match path {
                "display_name" => self.display_name = body.display_name.clone(),
                "description" => self.description = body.description.clone(),
                "availability" => self.availability = body.availability.clone(),
                "recommended_version" => self.recommended_version = body.recommended_version.clone(),
                "recommended_deployment" => {
                    self.recommended_deployment = body.recommended_deployment.clone()
                }
                "labels" => self.labels = LabelList::from(&body.labels),
                "annotations" => self.annotations = LabelList::from(&body.annotations),
                _ => {}
            }
        }
        self.update_time = now;
        Ok(())
    }

    pub fn message(&self) -> ApiMessage {
        ApiMessage {
            name: self.name().to_string(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            availability: self.availability.clone(),
            recommended_version: self.recommended_version.clone(),
            recommended_deployment: self.recommended_deployment.clone(),
            labels: self.labels.to_map(),
            annotations: self.annotations.to_map(),
            create_time: Some(self.create_time),
            update_time: Some(self.update_time),
        }
    }
}

impl Resource for Api {
    const KIND: &'static str = kinds::APIS;

    const FIELDS: &'static [Field] = &[
        Field::new("name", FieldType::String),
        Field::new("project_id", FieldType::String),
        Field::new("api_id", FieldType::String),
        Field::new("display_name", FieldType::String),
        Field::new("description", FieldType::String),
        Field::new("create_time", FieldType::Timestamp),
        Field::new("update_time", FieldType::Timestamp),
        Field::new("availability", FieldType::String),
        Field::new("recommended_version", FieldType::String),
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
            ("display_name", Value::from(self.display_name.as_str())),
            ("description", Value::from(self.description.as_str())),
            ("create_time", Value::from(self.create_time)),
            ("update_time", Value::from(self.update_time)),
            ("availability", Value::from(self.availability.as_str())),
            ("recommended_version", Value::from(self.recommended_version.as_str())),
            ("labels", labels_value(&self.labels)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apireg_filter::Schema;
    use chrono::TimeZone;

    fn name() -> ApiName {
        ApiName::parse("projects/demo/locations/global/apis/petstore").unwrap()
    }

    #[test]
    fn labels_are_filterable() {
        let body = ApiMessage {
            labels: BTreeMap::from([("team".to_string(), "pets".to_string())]),
            ..Default::default()
        };
        let api = Api::new(&name(), &body, Utc.timestamp_opt(0, 0).unwrap()).unwrap();
        let schema = Schema::new(Api::FIELDS);
        assert!(schema.matches(r#"labels.team == "pets""#, &api.field_map()).unwrap());
        assert!(schema.matches(r#"api_id == "petstore""#, &api.field_map()).unwrap());
    }

    #[test]
    fn update_replaces_labels_wholesale() {
        let now = Utc.timestamp_opt(0, 0).unwrap();
        let body = ApiMessage {
            labels: BTreeMap::from([("a".to_string(), "1".to_string())]),
            ..Default::default()
        };
        let mut api = Api::new(&name(), &body, now).unwrap();
        let change = ApiMessage {
            labels: BTreeMap::from([("b".to_string(), "2".to_string())]),
            ..Default::default()
        };
        api.update(&change, &FieldMask::new(["labels"]), now).unwrap();
        assert_eq!(api.labels.get("a"), None);
        assert_eq!(api.labels.get("b"), Some("2"));
    }
}
