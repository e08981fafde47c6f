use std::collections::BTreeMap;

use apireg_filter::{Field, FieldMap, FieldType, Value};
use apireg_types::{
    is_gzip_mime_type, new_revision_id, ContentDigest, LabelList, SpecName, SpecRevisionName,
};
use chrono::serde::ts_microseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::mask::FieldMask;
use crate::{fields, kinds, labels_value, Resource};

/// Whether a stored spec row is the revision served for unqualified reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    NotCurrent,
    IsCurrent,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotCurrent => "not_current",
            Self::IsCurrent => "is_current",
        }
    }
}

/// Request and response view of a spec revision.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecMessage {
    pub name: String,
    pub filename: String,
    pub description: String,
    pub revision_id: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub hash: String,
    pub source_uri: String,
    #[serde(with = "apireg_types::serde_bytes", skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<u8>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision_update_time: Option<DateTime<Utc>>,
}

impl SpecMessage {
    fn is_populated(&self, path: &str) -> bool {
        match path {
            "filename" => !self.filename.is_empty(),
            "description" => !self.description.is_empty(),
            "contents" => !self.contents.is_empty(),
            "mime_type" => !self.mime_type.is_empty(),
            "source_uri" => !self.source_uri.is_empty(),
            "labels" => !self.labels.is_empty(),
            "annotations" => !self.annotations.is_empty(),
            _ => false,
        }
    }
}

/// What a masked update did to a revision's contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentsChange {
    /// `contents` was not in the mask.
    Untouched,
    /// Same hash; the stored bytes are replaced under the same revision.
    Rewritten,
    /// New hash; the row now names a new revision.
    Forked,
}

/// Stored spec revision row, keyed by `{spec}@{revision_id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub spec_id: String,
    pub revision_id: String,
    pub description: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub hash: String,
    pub source_uri: String,
    pub currency: Currency,
    pub labels: LabelList,
    pub annotations: LabelList,
    #[serde(with = "ts_microseconds")]
    pub create_time: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    pub revision_create_time: DateTime<Utc>,
    #[serde(with = "ts_microseconds")]
    pub revision_update_time: DateTime<Utc>,
}

impl Spec {
    /// Update order matters: `mime_type` precedes `contents` so the digest
    /// sees the final MIME type.
    const UPDATABLE: &'static [&'static str] = &[
        "filename",
        "description",
        "mime_type",
        "contents",
        "source_uri",
        "labels",
        "annotations",
    ];

    /// First revision of a new spec.
    pub fn new(name: &SpecName, body: &SpecMessage, now: DateTime<Utc>) -> ModelResult<Self> {
        name.validate()?;
        let digest = ContentDigest::compute(&body.contents, &body.mime_type)?;
        Ok(Self {
            project_id: name.project_id.clone(),
            api_id: name.api_id.clone(),
            version_id: name.version_id.clone(),
            spec_id: name.spec_id.clone(),
            revision_id: new_revision_id(),
            description: body.description.clone(),
            filename: body.filename.clone(),
            mime_type: body.mime_type.clone(),
            size_bytes: digest.size_bytes,
            hash: digest.hash,
            source_uri: body.source_uri.clone(),
            currency: Currency::IsCurrent,
            labels: LabelList::from(&body.labels),
            annotations: LabelList::from(&body.annotations),
            create_time: now,
            revision_create_time: now,
            revision_update_time: now,
        })
    }

    pub fn name(&self) -> SpecName {
        SpecName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
            spec_id: self.spec_id.clone(),
        }
    }

    pub fn revision_name(&self) -> SpecRevisionName {
        self.name().revision(self.revision_id.clone())
    }

    pub fn is_current(&self) -> bool {
        self.currency == Currency::IsCurrent
    }

    /// Apply a masked update in place.
    ///
    /// A masked `contents` with a new hash gives the row a fresh revision ID
    /// and revision creation time; it must then be stored as a new revision.
    /// Changing only the MIME type may not add or drop `+gzip`, since the
    /// stored bytes would no longer match it.
    pub fn update(
        &mut self,
        body: &SpecMessage,
        mask: &FieldMask,
        now: DateTime<Utc>,
    ) -> ModelResult<ContentsChange> {
        let was_gzip = is_gzip_mime_type(&self.mime_type);
        let mut change = ContentsChange::Untouched;
        for path in mask.resolve(Self::UPDATABLE, |p| body.is_populated(p))? {
            match path {
                "filename" => self.filename = body.filename.clone(),
                "description" => self.description = body.description.clone(),
                "mime_type" => self.mime_type = body.mime_type.clone(),
                "source_uri" => self.source_uri = body.source_uri.clone(),
                "labels" => self.labels = LabelList::from(&body.labels),
                "annotations" => self.annotations = LabelList::from(&body.annotations),
                "contents" => {
                    let digest = ContentDigest::compute(&body.contents, &self.mime_type)?;
                    if digest.hash == self.hash {
                        change = ContentsChange::Rewritten;
                    } else {
                        self.hash = digest.hash;
                        self.size_bytes = digest.size_bytes;
                        self.revision_id = new_revision_id();
                        self.revision_create_time = now;
                        change = ContentsChange::Forked;
                    }
                }
                _ => {}
            }
        }
        if change == ContentsChange::Untouched && was_gzip != is_gzip_mime_type(&self.mime_type) {
            return Err(ModelError::InvalidArgument(format!(
                "mime_type {:?} changes the encoding of stored contents; update contents with it",
                self.mime_type
            )));
        }
        self.revision_update_time = now;
        Ok(change)
    }

    /// A copy of this revision under a fresh revision ID, marked current.
    /// `create_time` is carried forward.
    pub fn new_revision(&self, now: DateTime<Utc>) -> Self {
        Self {
            revision_id: new_revision_id(),
            currency: Currency::IsCurrent,
            revision_create_time: now,
            revision_update_time: now,
            ..self.clone()
        }
    }

    /// View with an unqualified name.
    pub fn message(&self) -> SpecMessage {
        SpecMessage {
            name: self.name().to_string(),
            filename: self.filename.clone(),
            description: self.description.clone(),
            revision_id: self.revision_id.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes,
            hash: self.hash.clone(),
            source_uri: self.source_uri.clone(),
            contents: Vec::new(),
            labels: self.labels.to_map(),
            annotations: self.annotations.to_map(),
            create_time: Some(self.create_time),
            revision_create_time: Some(self.revision_create_time),
            revision_update_time: Some(self.revision_update_time),
        }
    }

    /// View named `{spec}@{revision_id}`.
    pub fn revision_message(&self) -> SpecMessage {
        SpecMessage {
            name: self.revision_name().to_string(),
            ..self.message()
        }
    }
}

impl Resource for Spec {
    const KIND: &'static str = kinds::SPECS;

    const FIELDS: &'static [Field] = &[
        Field::new("name", FieldType::String),
        Field::new("project_id", FieldType::String),
        Field::new("api_id", FieldType::String),
        Field::new("version_id", FieldType::String),
        Field::new("spec_id", FieldType::String),
        Field::new("revision_id", FieldType::String),
        Field::new("filename", FieldType::String),
        Field::new("description", FieldType::String),
        Field::new("create_time", FieldType::Timestamp),
        Field::new("revision_create_time", FieldType::Timestamp),
        Field::new("revision_update_time", FieldType::Timestamp),
        Field::new("mime_type", FieldType::String),
        Field::new("size_bytes", FieldType::Int),
        Field::new("hash", FieldType::String),
        Field::new("source_uri", FieldType::String),
        Field::new("labels", FieldType::StringMap),
    ];

    fn key_name(&self) -> String {
        self.revision_name().to_string()
    }

    fn field_map(&self) -> FieldMap {
        fields([
            ("name", Value::from(self.name().to_string())),
            ("project_id", Value::from(self.project_id.as_str())),
            ("api_id", Value::from(self.api_id.as_str())),
            ("version_id", Value::from(self.version_id.as_str())),
            ("spec_id", Value::from(self.spec_id.as_str())),
            ("revision_id", Value::from(self.revision_id.as_str())),
            ("filename", Value::from(self.filename.as_str())),
            ("description", Value::from(self.description.as_str())),
            ("create_time", Value::from(self.create_time)),
            ("revision_create_time", Value::from(self.revision_create_time)),
            ("revision_update_time", Value::from(self.revision_update_time)),
            ("mime_type", Value::from(self.mime_type.as_str())),
            ("size_bytes", Value::Int(self.size_bytes)),
            ("hash", Value::from(self.hash.as_str())),
            ("source_uri", Value::from(self.source_uri.as_str())),
            ("labels", labels_value(&self.labels)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apireg_types::{content_hash, gzip};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn name() -> SpecName {
        SpecName::parse("projects/demo/locations/global/apis/petstore/versions/v1/specs/openapi")
            .unwrap()
    }

    fn body(contents: &[u8]) -> SpecMessage {
        SpecMessage {
            mime_type: "application/x.openapi".into(),
            contents: contents.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn new_spec_is_current_with_hash() {
        let spec = Spec::new(&name(), &body(b"A"), at(1)).unwrap();
        assert!(spec.is_current());
        assert_eq!(spec.hash, content_hash(b"A"));
        assert_eq!(spec.size_bytes, 1);
        assert_eq!(spec.revision_id.len(), 8);
        assert_eq!(spec.create_time, spec.revision_create_time);
        assert_eq!(spec.create_time, spec.revision_update_time);
    }

    #[test]
    fn identical_contents_keep_revision() {
        let mut spec = Spec::new(&name(), &body(b"A"), at(1)).unwrap();
        let before = spec.clone();
        let changed = spec.update(&body(b"A"), &FieldMask::new(["contents"]), at(2)).unwrap();
        assert_eq!(changed, ContentsChange::Rewritten);
        assert_eq!(spec.revision_id, before.revision_id);
        assert_eq!(spec.revision_create_time, before.revision_create_time);
        assert_eq!(spec.revision_update_time, at(2));
    }

    #[test]
    fn different_contents_fork_revision() {
        let mut spec = Spec::new(&name(), &body(b"A"), at(1)).unwrap();
        let before = spec.clone();
        let changed = spec.update(&body(b"B"), &FieldMask::new(["contents"]), at(2)).unwrap();
        assert_eq!(changed, ContentsChange::Forked);
        assert_ne!(spec.revision_id, before.revision_id);
        assert_eq!(spec.revision_create_time, at(2));
        assert_eq!(spec.create_time, at(1));
        assert_eq!(spec.hash, content_hash(b"B"));
    }

    #[test]
    fn metadata_update_bumps_revision_update_time_only() {
        let mut spec = Spec::new(&name(), &body(b"A"), at(1)).unwrap();
        let change = SpecMessage {
            description: "pets".into(),
            ..Default::default()
        };
        let changed = spec.update(&change, &FieldMask::default(), at(3)).unwrap();
        assert_eq!(changed, ContentsChange::Untouched);
        assert_eq!(spec.description, "pets");
        assert_eq!(spec.revision_update_time, at(3));
        assert_eq!(spec.revision_create_time, at(1));
    }

    #[test]
    fn gzip_mime_applied_before_contents() {
        let mut spec = Spec::new(&name(), &body(b"A"), at(1)).unwrap();
        let zipped = SpecMessage {
            mime_type: "application/x.openapi+gzip".into(),
            contents: gzip(b"A").unwrap(),
            ..Default::default()
        };
        // Same plain bytes, so no new revision even though stored bytes differ.
        let changed = spec
            .update(&zipped, &FieldMask::new(["contents", "mime_type"]), at(2))
            .unwrap();
        assert_eq!(changed, ContentsChange::Rewritten);
        assert_eq!(spec.mime_type, "application/x.openapi+gzip");
    }

    #[test]
    fn mime_type_alone_cannot_toggle_gzip() {
        let mut spec = Spec::new(&name(), &body(b"A"), at(1)).unwrap();
        let before = spec.clone();
        let relabel = SpecMessage {
            mime_type: "application/x.openapi+gzip".into(),
            ..Default::default()
        };
        let err = spec
            .update(&relabel, &FieldMask::new(["mime_type"]), at(2))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidArgument(_)));

        let mut spec = before;
        let plain = SpecMessage {
            mime_type: "text/yaml".into(),
            ..Default::default()
        };
        let changed = spec.update(&plain, &FieldMask::new(["mime_type"]), at(2)).unwrap();
        assert_eq!(changed, ContentsChange::Untouched);
        assert_eq!(spec.mime_type, "text/yaml");
    }

    #[test]
    fn new_revision_copies_fields() {
        let spec = Spec::new(&name(), &body(b"A"), at(1)).unwrap();
        let mut old = spec.clone();
        old.currency = Currency::NotCurrent;
        let copy = old.new_revision(at(5));
        assert_ne!(copy.revision_id, old.revision_id);
        assert_eq!(copy.hash, old.hash);
        assert_eq!(copy.create_time, at(1));
        assert_eq!(copy.revision_create_time, at(5));
        assert!(copy.is_current());
    }

    #[test]
    fn revision_message_is_qualified() {
        let spec = Spec::new(&name(), &body(b"A"), at(1)).unwrap();
        let msg = spec.revision_message();
        assert_eq!(msg.name, format!("{}@{}", name(), spec.revision_id));
        assert!(spec.message().contents.is_empty());
    }

    #[test]
    fn currency_serializes_as_string() {
        let spec = Spec::new(&name(), &body(b"A"), at(1)).unwrap();
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["currency"], serde_json::json!(Currency::IsCurrent.as_str()));
    }
}
