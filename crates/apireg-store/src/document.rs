use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// A stored entity: a JSON object.
pub type Document = serde_json::Map<String, Value>;

/// Serialize a model into a document. The model must serialize as an object.
pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Serialization(format!(
            "expected an object, got {}",
            kind_of(&other)
        ))),
    }
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Row {
        id: String,
        size: i64,
    }

    #[test]
    fn struct_to_document_and_back() {
        let row = Row {
            id: "a".into(),
            size: 3,
        };
        let doc = to_document(&row).unwrap();
        assert_eq!(doc.get("size"), Some(&Value::from(3)));
        let back: Row = from_document(doc).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn non_objects_are_rejected() {
        let err = to_document(&42).unwrap_err();
        assert!(err.to_string().contains("expected an object"));
    }
}
