use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Document;

/// Address of a stored document: the resource kind plus its full name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    pub kind: String,
    pub name: String,
}

impl Key {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// A scanned row.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub key: Key,
    pub document: Document,
}

/// One sort criterion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

/// An ordered scan over one kind.
///
/// ```
/// use apireg_store::Query;
///
/// let q = Query::new("specs")
///     .require("project_id", "demo")
///     .descending("revision_create_time")
///     .apply_offset(10);
/// assert_eq!(q.offset(), 10);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    kind: String,
    requirements: Vec<(String, Value)>,
    order: Vec<Order>,
    offset: usize,
}

impl Query {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            requirements: Vec::new(),
            order: Vec::new(),
            offset: 0,
        }
    }

    /// Only return documents whose `field` equals `value`.
    pub fn require(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.requirements.push((field.into(), value.into()));
        self
    }

    /// Sort ascending by `field`. Repeated calls add secondary criteria.
    pub fn order(mut self, field: impl Into<String>) -> Self {
        self.order.push(Order {
            field: field.into(),
            descending: false,
        });
        self
    }

    pub fn descending(mut self, field: impl Into<String>) -> Self {
        self.order.push(Order {
            field: field.into(),
            descending: true,
        });
        self
    }

    /// Skip the first `offset` matching documents.
    pub fn apply_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn requirements(&self) -> &[(String, Value)] {
        &self.requirements
    }

    pub fn ordering(&self) -> &[Order] {
        &self.order
    }

    /// Whether a document satisfies every requirement.
    pub fn matches(&self, document: &Document) -> bool {
        self.requirements
            .iter()
            .all(|(field, value)| document.get(field) == Some(value))
    }

    /// Total order used by backends: the requested criteria, then key name.
    pub fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        for order in &self.order {
            let ord = compare_values(a.document.get(&order.field), b.document.get(&order.field));
            let ord = if order.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.key.name.cmp(&b.key.name)
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compare two optional JSON values. Missing sorts first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
            },
            _ => rank(a).cmp(&rank(b)),
        },
    }
}
