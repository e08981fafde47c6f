//! Filter expressions for registry listings.
//!
//! A filter is a small CEL-style boolean expression evaluated once per
//! listed resource. Every resource kind declares a [`Schema`] of typed
//! [`Field`]s; expressions are parsed and type-checked against that schema
//! up front, then evaluated against each resource's [`FieldMap`].
//!
//! ```
//! use apireg_filter::{Field, FieldMap, FieldType, Schema, Value};
//!
//! let schema = Schema::new(&[
//!     Field::new("mime_type", FieldType::String),
//!     Field::new("size_bytes", FieldType::Int),
//! ]);
//! let filter = schema
//!     .compile("mime_type.contains('openapi') && size_bytes > 10")
//!     .unwrap();
//!
//! let mut values = FieldMap::new();
//! values.insert("mime_type".into(), Value::from("application/x.openapi"));
//! values.insert("size_bytes".into(), Value::Int(42));
//! assert!(filter.matches(&values).unwrap());
//! ```
//!
//! # Supported syntax
//!
//! - literals: `"str"`, `'str'`, `42`, `-1`, `true`, `false`, `[a, b]`
//! - `timestamp("2021-01-01T00:00:00Z")`
//! - comparison `== != < <= > >=`, logic `&& || !`, membership `in`
//! - maps: `labels.key`, `labels["key"]`, `has(labels.key)`, `"key" in labels`
//! - strings: `.contains()`, `.startsWith()`, `.endsWith()`, `.split()`
//! - `size(x)` / `x.size()` for strings, lists and maps

mod ast;
mod check;
pub mod error;
mod eval;
mod lexer;
mod parser;
pub mod schema;
pub mod value;

pub use error::{FilterError, FilterResult};
pub use schema::{Field, FieldType, Filter, Schema};
pub use value::{FieldMap, Value};
