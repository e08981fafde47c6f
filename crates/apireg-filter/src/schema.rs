use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::ast::Expr;
use crate::check::type_of;
use crate::error::{FilterError, FilterResult};
use crate::eval::Env;
use crate::parser::parse;
use crate::value::{FieldMap, Type, Value};

/// Declared type of a filterable field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    String,
    Timestamp,
    Int,
    /// String-to-string map such as labels.
    StringMap,
}

impl FieldType {
    fn as_type(self) -> Type {
        match self {
            Self::String => Type::String,
            Self::Timestamp => Type::Timestamp,
            Self::Int => Type::Int,
            Self::StringMap => Type::Map,
        }
    }
}

/// One entry in a resource kind's field table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

impl Field {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

/// The set of fields a filter may reference.
#[derive(Clone, Debug)]
pub struct Schema {
    fields: Arc<BTreeMap<String, Type>>,
}

impl Schema {
    pub fn new(fields: &[Field]) -> Self {
        Self {
            fields: Arc::new(
                fields
                    .iter()
                    .map(|f| (f.name.to_string(), f.ty.as_type()))
                    .collect(),
            ),
        }
    }

    /// Parse and type-check `predicate`.
    ///
    /// A blank predicate compiles to a filter that matches everything.
    pub fn compile(&self, predicate: &str) -> FilterResult<Filter> {
        let source = predicate.trim();
        if source.is_empty() {
            return Ok(Filter {
                source: String::new(),
                expr: None,
                fields: Arc::clone(&self.fields),
            });
        }

        let expr = parse(source)?;
        match type_of(&expr, &self.fields)? {
            Type::Bool => {}
            other => return Err(FilterError::NotBoolean(other.to_string())),
        }
        trace!(filter = source, "compiled filter");
        Ok(Filter {
            source: source.to_string(),
            expr: Some(expr),
            fields: Arc::clone(&self.fields),
        })
    }

    /// Compile `predicate` and evaluate it once against `values`.
    pub fn matches(&self, predicate: &str, values: &FieldMap) -> FilterResult<bool> {
        self.compile(predicate)?.matches(values)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

/// A compiled, type-checked predicate.
#[derive(Clone, Debug)]
pub struct Filter {
    source: String,
    expr: Option<Expr>,
    fields: Arc<BTreeMap<String, Type>>,
}

impl Filter {
    /// Evaluate against one resource's field map.
    pub fn matches(&self, values: &FieldMap) -> FilterResult<bool> {
        let Some(expr) = &self.expr else {
            return Ok(true);
        };
        let env = Env {
            declared: &self.fields,
            values,
        };
        match env.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(FilterError::NotBoolean(other.type_of().to_string())),
        }
    }

    /// The predicate text this filter was compiled from (trimmed).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.expr.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn schema(ty: FieldType) -> Schema {
        Schema::new(&[Field::new("k", ty), Field::new("labels", FieldType::StringMap)])
    }

    fn values(k: Value) -> FieldMap {
        let labels: BTreeMap<String, String> = [("k", "match"), ("other", "a_match_b")]
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        FieldMap::from([("k".to_string(), k), ("labels".to_string(), Value::Map(labels))])
    }

    // ---- matching ----

    #[test]
    fn string_equality() {
        let s = schema(FieldType::String);
        assert!(s.matches(r#"k == "match""#, &values("match".into())).unwrap());
        assert!(!s.matches(r#"k == "match""#, &values("miss".into())).unwrap());
    }

    #[test]
    fn int_equality() {
        let s = schema(FieldType::Int);
        assert!(s.matches("k == 123", &values(Value::Int(123))).unwrap());
        assert!(!s.matches("k == 123", &values(Value::Int(124))).unwrap());
    }

    #[test]
    fn timestamp_ordering() {
        let s = schema(FieldType::Timestamp);
        let before = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
        let f = s.compile(r#"k < timestamp("2021-01-01T00:00:00Z")"#).unwrap();
        assert!(f.matches(&values(before.into())).unwrap());
        assert!(!f.matches(&values(after.into())).unwrap());
    }

    #[test]
    fn map_predicates() {
        let s = schema(FieldType::String);
        let v = values("x".into());
        for (src, expected) in [
            ("has(labels.k)", true),
            ("has(labels.absent)", false),
            (r#""k" in labels"#, true),
            (r#""absent" in labels"#, false),
            (r#"labels["k"] == "match""#, true),
            (r#"labels.k.contains("atc")"#, true),
            (r#"labels.k.contains("zzz")"#, false),
            (r#""match" in labels.other.split("_")"#, true),
            (r#""mat" in labels.other.split("_")"#, false),
        ] {
            assert_eq!(s.matches(src, &v).unwrap(), expected, "{src}");
        }
    }

    #[test]
    fn empty_predicate_matches_everything() {
        let f = schema(FieldType::String).compile("   ").unwrap();
        assert!(f.is_empty());
        assert!(f.matches(&FieldMap::new()).unwrap());
    }

    #[test]
    fn short_circuit_skips_missing_key() {
        let s = schema(FieldType::String);
        let v = values("x".into());
        assert!(!s.matches(r#"has(labels.absent) && labels.absent == "y""#, &v).unwrap());
        assert!(s.matches(r#"true || labels.absent == "y""#, &v).unwrap());
    }

    // ---- failures ----

    #[test]
    fn unknown_field_fails_compile() {
        let err = schema(FieldType::String).compile(r#"j == "match""#).unwrap_err();
        assert_eq!(err, FilterError::UnknownField("j".into()));
    }

    #[test]
    fn syntax_error_fails_compile() {
        let err = schema(FieldType::String).compile("k = 'x'").unwrap_err();
        assert!(matches!(err, FilterError::Syntax { .. }));
    }

    #[test]
    fn non_boolean_fails_compile() {
        let err = schema(FieldType::String).compile("k").unwrap_err();
        assert_eq!(err, FilterError::NotBoolean("string".into()));
    }

    #[test]
    fn missing_value_fails_evaluation() {
        let f = schema(FieldType::String).compile(r#"k == "match""#).unwrap();
        let err = f.matches(&FieldMap::new()).unwrap_err();
        assert!(matches!(err, FilterError::Evaluation(_)));
    }

    #[test]
    fn absent_map_key_fails_evaluation() {
        let s = schema(FieldType::String);
        let err = s.matches(r#"labels.absent == "y""#, &values("x".into())).unwrap_err();
        assert!(matches!(err, FilterError::Evaluation(_)));
    }

    #[test]
    fn mistyped_value_is_not_coerced() {
        let f = schema(FieldType::Int).compile("k == 1").unwrap();
        let err = f.matches(&values(Value::from("1"))).unwrap_err();
        assert!(matches!(err, FilterError::Evaluation(_)));
    }

    proptest! {
        #[test]
        fn int_comparison_agrees_with_rust(a in -1000i64..1000, b in -1000i64..1000) {
            let s = schema(FieldType::Int);
            let v = values(Value::Int(a));
            prop_assert_eq!(s.matches(&format!("k < {b}"), &v).unwrap(), a < b);
            prop_assert_eq!(s.matches(&format!("k >= {b}"), &v).unwrap(), a >= b);
            prop_assert_eq!(s.matches(&format!("!(k == {b})"), &v).unwrap(), a != b);
        }
    }
}
