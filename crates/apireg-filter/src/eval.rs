//! Evaluation of checked expressions.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::ast::{BinaryOp, Expr, Literal};
use crate::error::{FilterError, FilterResult};
use crate::value::{FieldMap, Type, Value};

fn fail(message: String) -> FilterError {
    FilterError::Evaluation(message)
}

pub(crate) struct Env<'a> {
    pub declared: &'a BTreeMap<String, Type>,
    pub values: &'a FieldMap,
}

impl Env<'_> {
    pub fn eval(&self, expr: &Expr) -> FilterResult<Value> {
        match expr {
            Expr::Literal(Literal::Bool(b)) => Ok(Value::Bool(*b)),
            Expr::Literal(Literal::Int(n)) => Ok(Value::Int(*n)),
            Expr::Literal(Literal::Str(s)) => Ok(Value::String(s.clone())),

            Expr::Ident(name) => self.field(name),

            Expr::Select { operand, field } => {
                let map = self.map(operand)?;
                map.get(field)
                    .map(|v| Value::String(v.clone()))
                    .ok_or_else(|| fail(format!("no such key: {field}")))
            }

            Expr::Index { operand, index } => match (self.eval(operand)?, self.eval(index)?) {
                (Value::Map(map), Value::String(key)) => map
                    .get(&key)
                    .map(|v| Value::String(v.clone()))
                    .ok_or_else(|| fail(format!("no such key: {key}"))),
                (Value::List(items), Value::Int(i)) => usize::try_from(i)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .ok_or_else(|| fail(format!("index out of range: {i}"))),
                (container, key) => Err(fail(format!(
                    "cannot index {} with {}",
                    container.type_of(),
                    key.type_of()
                ))),
            },

            Expr::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<FilterResult<_>>()?,
            )),

            Expr::Not(inner) => Ok(Value::Bool(!self.boolean(inner)?)),

            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Int(n) => n
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| fail("integer overflow".into())),
                other => Err(fail(format!("cannot negate {}", other.type_of()))),
            },

            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),

            Expr::Call {
                target,
                function,
                args,
            } => self.call(target.as_deref(), function, args),
        }
    }

    /// Load a field, insisting the supplied value has its declared type.
    fn field(&self, name: &str) -> FilterResult<Value> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| fail(format!("no value for field '{name}'")))?;
        if let Some(declared) = self.declared.get(name) {
            let actual = value.type_of();
            let compatible = match (declared, &actual) {
                (Type::List(_), Type::List(_)) => true,
                (d, a) => d == a,
            };
            if !compatible {
                return Err(fail(format!(
                    "field '{name}' declared as {declared} but has a {actual} value"
                )));
            }
        }
        Ok(value.clone())
    }

    fn boolean(&self, expr: &Expr) -> FilterResult<bool> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(fail(format!("expected bool, got {}", other.type_of()))),
        }
    }

    fn map(&self, expr: &Expr) -> FilterResult<BTreeMap<String, String>> {
        match self.eval(expr)? {
            Value::Map(m) => Ok(m),
            other => Err(fail(format!("expected map, got {}", other.type_of()))),
        }
    }

    fn string(&self, expr: &Expr) -> FilterResult<String> {
        match self.eval(expr)? {
            Value::String(s) => Ok(s),
            other => Err(fail(format!("expected string, got {}", other.type_of()))),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> FilterResult<Value> {
        let result = match op {
            // Logical operators short-circuit left to right.
            BinaryOp::And => self.boolean(lhs)? && self.boolean(rhs)?,
            BinaryOp::Or => self.boolean(lhs)? || self.boolean(rhs)?,
            BinaryOp::Eq => self.eval(lhs)? == self.eval(rhs)?,
            BinaryOp::Ne => self.eval(lhs)? != self.eval(rhs)?,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ord = compare(&self.eval(lhs)?, &self.eval(rhs)?)?;
                match op {
                    BinaryOp::Lt => ord == Ordering::Less,
                    BinaryOp::Le => ord != Ordering::Greater,
                    BinaryOp::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                }
            }
            BinaryOp::In => match (self.eval(lhs)?, self.eval(rhs)?) {
                (Value::String(key), Value::Map(map)) => map.contains_key(&key),
                (item, Value::List(items)) => items.contains(&item),
                (item, container) => {
                    return Err(fail(format!(
                        "'in' not defined for {} and {}",
                        item.type_of(),
                        container.type_of()
                    )))
                }
            },
        };
        Ok(Value::Bool(result))
    }

    fn call(&self, target: Option<&Expr>, function: &str, args: &[Expr]) -> FilterResult<Value> {
        match (target, function) {
            (None, "has") => match &args[..] {
                [Expr::Select { operand, field }] => {
                    Ok(Value::Bool(self.map(operand)?.contains_key(field)))
                }
                _ => Err(fail("has() argument must be a field selection".into())),
            },
            (None, "timestamp") => {
                let text = self.string(one(args)?)?;
                DateTime::parse_from_rfc3339(&text)
                    .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                    .map_err(|e| fail(format!("invalid timestamp {text:?}: {e}")))
            }
            (None, "size") => size(self.eval(one(args)?)?),
            (Some(target), "size") => size(self.eval(target)?),
            (Some(target), "contains" | "startsWith" | "endsWith" | "split") => {
                let receiver = self.string(target)?;
                let arg = self.string(one(args)?)?;
                Ok(match function {
                    "contains" => Value::Bool(receiver.contains(arg.as_str())),
                    "startsWith" => Value::Bool(receiver.starts_with(arg.as_str())),
                    "endsWith" => Value::Bool(receiver.ends_with(arg.as_str())),
                    _ => Value::List(
                        receiver
                            .split(arg.as_str())
                            .map(|part| Value::String(part.to_string()))
                            .collect(),
                    ),
                })
            }
            _ => Err(FilterError::UnknownFunction(function.to_string())),
        }
    }
}

fn one(args: &[Expr]) -> FilterResult<&Expr> {
    match args {
        [arg] => Ok(arg),
        _ => Err(fail(format!("expected 1 argument, got {}", args.len()))),
    }
}

fn size(value: Value) -> FilterResult<Value> {
    let n = match value {
        Value::String(s) => s.chars().count(),
        Value::Map(m) => m.len(),
        Value::List(items) => items.len(),
        other => return Err(fail(format!("size() not defined for {}", other.type_of()))),
    };
    Ok(Value::Int(n as i64))
}

fn compare(a: &Value, b: &Value) -> FilterResult<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Ok(x.cmp(y)),
        _ => Err(fail(format!(
            "cannot order {} and {}",
            a.type_of(),
            b.type_of()
        ))),
    }
}
