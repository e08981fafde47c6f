//! Static type checking against a schema.

use std::collections::BTreeMap;

use chrono::DateTime;

use crate::ast::{BinaryOp, Expr, Literal};
use crate::error::{FilterError, FilterResult};
use crate::value::Type;

fn mismatch(message: String) -> FilterError {
    FilterError::Type(message)
}

/// Compute the static type of `expr`, failing on undeclared fields,
/// unknown functions and operand type mismatches.
pub(crate) fn type_of(expr: &Expr, fields: &BTreeMap<String, Type>) -> FilterResult<Type> {
    match expr {
        Expr::Literal(Literal::Bool(_)) => Ok(Type::Bool),
        Expr::Literal(Literal::Int(_)) => Ok(Type::Int),
        Expr::Literal(Literal::Str(_)) => Ok(Type::String),

        Expr::Ident(name) => fields
            .get(name)
            .cloned()
            .ok_or_else(|| FilterError::UnknownField(name.clone())),

        Expr::Select { operand, field } => match type_of(operand, fields)? {
            Type::Map => Ok(Type::String),
            other => Err(mismatch(format!("cannot select field '{field}' from {other}"))),
        },

        Expr::Index { operand, index } => {
            match (type_of(operand, fields)?, type_of(index, fields)?) {
                (Type::Map, Type::String) => Ok(Type::String),
                (Type::List(elem), Type::Int) => Ok(*elem),
                (container, key) => Err(mismatch(format!("cannot index {container} with {key}"))),
            }
        }

        Expr::List(items) => {
            let mut elem: Option<Type> = None;
            for item in items {
                let t = type_of(item, fields)?;
                if let Some(existing) = &elem {
                    if *existing != t {
                        return Err(mismatch(format!(
                            "list elements must share a type, found {existing} and {t}"
                        )));
                    }
                }
                elem = Some(t);
            }
            Ok(Type::List(Box::new(elem.unwrap_or(Type::String))))
        }

        Expr::Not(inner) => match type_of(inner, fields)? {
            Type::Bool => Ok(Type::Bool),
            other => Err(mismatch(format!("'!' requires bool, got {other}"))),
        },

        Expr::Neg(inner) => match type_of(inner, fields)? {
            Type::Int => Ok(Type::Int),
            other => Err(mismatch(format!("'-' requires int, got {other}"))),
        },

        Expr::Binary { op, lhs, rhs } => {
            let (l, r) = (type_of(lhs, fields)?, type_of(rhs, fields)?);
            check_binary(*op, l, r)
        }

        Expr::Call {
            target,
            function,
            args,
        } => check_call(target.as_deref(), function, args, fields),
    }
}

fn check_binary(op: BinaryOp, l: Type, r: Type) -> FilterResult<Type> {
    let ok = match op {
        BinaryOp::And | BinaryOp::Or => l == Type::Bool && r == Type::Bool,
        BinaryOp::Eq | BinaryOp::Ne => l == r,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            l == r && matches!(l, Type::Int | Type::String | Type::Timestamp)
        }
        BinaryOp::In => match &r {
            Type::Map => l == Type::String,
            Type::List(elem) => **elem == l,
            _ => false,
        },
    };
    if ok {
        Ok(Type::Bool)
    } else {
        Err(mismatch(format!(
            "operator '{}' not defined for {l} and {r}",
            op.symbol()
        )))
    }
}

fn check_call(
    target: Option<&Expr>,
    function: &str,
    args: &[Expr],
    fields: &BTreeMap<String, Type>,
) -> FilterResult<Type> {
    let arity = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(mismatch(format!(
                "'{function}' takes {n} argument(s), got {}",
                args.len()
            )))
        }
    };

    match (target, function) {
        (None, "has") => {
            arity(1)?;
            match &args[0] {
                Expr::Select { operand, .. } => match type_of(operand, fields)? {
                    Type::Map => Ok(Type::Bool),
                    other => Err(mismatch(format!("has() requires a map field, got {other}"))),
                },
                _ => Err(mismatch("has() argument must be a field selection like m.key".into())),
            }
        }
        (None, "timestamp") => {
            arity(1)?;
            if let Expr::Literal(Literal::Str(s)) = &args[0] {
                DateTime::parse_from_rfc3339(s)
                    .map_err(|e| mismatch(format!("invalid timestamp {s:?}: {e}")))?;
            }
            match type_of(&args[0], fields)? {
                Type::String => Ok(Type::Timestamp),
                other => Err(mismatch(format!("timestamp() requires string, got {other}"))),
            }
        }
        (None, "size") => {
            arity(1)?;
            sized(type_of(&args[0], fields)?)
        }
        (Some(target), "size") => {
            arity(0)?;
            sized(type_of(target, fields)?)
        }
        (Some(target), "contains" | "startsWith" | "endsWith" | "split") => {
            arity(1)?;
            let (t, a) = (type_of(target, fields)?, type_of(&args[0], fields)?);
            if t != Type::String || a != Type::String {
                return Err(mismatch(format!(
                    "'{function}' requires string receiver and argument, got {t} and {a}"
                )));
            }
            if function == "split" {
                Ok(Type::List(Box::new(Type::String)))
            } else {
                Ok(Type::Bool)
            }
        }
        _ => Err(FilterError::UnknownFunction(function.to_string())),
    }
}

fn sized(t: Type) -> FilterResult<Type> {
    match t {
        Type::String | Type::Map | Type::List(_) => Ok(Type::Int),
        other => Err(mismatch(format!("size() not defined for {other}"))),
    }
}
