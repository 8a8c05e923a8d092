//! Operator desugarer: rewrites a filter tree into canonical predicates.
//!
//! Every convenience spelling (`contains`, `startsWith`, `not`, nested field
//! objects, the `like` keyword form) is reduced here to a flat list of
//! `(path, operator, value, case-sensitivity)` tuples, so the emitter only
//! deals with one shape. Classification of clause keys is exhaustive over
//! [`ClauseKey`]; an unrecognized key is *explicitly* classified as a nested
//! field path, never silently fallen through.

use serde_json::Value;

use crate::criteria::FilterTree;
use crate::error::{ArqoError, Result};
use crate::query::aql::{check_field_path, CompareOp};

/// One canonical filter tuple.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    /// Dotted field path.
    pub path: String,
    /// Canonical operator.
    pub op: CompareOp,
    /// Comparison value, wildcards already absorbed for substring operators.
    pub value: Value,
    /// Effective case sensitivity for this leaf.
    pub case_sensitive: bool,
    /// Whether emission must guard on attribute existence.
    pub exists_guard: bool,
}

/// Tagged classification of a clause key.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ClauseKey {
    Contains,
    Like,
    StartsWith,
    EndsWith,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Not,
    Nin,
    CaseSensitive,
    /// Anything else names a sub-field of the current path.
    Nested(String),
}

impl ClauseKey {
    fn classify(key: &str) -> Self {
        match key {
            "contains" => Self::Contains,
            "like" => Self::Like,
            "startsWith" => Self::StartsWith,
            "endsWith" => Self::EndsWith,
            "lessThan" | "<" => Self::LessThan,
            "lessThanOrEqual" | "<=" => Self::LessThanOrEqual,
            "greaterThan" | ">" => Self::GreaterThan,
            "greaterThanOrEqual" | ">=" => Self::GreaterThanOrEqual,
            "not" | "!" => Self::Not,
            "nin" => Self::Nin,
            "caseSensitive" => Self::CaseSensitive,
            other => Self::Nested(other.to_string()),
        }
    }
}

/// Desugars a whole filter tree with the connection's case default.
pub fn desugar(tree: &FilterTree, case_sensitive_default: bool) -> Result<Vec<Predicate>> {
    let mut out = Vec::new();
    for (field, node) in tree {
        // `like` in field position is keyword shorthand:
        // `{like: {name: "x%"}}` means `name LIKE "x%"`.
        if field == "like" {
            if let Value::Object(fields) = node {
                for (inner_field, pattern) in fields {
                    let value = expect_string(inner_field, pattern)?;
                    out.push(Predicate {
                        path: checked_path(inner_field)?,
                        op: CompareOp::Like,
                        value: Value::String(value),
                        case_sensitive: case_sensitive_default,
                        exists_guard: false,
                    });
                }
                continue;
            }
        }
        desugar_node(field, node, case_sensitive_default, &mut out)?;
    }
    Ok(out)
}

fn desugar_node(
    path: &str,
    node: &Value,
    case_default: bool,
    out: &mut Vec<Predicate>,
) -> Result<()> {
    match node {
        Value::Object(clause) => desugar_clause(path, clause, case_default, out),
        Value::Array(_) => {
            out.push(Predicate {
                path: checked_path(path)?,
                op: CompareOp::In,
                value: node.clone(),
                case_sensitive: case_default,
                exists_guard: false,
            });
            Ok(())
        }
        _ => {
            out.push(Predicate {
                path: checked_path(path)?,
                op: CompareOp::Eq,
                value: node.clone(),
                case_sensitive: case_default,
                exists_guard: false,
            });
            Ok(())
        }
    }
}

fn desugar_clause(
    path: &str,
    clause: &serde_json::Map<String, Value>,
    case_default: bool,
    out: &mut Vec<Predicate>,
) -> Result<()> {
    // The per-leaf flag overrides the connection default, then disappears
    // before operator processing.
    let case_sensitive = match clause.get("caseSensitive") {
        None => case_default,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            return Err(ArqoError::validation(
                path,
                format!("caseSensitive must be a boolean, got {other}"),
            ))
        }
    };

    for (key, value) in clause {
        let push = |op: CompareOp, value: Value, guard: bool, out: &mut Vec<Predicate>| -> Result<()> {
            let pred = Predicate {
                path: checked_path(path)?,
                op,
                value,
                case_sensitive,
                exists_guard: guard,
            };
            out.push(pred);
            Ok(())
        };
        match ClauseKey::classify(key) {
            ClauseKey::CaseSensitive => {}
            ClauseKey::Contains => {
                let v = expect_string(path, value)?;
                push(CompareOp::Like, Value::String(format!("%{v}%")), false, out)?;
            }
            ClauseKey::Like => {
                let v = expect_string(path, value)?;
                push(CompareOp::Like, Value::String(v), false, out)?;
            }
            ClauseKey::StartsWith => {
                let v = expect_string(path, value)?;
                push(CompareOp::Like, Value::String(format!("{v}%")), false, out)?;
            }
            ClauseKey::EndsWith => {
                let v = expect_string(path, value)?;
                push(CompareOp::Like, Value::String(format!("%{v}")), false, out)?;
            }
            ClauseKey::LessThan => {
                push(CompareOp::Lt, expect_scalar(path, value)?, true, out)?;
            }
            ClauseKey::LessThanOrEqual => {
                push(CompareOp::Lte, expect_scalar(path, value)?, true, out)?;
            }
            ClauseKey::GreaterThan => {
                push(CompareOp::Gt, expect_scalar(path, value)?, true, out)?;
            }
            ClauseKey::GreaterThanOrEqual => {
                push(CompareOp::Gte, expect_scalar(path, value)?, true, out)?;
            }
            ClauseKey::Not => match value {
                Value::Array(_) => push(CompareOp::NotIn, value.clone(), false, out)?,
                Value::Object(_) => {
                    return Err(ArqoError::validation(
                        path,
                        "negation takes a scalar or an array, got an object",
                    ))
                }
                scalar => push(CompareOp::Neq, scalar.clone(), false, out)?,
            },
            ClauseKey::Nin => match value {
                Value::Array(_) => push(CompareOp::NotIn, value.clone(), false, out)?,
                other => {
                    return Err(ArqoError::validation(
                        path,
                        format!("nin takes an array, got {other}"),
                    ))
                }
            },
            ClauseKey::Nested(sub_field) => {
                // Unknown key: descend one level, dot-joining the path.
                let nested_path = format!("{path}.{sub_field}");
                desugar_node(&nested_path, value, case_default, out)?;
            }
        }
    }
    Ok(())
}

fn checked_path(path: &str) -> Result<String> {
    check_field_path(path)?;
    Ok(path.to_string())
}

fn expect_string(path: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(ArqoError::validation(
            path,
            format!("string comparison takes a string, got {other}"),
        )),
    }
}

fn expect_scalar(path: &str, value: &Value) -> Result<Value> {
    match value {
        Value::Object(_) | Value::Array(_) => Err(ArqoError::validation(
            path,
            "bound comparison takes a scalar value",
        )),
        scalar => Ok(scalar.clone()),
    }
}
