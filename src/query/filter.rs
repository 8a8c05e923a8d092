//! Predicate emitter: canonical tuples to a boolean expression fragment.
//!
//! Criteria fields are conjunctive; there is no native OR in the filter tree
//! (membership arrays are the caller's OR). Case-insensitive string
//! comparisons wrap *both* operands in `LOWER`, so stored data is never
//! mutated to normalize case.

use serde_json::Value;

use crate::query::aql::{CompareOp, Expr};
use crate::query::desugar::Predicate;

/// Store-native primary key field.
pub const KEY_FIELD: &str = "_key";
/// Store-native revision field.
pub const REV_FIELD: &str = "_rev";
/// Store-native document handle field.
pub const HANDLE_FIELD: &str = "_id";

/// Maps a logical path to the store-native attribute it reads.
///
/// The logical `id` resolves to the primary key; `_key`/`_rev`/`_id` pass
/// through untouched.
pub fn reference_path(path: &str) -> &str {
    match path {
        "id" => KEY_FIELD,
        other => other,
    }
}

/// Emits the conjunction of all predicates over the loop variable `var`, or
/// `None` when the list is empty.
pub fn emit(var: &str, predicates: &[Predicate]) -> Option<Expr> {
    let mut terms: Vec<Expr> = predicates.iter().map(|p| emit_one(var, p)).collect();
    match terms.len() {
        0 => None,
        1 => Some(terms.remove(0)),
        _ => Some(Expr::And(terms)),
    }
}

fn emit_one(var: &str, predicate: &Predicate) -> Expr {
    let path = reference_path(&predicate.path);
    let mut lhs = Expr::attr(var, path);
    let mut rhs = Expr::Literal(predicate.value.clone());

    if normalizes_case(predicate) {
        lhs = Expr::Lower(Box::new(lhs));
        rhs = Expr::Lower(Box::new(rhs));
    }

    let cmp = Expr::cmp(predicate.op, lhs, rhs);
    if predicate.exists_guard {
        Expr::And(vec![
            Expr::Has {
                var: var.to_string(),
                field: path.to_string(),
            },
            cmp,
        ])
    } else {
        cmp
    }
}

/// Case normalization applies only to string operands of string comparison
/// operators; numeric and date comparisons are never wrapped.
fn normalizes_case(predicate: &Predicate) -> bool {
    !predicate.case_sensitive
        && predicate.op.is_string_comparison()
        && matches!(predicate.value, Value::String(_))
}
