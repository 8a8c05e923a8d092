//! Criteria compiler: one executable query program per logical collection.

use serde_json::Value;
use tracing::debug;

use crate::criteria::{Criteria, JoinSpec, SortDirection};
use crate::error::{ArqoError, Result};
use crate::query::aql::{check_field_path, check_identifier, Expr, Query, Source, Terminal};
use crate::query::desugar::desugar;
use crate::query::filter::{emit, reference_path, KEY_FIELD};

/// Effectively unbounded limit, used when only `skip` is given so that
/// skip-without-limit never truncates to zero rows.
pub const MAX_LIMIT: u64 = i64::MAX as u64;

/// Group variable of the single-group aggregate clause.
const GROUP_VAR: &str = "g";

/// A compiled, store-specific program plus the manifest needed to shape its
/// results. Request-scoped; never cached across requests.
#[derive(Clone, Debug)]
pub struct CompiledQuery {
    /// Serialized AQL program.
    pub aql: String,
    /// Fields the caller selected, for post-execution trimming.
    pub select: Vec<String>,
    /// Joins the program performs, for post-execution merging.
    pub joins: Vec<JoinSpec>,
}

/// Compiles a find program (no joins) for one collection.
pub fn compile_find(collection: &str, criteria: &Criteria, case_default: bool) -> Result<CompiledQuery> {
    check_identifier(collection)?;
    let mut query = Query::over("d", Source::Collection(collection.to_string()));
    apply_criteria(&mut query, criteria, case_default)?;
    apply_return(&mut query, criteria)?;
    finish(query, criteria)
}

/// Compiles an update program: matched records are patched and the modified
/// copies returned.
pub fn compile_update(
    collection: &str,
    criteria: &Criteria,
    patch: &Value,
    case_default: bool,
) -> Result<CompiledQuery> {
    check_identifier(collection)?;
    if !patch.is_object() {
        return Err(ArqoError::validation(
            collection,
            "update patch must be an object",
        ));
    }
    let mut query = Query::over("d", Source::Collection(collection.to_string()));
    apply_criteria(&mut query, criteria, case_default)?;
    query.terminal = Terminal::Update {
        patch: patch.clone(),
        collection: collection.to_string(),
    };
    finish(query, criteria)
}

/// Compiles a destroy program: matched records are removed and the removed
/// copies returned.
pub fn compile_destroy(
    collection: &str,
    criteria: &Criteria,
    case_default: bool,
) -> Result<CompiledQuery> {
    check_identifier(collection)?;
    let mut query = Query::over("d", Source::Collection(collection.to_string()));
    apply_criteria(&mut query, criteria, case_default)?;
    query.terminal = Terminal::Remove {
        collection: collection.to_string(),
    };
    finish(query, criteria)
}

/// Applies filter, sort and pagination clauses from the criteria onto a
/// query. Shared with the join planner, which wraps its own sources.
pub(crate) fn apply_criteria(
    query: &mut Query,
    criteria: &Criteria,
    case_default: bool,
) -> Result<()> {
    if !criteria.where_.is_empty() {
        let predicates = desugar(&criteria.where_, case_default)?;
        query.filter = emit(&query.var, &predicates);
    }

    if !criteria.sort.is_empty() {
        for key in &criteria.sort {
            check_field_path(&key.field)?;
            query
                .sort
                .push((Expr::attr(&query.var, reference_path(&key.field)), key.direction));
        }
        // Trailing primary-key tie-break keeps pagination deterministic
        // across calls with identical sort keys.
        query
            .sort
            .push((Expr::attr(&query.var, KEY_FIELD), SortDirection::Asc));
    }

    match (criteria.skip, criteria.limit) {
        (_, Some(0)) => {
            return Err(ArqoError::validation("limit", "limit must be positive"));
        }
        (skip, Some(limit)) => query.limit = Some((skip.unwrap_or(0), limit)),
        (Some(skip), None) => query.limit = Some((skip, MAX_LIMIT)),
        (None, None) => {}
    }
    Ok(())
}

/// Applies the projection or single-group aggregate clause.
pub(crate) fn apply_return(query: &mut Query, criteria: &Criteria) -> Result<()> {
    if criteria.aggregates.is_empty() {
        query.terminal = Terminal::Return(Expr::Object(vec![(
            "d".to_string(),
            Expr::var(query.var.clone()),
        )]));
        return Ok(());
    }

    // All matching records collapse into one implicit group; the synthetic
    // record carries one field per (function, field) pair.
    query.collect_into = Some(GROUP_VAR.to_string());
    let mut fields = Vec::new();
    for (function, columns) in &criteria.aggregates {
        check_identifier(function)?;
        let name = function.to_uppercase();
        for column in columns {
            check_field_path(column)?;
            fields.push((
                column.clone(),
                Expr::func(
                    name.clone(),
                    vec![Expr::attr(format!("{GROUP_VAR}[*].{}", query.var), column)],
                ),
            ));
        }
    }
    query.terminal = Terminal::Return(Expr::Object(vec![(
        "d".to_string(),
        Expr::Object(fields),
    )]));
    Ok(())
}

fn finish(query: Query, criteria: &Criteria) -> Result<CompiledQuery> {
    let aql = query.to_aql()?;
    debug!(%aql, "compiled query");
    Ok(CompiledQuery {
        aql,
        select: criteria.select.clone(),
        joins: criteria.joins.clone(),
    })
}
