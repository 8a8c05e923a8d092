//! Join planner: relational correlated subqueries or graph traversals.
//!
//! The strategy is decided once per connection: with no named graph, each
//! join becomes a `LET`-bound correlated subquery over the child collection
//! with a conditional `MERGE` (a parent with zero matching children is still
//! returned, without the alias field). With a named graph, each join becomes
//! a depth-1 breadth-first traversal from the parent vertex, returning all
//! directly connected child vertices as a list.

use serde_json::Value;
use tracing::debug;

use crate::criteria::{Criteria, JoinSpec};
use crate::error::{ArqoError, Result};
use crate::model::{Direction, Schema};
use crate::query::aql::{
    check_field_path, check_identifier, CompareOp, Expr, LetBinding, Query, Source, Terminal,
    TraversalScope,
};
use crate::query::compiler::{apply_criteria, apply_return, CompiledQuery};
use crate::query::filter::reference_path;

/// Addressing mode of a standalone neighbor lookup.
#[derive(Clone, Debug)]
pub enum NeighborScope {
    /// Traverse a named graph.
    Graph(String),
    /// Traverse a single edge collection.
    EdgeCollection(String),
}

/// Compiles a join program, choosing the strategy by whether the connection
/// declares a named graph.
pub fn compile_join(
    collection: &str,
    criteria: &Criteria,
    case_default: bool,
    graph: Option<&str>,
    schema: &Schema,
) -> Result<CompiledQuery> {
    check_identifier(collection)?;
    for join in &criteria.joins {
        check_identifier(&join.alias)?;
        check_identifier(&join.parent)?;
        check_identifier(&join.child)?;
        check_field_path(&join.parent_key)?;
        check_field_path(&join.child_key)?;
    }
    match graph {
        None => relational(collection, criteria, case_default),
        Some(graph) => traversal(collection, criteria, case_default, graph, schema),
    }
}

/// Correlated-subquery strategy: merge each matched child onto the parent
/// under the join alias; unmatched parents pass through unmerged.
fn relational(collection: &str, criteria: &Criteria, case_default: bool) -> Result<CompiledQuery> {
    let mut inner = Query::over(collection, Source::Collection(collection.to_string()));
    let mut merge_args = vec![Expr::var(collection)];

    for join in &criteria.joins {
        let rows_var = format!("{}_rows", join.alias);
        let mut matches = Query::over(&join.alias, Source::Collection(join.child.clone()));
        matches.filter = Some(Expr::cmp(
            CompareOp::Eq,
            Expr::attr(&join.alias, reference_path(&join.child_key)),
            Expr::attr(collection, reference_path(&join.parent_key)),
        ));
        inner.lets.push(LetBinding {
            name: rows_var.clone(),
            query: matches,
        });
        merge_args.push(Expr::Ternary {
            cond: Box::new(Expr::cmp(
                CompareOp::Gt,
                Expr::func("LENGTH", vec![Expr::var(rows_var.clone())]),
                Expr::Literal(Value::from(0)),
            )),
            then: Box::new(Expr::Object(vec![(
                join.alias.clone(),
                Expr::func("FIRST", vec![Expr::var(rows_var)]),
            )])),
            otherwise: Box::new(Expr::Object(Vec::new())),
        });
    }
    inner.terminal = Terminal::Return(Expr::func("MERGE", merge_args));

    let mut outer = Query::over("d", Source::Subquery(Box::new(inner)));
    apply_criteria(&mut outer, criteria, case_default)?;
    apply_return(&mut outer, criteria)?;
    finish(outer, criteria)
}

/// Graph strategy: one bounded-depth traversal per join, attached to the
/// return shape next to the parent record.
fn traversal(
    collection: &str,
    criteria: &Criteria,
    case_default: bool,
    graph: &str,
    schema: &Schema,
) -> Result<CompiledQuery> {
    let mut query = Query::over("d", Source::Collection(collection.to_string()));
    apply_criteria(&mut query, criteria, case_default)?;

    let mut shape = vec![("d".to_string(), Expr::var("d"))];
    for join in &criteria.joins {
        let start_key = start_vertex_key(criteria, join)?;
        let direction = schema
            .get(&join.parent)
            .and_then(|col| col.relations().find(|rel| rel.target == join.child))
            .map_or(Direction::Any, |rel| rel.direction);

        let mut neighbors = Query::over(
            &join.alias,
            Source::Traversal {
                direction,
                start: format!("{}/{start_key}", join.parent),
                scope: TraversalScope::Graph(graph.to_string()),
            },
        );
        neighbors.filter = Some(Expr::func(
            "IS_SAME_COLLECTION",
            vec![
                Expr::Literal(Value::String(join.child.clone())),
                Expr::var(&join.alias),
            ],
        ));
        shape.push((join.alias.clone(), Expr::Subquery(Box::new(neighbors))));
    }
    query.terminal = Terminal::Return(Expr::Object(shape));
    finish(query, criteria)
}

/// Compiles a standalone depth-1 neighbor lookup for a vertex handle.
pub fn compile_neighbors(
    handle: &str,
    scope: &NeighborScope,
    direction: Direction,
) -> Result<CompiledQuery> {
    check_handle(handle)?;
    let scope = match scope {
        NeighborScope::Graph(name) => TraversalScope::Graph(name.clone()),
        NeighborScope::EdgeCollection(name) => {
            check_identifier(name)?;
            TraversalScope::EdgeCollection(name.clone())
        }
    };
    let query = Query::over(
        "n",
        Source::Traversal {
            direction,
            start: handle.to_string(),
            scope,
        },
    );
    let aql = query.to_aql()?;
    debug!(%aql, "compiled neighbor lookup");
    Ok(CompiledQuery {
        aql,
        select: Vec::new(),
        joins: Vec::new(),
    })
}

/// Validates a `collection/key` document handle.
pub fn check_handle(handle: &str) -> Result<(&str, &str)> {
    let Some((collection, key)) = handle.split_once('/') else {
        return Err(ArqoError::validation(
            handle,
            "expected a `collection/key` document handle",
        ));
    };
    check_identifier(collection)?;
    if key.is_empty() || key.contains('/') {
        return Err(ArqoError::validation(handle, "malformed document key"));
    }
    Ok((collection, key))
}

/// The graph strategy starts the traversal at `parent/<key>`; the key comes
/// from the criteria's child-key filter, falling back to the primary key.
fn start_vertex_key(criteria: &Criteria, join: &JoinSpec) -> Result<String> {
    let candidate = criteria
        .where_
        .get(&join.child_key)
        .or_else(|| criteria.where_.get("_key"))
        .or_else(|| criteria.where_.get("id"));
    match candidate {
        Some(Value::String(key)) => Ok(key.clone()),
        Some(Value::Number(key)) => Ok(key.to_string()),
        Some(_) | None => Err(ArqoError::validation(
            &join.alias,
            "graph join requires a literal start vertex key in the filter",
        )),
    }
}

fn finish(query: Query, criteria: &Criteria) -> Result<CompiledQuery> {
    let aql = query.to_aql()?;
    debug!(%aql, "compiled join query");
    Ok(CompiledQuery {
        aql,
        select: criteria.select.clone(),
        joins: criteria.joins.clone(),
    })
}
