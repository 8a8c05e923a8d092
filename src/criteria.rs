//! Caller-supplied description of which records to filter, sort and shape.
//!
//! Criteria arrive either as host-ORM JSON (everything derives
//! `Deserialize`) or through the fluent helpers on [`Criteria`]. The filter
//! tree itself stays JSON-shaped: a mapping of field path to either a scalar
//! (equality), an array (membership) or a nested operator clause. The
//! operator desugarer gives it a canonical form before any emission happens.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::{ArqoError, Result};

/// Recursive filter tree: field path to scalar, array or operator clause.
///
/// `serde_json::Map` is backed by a `BTreeMap`, so iteration (and therefore
/// compiled output) is deterministic regardless of host insertion order.
pub type FilterTree = serde_json::Map<String, Value>;

/// Sort direction for one sort key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// AQL keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One sort term.
#[derive(Clone, Debug, Deserialize)]
pub struct SortKey {
    /// Field path to sort on.
    pub field: String,
    /// Direction.
    #[serde(default)]
    pub direction: SortDirection,
}

/// One requested join between a parent and a child collection.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSpec {
    /// Field name the joined record(s) are merged under.
    pub alias: String,
    /// Parent collection name.
    pub parent: String,
    /// Parent-side key attribute.
    pub parent_key: String,
    /// Child collection name.
    pub child: String,
    /// Child-side key attribute.
    pub child_key: String,
}

/// Full criteria for one find/join/update/destroy request.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Criteria {
    /// Filter tree; empty means match everything.
    #[serde(rename = "where")]
    pub where_: FilterTree,
    /// Sort keys, in priority order.
    pub sort: Vec<SortKey>,
    /// Records to skip before returning.
    pub skip: Option<u64>,
    /// Maximum records to return. Must be positive when set.
    pub limit: Option<u64>,
    /// Fields to return; empty means the whole record.
    pub select: Vec<String>,
    /// Joins to perform, in order.
    pub joins: Vec<JoinSpec>,
    /// Aggregate functions: function name to the fields it is applied to.
    pub aggregates: BTreeMap<String, Vec<String>>,
}

impl Criteria {
    /// Empty criteria (match everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter tree from a JSON object.
    pub fn filter(mut self, tree: Value) -> Result<Self> {
        match tree {
            Value::Object(map) => {
                self.where_ = map;
                Ok(self)
            }
            other => Err(ArqoError::validation(
                "where",
                format!("expected an object, got {other}"),
            )),
        }
    }

    /// Appends a sort key.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    /// Sets the number of records to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Sets the maximum number of records to return.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Restricts returned fields.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a join.
    pub fn join(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    /// Requests an aggregate function over the given fields.
    pub fn aggregate<I, S>(mut self, function: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aggregates
            .insert(function.into(), fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Converts a date to its RFC 3339 wire form for use in a filter tree.
pub fn iso8601(ts: OffsetDateTime) -> Value {
    // Rfc3339 formatting of an OffsetDateTime cannot fail.
    ts.format(&Rfc3339)
        .map(Value::String)
        .unwrap_or(Value::Null)
}
