//! AQL program AST and its single serialization step.
//!
//! The compiler and join planner build [`Query`] trees; nothing in the crate
//! concatenates caller input into query text directly. Literal values are
//! emitted through `serde_json` (JSON literal syntax is valid AQL), so
//! strings, arrays and nested objects are always quoted and escaped in one
//! place. Identifiers (field paths, collection names, variables) are
//! validated against a restricted grammar before they reach the AST.

use serde_json::Value;

use crate::criteria::SortDirection;
use crate::error::{ArqoError, Result};
use crate::model::Direction;

/// Canonical comparison operator after desugaring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `LIKE`
    Like,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CompareOp {
    /// AQL spelling.
    pub fn aql(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }

    /// True for the bound comparisons that take an attribute-existence guard.
    pub fn is_bound(self) -> bool {
        matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
    }

    /// True for operators where case normalization applies to string
    /// operands. Membership operators never normalize.
    pub fn is_string_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Neq | Self::Like)
    }
}

/// Boolean/value expression node.
#[derive(Clone, Debug)]
pub enum Expr {
    /// Attribute reference rooted at a loop variable, e.g. `d.profile.age`.
    Ref {
        /// Loop variable.
        var: String,
        /// Dotted attribute path under the variable; `None` for the variable
        /// itself.
        path: Option<String>,
    },
    /// JSON literal, serialized through `serde_json`.
    Literal(Value),
    /// `LOWER(inner)` case-normalization wrapper.
    Lower(Box<Expr>),
    /// `HAS(var, "field")` attribute-existence guard.
    Has {
        /// Document variable.
        var: String,
        /// Attribute path tested for existence.
        field: String,
    },
    /// Binary comparison.
    Cmp {
        /// Operator.
        op: CompareOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Parenthesized conjunction.
    And(Vec<Expr>),
    /// Function call, e.g. `AVERAGE(g[*].d.age)`.
    Func {
        /// Function name, already upper-cased.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// Parenthesized ternary `(cond ? then : else)`.
    Ternary {
        /// Condition.
        cond: Box<Expr>,
        /// Value when true.
        then: Box<Expr>,
        /// Value when false.
        otherwise: Box<Expr>,
    },
    /// Object constructor `{key: expr, ...}`.
    Object(Vec<(String, Expr)>),
    /// Parenthesized subquery.
    Subquery(Box<Query>),
}

impl Expr {
    /// Reference to the loop variable itself.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Ref {
            var: name.into(),
            path: None,
        }
    }

    /// Reference to an attribute under a loop variable.
    pub fn attr(var: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Ref {
            var: var.into(),
            path: Some(path.into()),
        }
    }

    /// Comparison node.
    pub fn cmp(op: CompareOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Cmp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Function-call node.
    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Func {
            name: name.into(),
            args,
        }
    }

    fn render(&self, out: &mut String) -> Result<()> {
        match self {
            Self::Ref { var, path } => {
                out.push_str(var);
                if let Some(path) = path {
                    out.push('.');
                    out.push_str(path);
                }
            }
            Self::Literal(value) => out.push_str(&json_literal(value)?),
            Self::Lower(inner) => {
                out.push_str("LOWER(");
                inner.render(out)?;
                out.push(')');
            }
            Self::Has { var, field } => {
                out.push_str("HAS(");
                out.push_str(var);
                out.push_str(", ");
                out.push_str(&json_literal(&Value::String(field.clone()))?);
                out.push(')');
            }
            Self::Cmp { op, lhs, rhs } => {
                lhs.render(out)?;
                out.push(' ');
                out.push_str(op.aql());
                out.push(' ');
                rhs.render(out)?;
            }
            Self::And(terms) => {
                out.push('(');
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    term.render(out)?;
                }
                out.push(')');
            }
            Self::Func { name, args } => {
                out.push_str(name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.render(out)?;
                }
                out.push(')');
            }
            Self::Ternary {
                cond,
                then,
                otherwise,
            } => {
                out.push('(');
                cond.render(out)?;
                out.push_str(" ? ");
                then.render(out)?;
                out.push_str(" : ");
                otherwise.render(out)?;
                out.push(')');
            }
            Self::Object(fields) => {
                out.push('{');
                for (i, (key, expr)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if is_identifier(key) {
                        out.push_str(key);
                    } else {
                        out.push_str(&json_literal(&Value::String(key.clone()))?);
                    }
                    out.push_str(": ");
                    expr.render(out)?;
                }
                out.push('}');
            }
            Self::Subquery(query) => {
                out.push('(');
                query.render(out)?;
                out.push(')');
            }
        }
        Ok(())
    }
}

/// Traversal scope: a named graph or a bare edge collection.
#[derive(Clone, Debug)]
pub enum TraversalScope {
    /// `GRAPH "name"`.
    Graph(String),
    /// A single edge collection.
    EdgeCollection(String),
}

/// Record source of a `FOR` loop.
#[derive(Clone, Debug)]
pub enum Source {
    /// A physical collection.
    Collection(String),
    /// A parenthesized subquery.
    Subquery(Box<Query>),
    /// Depth-1, unique-vertex, breadth-first graph traversal.
    Traversal {
        /// Traversal direction.
        direction: Direction,
        /// Start vertex handle (`collection/key`).
        start: String,
        /// Graph or edge collection to traverse.
        scope: TraversalScope,
    },
}

/// `LET name = (subquery)` binding.
#[derive(Clone, Debug)]
pub struct LetBinding {
    /// Bound variable name.
    pub name: String,
    /// The subquery producing its value.
    pub query: Query,
}

/// Final clause of a query program.
#[derive(Clone, Debug)]
pub enum Terminal {
    /// `RETURN expr`.
    Return(Expr),
    /// `UPDATE var WITH patch IN collection LET modified = NEW RETURN modified`.
    Update {
        /// Patch document.
        patch: Value,
        /// Target collection.
        collection: String,
    },
    /// `REMOVE var IN collection LET removed = OLD RETURN removed`.
    Remove {
        /// Target collection.
        collection: String,
    },
}

/// One `FOR`-loop query program.
#[derive(Clone, Debug)]
pub struct Query {
    /// Loop variable.
    pub var: String,
    /// Record source.
    pub source: Source,
    /// `LET` bindings evaluated per record.
    pub lets: Vec<LetBinding>,
    /// Optional filter expression.
    pub filter: Option<Expr>,
    /// Sort terms.
    pub sort: Vec<(Expr, SortDirection)>,
    /// `(skip, count)` pagination window.
    pub limit: Option<(u64, u64)>,
    /// Single-group collect variable (`COLLECT Group = "all" INTO <var>`).
    pub collect_into: Option<String>,
    /// Final clause.
    pub terminal: Terminal,
}

impl Query {
    /// Minimal query over a source, returning the raw record.
    pub fn over(var: impl Into<String>, source: Source) -> Self {
        let var = var.into();
        let terminal = Terminal::Return(Expr::var(var.clone()));
        Self {
            var,
            source,
            lets: Vec::new(),
            filter: None,
            sort: Vec::new(),
            limit: None,
            collect_into: None,
            terminal,
        }
    }

    /// Serializes the whole program to AQL text.
    pub fn to_aql(&self) -> Result<String> {
        let mut out = String::new();
        self.render(&mut out)?;
        Ok(out)
    }

    fn render(&self, out: &mut String) -> Result<()> {
        out.push_str("FOR ");
        out.push_str(&self.var);
        out.push_str(" IN ");
        match &self.source {
            Source::Collection(name) => out.push_str(name),
            Source::Subquery(query) => {
                out.push('(');
                query.render(out)?;
                out.push(')');
            }
            Source::Traversal {
                direction,
                start,
                scope,
            } => {
                out.push_str("1..1 ");
                out.push_str(direction.keyword());
                out.push(' ');
                out.push_str(&json_literal(&Value::String(start.clone()))?);
                match scope {
                    TraversalScope::Graph(name) => {
                        out.push_str(" GRAPH ");
                        out.push_str(&json_literal(&Value::String(name.clone()))?);
                    }
                    TraversalScope::EdgeCollection(name) => {
                        out.push(' ');
                        out.push_str(name);
                    }
                }
                out.push_str(" OPTIONS {bfs: true, uniqueVertices: \"global\"}");
            }
        }
        for binding in &self.lets {
            out.push_str(" LET ");
            out.push_str(&binding.name);
            out.push_str(" = (");
            binding.query.render(out)?;
            out.push(')');
        }
        if let Some(filter) = &self.filter {
            out.push_str(" FILTER ");
            filter.render(out)?;
        }
        if !self.sort.is_empty() {
            out.push_str(" SORT ");
            for (i, (expr, direction)) in self.sort.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                expr.render(out)?;
                out.push(' ');
                out.push_str(direction.keyword());
            }
        }
        if let Some((skip, count)) = self.limit {
            out.push_str(&format!(" LIMIT {skip}, {count}"));
        }
        if let Some(group_var) = &self.collect_into {
            out.push_str(" COLLECT Group = \"all\" INTO ");
            out.push_str(group_var);
        }
        match &self.terminal {
            Terminal::Return(expr) => {
                out.push_str(" RETURN ");
                expr.render(out)?;
            }
            Terminal::Update { patch, collection } => {
                out.push_str(" UPDATE ");
                out.push_str(&self.var);
                out.push_str(" WITH ");
                out.push_str(&json_literal(patch)?);
                out.push_str(" IN ");
                out.push_str(collection);
                out.push_str(" LET modified = NEW RETURN modified");
            }
            Terminal::Remove { collection } => {
                out.push_str(" REMOVE ");
                out.push_str(&self.var);
                out.push_str(" IN ");
                out.push_str(collection);
                out.push_str(" LET removed = OLD RETURN removed");
            }
        }
        Ok(())
    }
}

fn json_literal(value: &Value) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| ArqoError::Compilation(format!("literal serialization failed: {e}")))
}

/// True when `name` is a bare identifier: letter or underscore, then
/// letters, digits, underscores or dashes.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validates a variable, collection or alias name.
pub fn check_identifier(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ArqoError::validation(
            name,
            "not a valid identifier (letter or `_`, then letters, digits, `_` or `-`)",
        ))
    }
}

/// Validates a dotted field path.
pub fn check_field_path(path: &str) -> Result<()> {
    if !path.is_empty() && path.split('.').all(is_identifier) {
        Ok(())
    } else {
        Err(ArqoError::validation(
            path,
            "not a valid field path (dot-separated identifiers)",
        ))
    }
}
