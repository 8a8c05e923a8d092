//! Criteria-to-AQL compilation pipeline.
//!
//! Pure, synchronous and request-scoped: desugaring ([`desugar`]), predicate
//! emission ([`filter`]), program assembly ([`compiler`]) and join planning
//! ([`join`]) all build on the expression AST in [`aql`], with one
//! serialization step at the end.

pub mod aql;
pub mod compiler;
pub mod desugar;
pub mod filter;
pub mod join;

pub use aql::{CompareOp, Expr, Query, Source, Terminal, TraversalScope};
pub use compiler::{compile_destroy, compile_find, compile_update, CompiledQuery, MAX_LIMIT};
pub use desugar::{desugar, Predicate};
pub use filter::emit;
pub use join::{compile_join, compile_neighbors, NeighborScope};
