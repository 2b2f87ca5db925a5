//! Query composition and translation
//!
//! This module turns composed queries into search requests:
//! - `ast`: the serializable query tree (`QueryExpr`, `Expr`)
//! - `builder`: fluent composition of query chains
//! - `predicate`: boolean expressions to filter criteria
//! - `aggregate`: grouped projections to facets
//! - `translator`: the whole chain to a request plus its materializer
//!
//! # Example
//!
//! ```json
//! {
//!   "op": "select",
//!   "projection": { "kind": "aggregate", "aggregate": "count" },
//!   "source": {
//!     "op": "group_by",
//!     "key": { "kind": "member", "path": ["Zone"] },
//!     "source": { "op": "source", "doc_type": "Robot" }
//!   }
//! }
//! ```

mod aggregate;
pub mod ast;
pub mod builder;
pub mod predicate;
pub mod translator;

pub use ast::{field, value, AggregateKind, CompareOp, Expr, Member, QueryExpr, RecordField, Terminal};
pub use builder::{Document, Query};
pub use predicate::PredicateTranslator;
pub use translator::{translate, QueryTranslator, Translation};
