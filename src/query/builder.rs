//! Fluent composition of query chains

use super::ast::{Expr, QueryExpr, Terminal};

/// A document type that can be queried
pub trait Document {
    /// Type name passed to the mapping to find the collection
    fn type_name() -> &'static str;
}

/// Composable query over one document collection
///
/// Each method wraps the current chain in one more operation; nothing is
/// evaluated until the expression is handed to the translator.
///
/// # Example
///
/// ```
/// use elastiq::query::{field, Expr, Query};
///
/// let query = Query::source("Robot")
///     .filter(field("Zone").is_not_null())
///     .group_by(field("Zone"))
///     .select(Expr::count_where(field("Cost").equals(2.0)));
/// assert_eq!(query.expression().name(), "Select");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    expr: QueryExpr,
}

impl Query {
    /// Query over all documents of `T`
    pub fn from<T: Document>() -> Self {
        Self::source(T::type_name())
    }

    /// Query over all documents of the named type
    pub fn source(doc_type: impl Into<String>) -> Self {
        Self {
            expr: QueryExpr::Source {
                doc_type: doc_type.into(),
            },
        }
    }

    fn wrap(self, f: impl FnOnce(Box<QueryExpr>) -> QueryExpr) -> Self {
        Self {
            expr: f(Box::new(self.expr)),
        }
    }

    /// Keep documents matching `predicate` (non-scoring)
    pub fn filter(self, predicate: Expr) -> Self {
        self.wrap(|source| QueryExpr::Where {
            source,
            predicate: Some(predicate),
        })
    }

    /// Keep documents matching `predicate`, contributing to relevance
    pub fn query(self, predicate: Expr) -> Self {
        self.wrap(|source| QueryExpr::Query {
            source,
            predicate: Some(predicate),
        })
    }

    /// Free-text query in the engine's query-string syntax
    pub fn query_string(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.wrap(|source| QueryExpr::QueryString {
            source,
            text: Some(text),
        })
    }

    fn order(self, key: Expr, descending: bool, then: bool) -> Self {
        self.wrap(|source| QueryExpr::OrderBy {
            source,
            key: Some(key),
            descending,
            then,
        })
    }

    pub fn order_by(self, key: Expr) -> Self {
        self.order(key, false, false)
    }

    pub fn order_by_descending(self, key: Expr) -> Self {
        self.order(key, true, false)
    }

    pub fn then_by(self, key: Expr) -> Self {
        self.order(key, false, true)
    }

    pub fn then_by_descending(self, key: Expr) -> Self {
        self.order(key, true, true)
    }

    fn order_score(self, descending: bool, then: bool) -> Self {
        self.wrap(|source| QueryExpr::OrderByScore {
            source,
            descending,
            then,
        })
    }

    pub fn order_by_score(self) -> Self {
        self.order_score(false, false)
    }

    pub fn order_by_score_descending(self) -> Self {
        self.order_score(true, false)
    }

    pub fn then_by_score(self) -> Self {
        self.order_score(false, true)
    }

    pub fn then_by_score_descending(self) -> Self {
        self.order_score(true, true)
    }

    pub fn skip(self, count: usize) -> Self {
        self.wrap(|source| QueryExpr::Skip { source, count })
    }

    pub fn take(self, count: usize) -> Self {
        self.wrap(|source| QueryExpr::Take { source, count })
    }

    /// Group documents by `key`; a constant key aggregates the whole collection
    pub fn group_by(self, key: Expr) -> Self {
        self.wrap(|source| QueryExpr::GroupBy {
            source,
            key: Some(key),
        })
    }

    pub fn select(self, projection: Expr) -> Self {
        self.wrap(|source| QueryExpr::Select {
            source,
            projection: Some(projection),
        })
    }

    fn execute(self, terminal: Terminal, predicate: Option<Expr>) -> Self {
        self.wrap(|source| QueryExpr::Execute {
            source,
            terminal,
            predicate,
        })
    }

    /// First matching document, or null when nothing matches
    pub fn first(self) -> Self {
        self.execute(Terminal::First, None)
    }

    pub fn first_where(self, predicate: Expr) -> Self {
        self.execute(Terminal::First, Some(predicate))
    }

    /// Number of matching documents
    pub fn count(self) -> Self {
        self.execute(Terminal::Count, None)
    }

    pub fn count_where(self, predicate: Expr) -> Self {
        self.execute(Terminal::Count, Some(predicate))
    }

    /// Whether any document matches
    pub fn any(self) -> Self {
        self.execute(Terminal::Any, None)
    }

    pub fn any_where(self, predicate: Expr) -> Self {
        self.execute(Terminal::Any, Some(predicate))
    }

    pub fn expression(&self) -> &QueryExpr {
        &self.expr
    }

    pub fn into_expression(self) -> QueryExpr {
        self.expr
    }
}

impl From<QueryExpr> for Query {
    fn from(expr: QueryExpr) -> Self {
        Self { expr }
    }
}
