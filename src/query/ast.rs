//! Abstract syntax tree for composed queries
//!
//! A query is a chain of operations (`QueryExpr`) ending in a document
//! source. Predicates, keys and projections inside the operations are
//! value expressions (`Expr`). Both trees are plain data: they serialize
//! to JSON and can be built by hand, deserialized, or composed with the
//! fluent [`Query`](super::builder::Query) builder.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to a (possibly nested) member of a document
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub path: Vec<String>,
}

impl Member {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            path: vec![name.into()],
        }
    }

    /// Member reached through nested objects, outermost first
    pub fn nested<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    /// Innermost member name
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }
}

/// Comparison operator of a binary predicate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// Aggregate function over the documents of a group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Count,
    Sum,
    Average,
    Min,
    Max,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "Count",
            AggregateKind::Sum => "Sum",
            AggregateKind::Average => "Average",
            AggregateKind::Min => "Min",
            AggregateKind::Max => "Max",
        }
    }
}

/// Named member of a compound projection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub expr: Expr,
}

/// Value expression used by predicates, keys and projections
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Member(Member),
    Constant {
        value: Value,
    },
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Or {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not {
        operand: Box<Expr>,
    },
    /// String member starts with a prefix
    Prefix {
        member: Member,
        prefix: String,
    },
    /// String member matches a regular expression
    Regexp {
        member: Member,
        pattern: String,
    },
    /// Aggregate over a group; `argument` is the predicate of `Count`
    /// or the member selector of the numeric aggregates
    Aggregate {
        aggregate: AggregateKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        argument: Option<Box<Expr>>,
    },
    /// Key of the current group
    GroupKey,
    /// Compound projection with named members
    Record {
        fields: Vec<RecordField>,
    },
}

/// Shorthand for a member reference
pub fn field(name: impl Into<String>) -> Expr {
    Expr::Member(Member::new(name))
}

/// Shorthand for a constant
pub fn value(value: impl Into<Value>) -> Expr {
    Expr::Constant {
        value: value.into(),
    }
}

impl Expr {
    pub fn null() -> Self {
        Expr::Constant { value: Value::Null }
    }

    fn compare(self, op: CompareOp, other: impl Into<Expr>) -> Self {
        Expr::Compare {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn equals(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Eq, other)
    }

    pub fn not_equals(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Ne, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Gt, other)
    }

    pub fn gte(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Ge, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Lt, other)
    }

    pub fn lte(self, other: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Le, other)
    }

    pub fn is_null(self) -> Self {
        self.equals(Expr::null())
    }

    pub fn is_not_null(self) -> Self {
        self.not_equals(Expr::null())
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::And {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::Or {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    pub fn starts_with(member: Member, prefix: impl Into<String>) -> Self {
        Expr::Prefix {
            member,
            prefix: prefix.into(),
        }
    }

    pub fn regexp(member: Member, pattern: impl Into<String>) -> Self {
        Expr::Regexp {
            member,
            pattern: pattern.into(),
        }
    }

    fn aggregate(aggregate: AggregateKind, argument: Option<Expr>) -> Self {
        Expr::Aggregate {
            aggregate,
            argument: argument.map(Box::new),
        }
    }

    /// Number of documents in the group
    pub fn count() -> Self {
        Self::aggregate(AggregateKind::Count, None)
    }

    /// Number of documents in the group matching `predicate`
    pub fn count_where(predicate: Expr) -> Self {
        Self::aggregate(AggregateKind::Count, Some(predicate))
    }

    pub fn sum(selector: Expr) -> Self {
        Self::aggregate(AggregateKind::Sum, Some(selector))
    }

    pub fn average(selector: Expr) -> Self {
        Self::aggregate(AggregateKind::Average, Some(selector))
    }

    pub fn min(selector: Expr) -> Self {
        Self::aggregate(AggregateKind::Min, Some(selector))
    }

    pub fn max(selector: Expr) -> Self {
        Self::aggregate(AggregateKind::Max, Some(selector))
    }

    pub fn group_key() -> Self {
        Expr::GroupKey
    }

    /// Compound projection from `(name, expression)` pairs
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        Expr::Record {
            fields: fields
                .into_iter()
                .map(|(name, expr)| RecordField {
                    name: name.into(),
                    expr,
                })
                .collect(),
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            Expr::Member(_) => "member access",
            Expr::Constant { .. } => "constant",
            Expr::Compare { .. } => "comparison",
            Expr::And { .. } => "logical and",
            Expr::Or { .. } => "logical or",
            Expr::Not { .. } => "logical not",
            Expr::Prefix { .. } => "prefix match",
            Expr::Regexp { .. } => "regular expression match",
            Expr::Aggregate { .. } => "aggregate",
            Expr::GroupKey => "group key",
            Expr::Record { .. } => "record projection",
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not {
            operand: Box::new(self),
        }
    }
}

impl From<Member> for Expr {
    fn from(member: Member) -> Self {
        Expr::Member(member)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Constant { value }
    }
}

macro_rules! constant_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(v: $t) -> Self {
                    value(v)
                }
            }
        )*
    };
}

constant_from!(bool, i32, i64, u32, u64, f64, &str, String);

/// Terminal operation selecting the result shape of a hit query
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    First,
    Count,
    Any,
}

/// One operation in a composed query chain
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryExpr {
    /// Documents of one type
    Source { doc_type: String },
    Where {
        source: Box<QueryExpr>,
        #[serde(default)]
        predicate: Option<Expr>,
    },
    /// Scoring predicate placed in the query section rather than the filter
    Query {
        source: Box<QueryExpr>,
        #[serde(default)]
        predicate: Option<Expr>,
    },
    QueryString {
        source: Box<QueryExpr>,
        #[serde(default)]
        text: Option<String>,
    },
    OrderBy {
        source: Box<QueryExpr>,
        #[serde(default)]
        key: Option<Expr>,
        #[serde(default)]
        descending: bool,
        /// Secondary ordering (`ThenBy`) rather than a new primary one
        #[serde(default)]
        then: bool,
    },
    OrderByScore {
        source: Box<QueryExpr>,
        #[serde(default)]
        descending: bool,
        #[serde(default)]
        then: bool,
    },
    Skip {
        source: Box<QueryExpr>,
        count: usize,
    },
    Take {
        source: Box<QueryExpr>,
        count: usize,
    },
    GroupBy {
        source: Box<QueryExpr>,
        #[serde(default)]
        key: Option<Expr>,
    },
    Select {
        source: Box<QueryExpr>,
        #[serde(default)]
        projection: Option<Expr>,
    },
    Execute {
        source: Box<QueryExpr>,
        terminal: Terminal,
        /// Optional predicate of `Count`/`Any`/`First`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        predicate: Option<Expr>,
    },
}

impl QueryExpr {
    /// The operation this one is applied to, `None` for the source
    pub fn source(&self) -> Option<&QueryExpr> {
        match self {
            QueryExpr::Source { .. } => None,
            QueryExpr::Where { source, .. }
            | QueryExpr::Query { source, .. }
            | QueryExpr::QueryString { source, .. }
            | QueryExpr::OrderBy { source, .. }
            | QueryExpr::OrderByScore { source, .. }
            | QueryExpr::Skip { source, .. }
            | QueryExpr::Take { source, .. }
            | QueryExpr::GroupBy { source, .. }
            | QueryExpr::Select { source, .. }
            | QueryExpr::Execute { source, .. } => Some(source),
        }
    }

    /// Operation name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            QueryExpr::Source { .. } => "Source",
            QueryExpr::Where { .. } => "Where",
            QueryExpr::Query { .. } => "Query",
            QueryExpr::QueryString { .. } => "QueryString",
            QueryExpr::OrderBy { then: false, .. } => "OrderBy",
            QueryExpr::OrderBy { then: true, .. } => "ThenBy",
            QueryExpr::OrderByScore { then: false, .. } => "OrderByScore",
            QueryExpr::OrderByScore { then: true, .. } => "ThenByScore",
            QueryExpr::Skip { .. } => "Skip",
            QueryExpr::Take { .. } => "Take",
            QueryExpr::GroupBy { .. } => "GroupBy",
            QueryExpr::Select { .. } => "Select",
            QueryExpr::Execute { terminal, .. } => match terminal {
                Terminal::First => "First",
                Terminal::Count => "Count",
                Terminal::Any => "Any",
            },
        }
    }

    /// Operations from the source outwards, the source first
    pub fn chain(&self) -> Vec<&QueryExpr> {
        let mut ops = Vec::new();
        let mut current = Some(self);
        while let Some(op) = current {
            ops.push(op);
            current = op.source();
        }
        ops.reverse();
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_name() {
        assert_eq!(Member::new("Zone").name(), "Zone");
        assert_eq!(Member::nested(["Address", "City"]).name(), "City");
    }

    #[test]
    fn test_comparison_builders() {
        let expr = field("Cost").gt(5.0);
        match expr {
            Expr::Compare { op, left, right } => {
                assert_eq!(op, CompareOp::Gt);
                assert_eq!(*left, field("Cost"));
                assert_eq!(*right, value(5.0));
            }
            other => panic!("expected comparison, got {:?}", other),
        }

        assert!(matches!(!field("Active"), Expr::Not { .. }));
    }

    #[test]
    fn test_chain_order() {
        let query = QueryExpr::Take {
            source: Box::new(QueryExpr::Where {
                source: Box::new(QueryExpr::Source {
                    doc_type: "Robot".to_string(),
                }),
                predicate: Some(field("Zone").is_not_null()),
            }),
            count: 5,
        };

        let names: Vec<&str> = query.chain().iter().map(|op| op.name()).collect();
        assert_eq!(names, vec!["Source", "Where", "Take"]);
    }

    #[test]
    fn test_expression_json_shape() {
        let expr = field("Cost").gt(5);
        assert_eq!(
            serde_json::to_value(&expr).unwrap(),
            json!({
                "kind": "compare",
                "op": "gt",
                "left": { "kind": "member", "path": ["Cost"] },
                "right": { "kind": "constant", "value": 5 }
            })
        );
    }

    #[test]
    fn test_missing_predicate_deserializes_as_none() {
        let query: QueryExpr = serde_json::from_value(json!({
            "op": "where",
            "source": { "op": "source", "doc_type": "Robot" }
        }))
        .unwrap();

        assert!(matches!(query, QueryExpr::Where { predicate: None, .. }));
    }
}
