//! Filter criteria tree
//!
//! Criteria are the leaves and combinators of the filter section of a
//! search request. Every leaf holds exactly one resolved field name; the
//! combinators (`and`, `or`, `not`) flatten as they build so the emitted
//! tree carries no redundant wrapper levels.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Comparison used by one bound of a range criterion
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeComparison {
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    GreaterThanOrEqual,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "lte")]
    LessThanOrEqual,
}

impl RangeComparison {
    /// Wire token for this comparison
    pub fn token(&self) -> &'static str {
        match self {
            RangeComparison::GreaterThan => "gt",
            RangeComparison::GreaterThanOrEqual => "gte",
            RangeComparison::LessThan => "lt",
            RangeComparison::LessThanOrEqual => "lte",
        }
    }

    /// The comparison seen from the other operand (`5 < x` is `x > 5`)
    pub fn flip(&self) -> Self {
        match self {
            RangeComparison::GreaterThan => RangeComparison::LessThan,
            RangeComparison::GreaterThanOrEqual => RangeComparison::LessThanOrEqual,
            RangeComparison::LessThan => RangeComparison::GreaterThan,
            RangeComparison::LessThanOrEqual => RangeComparison::GreaterThanOrEqual,
        }
    }
}

/// One bound of a range criterion
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeSpecification {
    pub comparison: RangeComparison,
    pub value: Value,
}

impl RangeSpecification {
    pub fn new(comparison: RangeComparison, value: impl Into<Value>) -> Self {
        Self {
            comparison,
            value: value.into(),
        }
    }

    /// Wire name of the bound (`gt`, `gte`, `lt`, `lte`)
    pub fn name(&self) -> &'static str {
        self.comparison.token()
    }
}

/// Conjunction, disjunction and negation of child criteria
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoolCriteria {
    pub must: Vec<Criteria>,
    pub should: Vec<Criteria>,
    pub must_not: Vec<Criteria>,
}

impl BoolCriteria {
    fn is_must_only(&self) -> bool {
        self.should.is_empty() && self.must_not.is_empty()
    }

    fn is_should_only(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }
}

/// A node in the filter tree of a search request
#[derive(Clone, Debug, PartialEq)]
pub enum Criteria {
    /// Matches every document
    MatchAll,
    /// Field equals value
    Term { field: String, value: Value },
    /// Field equals any of the values
    Terms { field: String, values: Vec<Value> },
    /// Field within all of the bounds
    Range {
        field: String,
        specifications: Vec<RangeSpecification>,
    },
    /// Field has a non-null value
    Exists { field: String },
    /// Field is null or absent
    Missing { field: String },
    /// Field starts with a prefix
    Prefix { field: String, prefix: String },
    /// Field matches a regular expression
    Regexp { field: String, pattern: String },
    /// Free-text query passed through to the engine
    QueryString { query: String },
    Bool(BoolCriteria),
}

impl Criteria {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Criteria::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms(field: impl Into<String>, values: Vec<Value>) -> Self {
        Criteria::Terms {
            field: field.into(),
            values,
        }
    }

    pub fn range(field: impl Into<String>, comparison: RangeComparison, value: impl Into<Value>) -> Self {
        Criteria::Range {
            field: field.into(),
            specifications: vec![RangeSpecification::new(comparison, value)],
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Criteria::Exists {
            field: field.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Criteria::Missing {
            field: field.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Criteria::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    pub fn regexp(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Criteria::Regexp {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn query_string(query: impl Into<String>) -> Self {
        Criteria::QueryString {
            query: query.into(),
        }
    }

    /// Conjunction of criteria.
    ///
    /// Must-only children are spliced into the result, and ranges on the
    /// same field merge into one range whose bounds all apply. A single
    /// remaining criterion is returned unwrapped.
    pub fn and(criteria: impl IntoIterator<Item = Criteria>) -> Criteria {
        let mut must: Vec<Criteria> = Vec::new();
        for criterion in criteria {
            match criterion {
                Criteria::Bool(b) if b.is_must_only() => {
                    for inner in b.must {
                        push_conjunct(&mut must, inner);
                    }
                }
                Criteria::MatchAll => {}
                other => push_conjunct(&mut must, other),
            }
        }

        match must.len() {
            0 => Criteria::MatchAll,
            1 => must.remove(0),
            _ => Criteria::Bool(BoolCriteria {
                must,
                ..Default::default()
            }),
        }
    }

    /// Disjunction of criteria.
    ///
    /// Should-only children are spliced into the result, and equality
    /// branches on the same field combine into a single `Terms`.
    pub fn or(criteria: impl IntoIterator<Item = Criteria>) -> Criteria {
        let mut should: Vec<Criteria> = Vec::new();
        for criterion in criteria {
            match criterion {
                Criteria::Bool(b) if b.is_should_only() => {
                    for inner in b.should {
                        push_disjunct(&mut should, inner);
                    }
                }
                other => push_disjunct(&mut should, other),
            }
        }

        if should.len() == 1 {
            return should.remove(0);
        }
        Criteria::Bool(BoolCriteria {
            should,
            ..Default::default()
        })
    }

    /// Negation of a criterion
    pub fn not(criterion: Criteria) -> Criteria {
        match criterion {
            Criteria::Exists { field } => Criteria::Missing { field },
            Criteria::Missing { field } => Criteria::Exists { field },
            Criteria::Bool(b)
                if b.must.is_empty() && b.should.is_empty() && b.must_not.len() == 1 =>
            {
                b.must_not.into_iter().next().unwrap_or(Criteria::MatchAll)
            }
            other => Criteria::Bool(BoolCriteria {
                must_not: vec![other],
                ..Default::default()
            }),
        }
    }

    /// The field a leaf criterion applies to
    pub fn field(&self) -> Option<&str> {
        match self {
            Criteria::Term { field, .. }
            | Criteria::Terms { field, .. }
            | Criteria::Range { field, .. }
            | Criteria::Exists { field }
            | Criteria::Missing { field }
            | Criteria::Prefix { field, .. }
            | Criteria::Regexp { field, .. } => Some(field),
            Criteria::MatchAll | Criteria::QueryString { .. } | Criteria::Bool(_) => None,
        }
    }

    /// Wire name of this criterion
    pub fn name(&self) -> &'static str {
        match self {
            Criteria::MatchAll => "match_all",
            Criteria::Term { .. } => "term",
            Criteria::Terms { .. } => "terms",
            Criteria::Range { .. } => "range",
            Criteria::Exists { .. } => "exists",
            Criteria::Missing { .. } => "missing",
            Criteria::Prefix { .. } => "prefix",
            Criteria::Regexp { .. } => "regexp",
            Criteria::QueryString { .. } => "query_string",
            Criteria::Bool(_) => "bool",
        }
    }

    /// Encode as the engine's JSON filter form
    pub fn to_json(&self) -> Value {
        let body = match self {
            Criteria::MatchAll => json!({}),
            Criteria::Term { field, value } => single(field, value.clone()),
            Criteria::Terms { field, values } => single(field, Value::Array(values.clone())),
            Criteria::Range {
                field,
                specifications,
            } => {
                let mut bounds = Map::new();
                for spec in specifications {
                    bounds.insert(spec.name().to_string(), spec.value.clone());
                }
                single(field, Value::Object(bounds))
            }
            Criteria::Exists { field } | Criteria::Missing { field } => json!({ "field": field }),
            Criteria::Prefix { field, prefix } => single(field, json!(prefix)),
            Criteria::Regexp { field, pattern } => single(field, json!(pattern)),
            Criteria::QueryString { query } => json!({ "query": query }),
            Criteria::Bool(b) => {
                let mut clauses = Map::new();
                for (name, items) in [("must", &b.must), ("should", &b.should), ("must_not", &b.must_not)] {
                    if !items.is_empty() {
                        clauses.insert(
                            name.to_string(),
                            Value::Array(items.iter().map(Criteria::to_json).collect()),
                        );
                    }
                }
                Value::Object(clauses)
            }
        };
        single(self.name(), body)
    }
}

impl Serialize for Criteria {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn push_conjunct(must: &mut Vec<Criteria>, criterion: Criteria) {
    if let Criteria::Range {
        field,
        specifications,
    } = &criterion
    {
        for existing in must.iter_mut() {
            if let Criteria::Range {
                field: f,
                specifications: s,
            } = existing
            {
                if f != field {
                    continue;
                }
                if let Some(merged) = merge_bounds(s, specifications) {
                    *s = merged;
                    return;
                }
            }
        }
    }
    must.push(criterion);
}

/// Bounds of two ranges on one field as a single range.
///
/// A repeated comparison keeps the stricter bound. Returns `None` when a
/// repeated bound can't be ordered, so both ranges must stay separate.
fn merge_bounds(
    existing: &[RangeSpecification],
    incoming: &[RangeSpecification],
) -> Option<Vec<RangeSpecification>> {
    let mut merged = existing.to_vec();
    for spec in incoming {
        match merged.iter_mut().find(|m| m.comparison == spec.comparison) {
            None => merged.push(spec.clone()),
            Some(current) => {
                let (a, b) = (current.value.as_f64()?, spec.value.as_f64()?);
                let stricter = match spec.comparison {
                    RangeComparison::GreaterThan | RangeComparison::GreaterThanOrEqual => b > a,
                    RangeComparison::LessThan | RangeComparison::LessThanOrEqual => b < a,
                };
                if stricter {
                    current.value = spec.value.clone();
                }
            }
        }
    }
    Some(merged)
}

fn push_disjunct(should: &mut Vec<Criteria>, criterion: Criteria) {
    let incoming = match &criterion {
        Criteria::Term { field, value } => Some((field.clone(), vec![value.clone()])),
        Criteria::Terms { field, values } => Some((field.clone(), values.clone())),
        _ => None,
    };

    if let Some((field, values)) = incoming {
        for existing in should.iter_mut() {
            let merged = match existing {
                Criteria::Term { field: f, value } if *f == field => {
                    let mut all = vec![value.clone()];
                    all.extend(values.iter().cloned());
                    Some(all)
                }
                Criteria::Terms { field: f, values: v } if *f == field => {
                    let mut all = v.clone();
                    all.extend(values.iter().cloned());
                    Some(all)
                }
                _ => None,
            };
            if let Some(mut all) = merged {
                dedup_in_order(&mut all);
                *existing = Criteria::Terms { field, values: all };
                return;
            }
        }
    }
    should.push(criterion);
}

fn dedup_in_order(values: &mut Vec<Value>) {
    let mut seen: Vec<Value> = Vec::with_capacity(values.len());
    values.retain(|v| {
        if seen.contains(v) {
            false
        } else {
            seen.push(v.clone());
            true
        }
    });
}
