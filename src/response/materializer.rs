//! Materializers turn a search response into the shape the query asked for
//!
//! - `ListHits`: one item per hit, in hit order
//! - `ScalarHit`: a single value (`Count`, `Any`, `First`)
//! - `Facets`: one row per facet bucket, projected from facet statistics
//!
//! A missing response is an error; a response without hits or facets is
//! simply an empty result.

use serde_json::{json, Map, Value};

use super::model::{Hit, SearchResponse, Statistic};
use crate::error::{QueryError, Result};

/// Shape of the values a materializer produces
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ElementType {
    /// Source documents of the named type
    Document(String),
    /// A single projected field value
    #[default]
    Value,
    Integer,
    Double,
    /// Numeric value typed like the aggregated member
    Number,
    Boolean,
    /// Compound value with the listed members
    Record(Vec<String>),
}

/// How a hit becomes an item
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HitProjection {
    /// The stored `_source` document
    Source,
    /// One returned field
    Field(String),
    /// Returned fields renamed to record members, as `(member, field)` pairs
    Record(Vec<(String, String)>),
}

impl HitProjection {
    /// Default per-hit constructor
    pub fn project(&self, hit: &Hit) -> Value {
        match self {
            HitProjection::Source => hit.source.clone().unwrap_or(Value::Null),
            HitProjection::Field(field) => hit.field(field),
            HitProjection::Record(members) => {
                let mut record = Map::new();
                for (member, field) in members {
                    record.insert(member.clone(), hit.field(field));
                }
                Value::Object(record)
            }
        }
    }
}

fn require(response: Option<&SearchResponse>) -> Result<&SearchResponse> {
    response.ok_or_else(|| QueryError::missing_argument("response"))
}

/// Materializes every hit
#[derive(Clone, Debug, PartialEq)]
pub struct ListHitsMaterializer {
    pub projection: HitProjection,
    pub element_type: ElementType,
}

impl ListHitsMaterializer {
    pub fn new(projection: HitProjection, element_type: ElementType) -> Self {
        Self {
            projection,
            element_type,
        }
    }

    /// Build one item per hit with `item_creator`, preserving order
    pub fn many<T, F>(hits: &[Hit], item_creator: F) -> Vec<T>
    where
        F: Fn(&Hit) -> T,
    {
        hits.iter().map(item_creator).collect()
    }

    /// Materialize with a caller-supplied per-hit constructor
    pub fn materialize_with<T, F>(&self, response: Option<&SearchResponse>, item_creator: F) -> Result<Vec<T>>
    where
        F: Fn(&Hit) -> T,
    {
        let response = require(response)?;
        Ok(Self::many(response.hit_list(), item_creator))
    }

    pub fn materialize(&self, response: Option<&SearchResponse>) -> Result<Value> {
        let items = self.materialize_with(response, |hit| self.projection.project(hit))?;
        Ok(Value::Array(items))
    }
}

/// Scalar result computed from the hit section
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    /// Total number of matching documents
    Count,
    /// Whether any document matched
    Any,
    /// First hit, or null when there is none
    First,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScalarHitMaterializer {
    pub kind: ScalarKind,
    pub projection: HitProjection,
    pub element_type: ElementType,
    /// Documents skipped before the terminal
    pub from: usize,
    /// Page limit applied before the terminal
    pub size: Option<usize>,
}

impl ScalarHitMaterializer {
    fn new(kind: ScalarKind, projection: HitProjection, element_type: ElementType) -> Self {
        Self {
            kind,
            projection,
            element_type,
            from: 0,
            size: None,
        }
    }

    pub fn count() -> Self {
        Self::new(ScalarKind::Count, HitProjection::Source, ElementType::Integer)
    }

    pub fn any() -> Self {
        Self::new(ScalarKind::Any, HitProjection::Source, ElementType::Boolean)
    }

    pub fn first(projection: HitProjection, element_type: ElementType) -> Self {
        Self::new(ScalarKind::First, projection, element_type)
    }

    /// Apply the `Skip`/`Take` window that preceded the terminal
    pub fn with_paging(mut self, from: usize, size: Option<usize>) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    /// Matching documents inside the paging window
    fn windowed_total(&self, response: &SearchResponse) -> u64 {
        let remaining = response.total().saturating_sub(self.from as u64);
        match self.size {
            Some(size) => remaining.min(size as u64),
            None => remaining,
        }
    }

    pub fn materialize(&self, response: Option<&SearchResponse>) -> Result<Value> {
        let response = require(response)?;
        Ok(match self.kind {
            ScalarKind::Count => json!(self.windowed_total(response)),
            ScalarKind::Any => json!(self.windowed_total(response) > 0),
            ScalarKind::First if self.size == Some(0) => Value::Null,
            ScalarKind::First => response
                .hit_list()
                .first()
                .map(|hit| self.projection.project(hit))
                .unwrap_or(Value::Null),
        })
    }
}

/// Where one projected value of a facet row comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnSource {
    /// The bucket term, i.e. the group key
    Key,
    /// A statistic of the named facet
    Statistic { facet: String, statistic: Statistic },
}

/// One member of a facet row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FacetColumn {
    /// Record member name, `None` for scalar projections
    pub name: Option<String>,
    pub source: ColumnSource,
}

/// Projects facet results into rows
#[derive(Clone, Debug, PartialEq)]
pub struct FacetsMaterializer {
    pub columns: Vec<FacetColumn>,
    pub element_type: ElementType,
    /// Rows are keyed by bucket term rather than a single summary row
    pub grouped: bool,
    /// Bucketed facets whose terms make up the rows of a grouped result
    pub bucket_facets: Vec<String>,
}

impl FacetsMaterializer {
    pub fn materialize(&self, response: Option<&SearchResponse>) -> Result<Value> {
        let response = require(response)?;
        let has_facets = response.facets.as_ref().is_some_and(|f| !f.is_empty());
        if !has_facets {
            return Ok(Value::Array(Vec::new()));
        }

        let rows = if self.grouped {
            self.terms(response)
                .iter()
                .map(|term| self.row(response, Some(term)))
                .collect()
        } else {
            vec![self.row(response, None)]
        };
        Ok(Value::Array(rows))
    }

    /// Distinct bucket terms across the facets, in first-seen order
    fn terms(&self, response: &SearchResponse) -> Vec<Value> {
        let mut terms: Vec<Value> = Vec::new();
        for result in self.bucket_facets.iter().filter_map(|name| response.facet(name)) {
            for bucket in result.buckets() {
                if !terms.contains(&bucket.term) {
                    terms.push(bucket.term.clone());
                }
            }
        }
        terms
    }

    fn row(&self, response: &SearchResponse, term: Option<&Value>) -> Value {
        let values = self.columns.iter().map(|column| match &column.source {
            ColumnSource::Key => term.cloned().unwrap_or(Value::Null),
            ColumnSource::Statistic { facet, statistic } => response
                .facet(facet)
                .and_then(|result| result.statistic(term, *statistic))
                .unwrap_or_else(|| statistic.absent_value()),
        });

        match &self.element_type {
            ElementType::Record(_) => {
                let mut record = Map::new();
                for (column, value) in self.columns.iter().zip(values) {
                    record.insert(column.name.clone().unwrap_or_default(), value);
                }
                Value::Object(record)
            }
            _ => values.into_iter().next().unwrap_or(Value::Null),
        }
    }
}

/// Result decoder chosen by the translator
#[derive(Clone, Debug, PartialEq)]
pub enum Materializer {
    ListHits(ListHitsMaterializer),
    ScalarHit(ScalarHitMaterializer),
    Facets(FacetsMaterializer),
}

impl Materializer {
    pub fn element_type(&self) -> &ElementType {
        match self {
            Materializer::ListHits(m) => &m.element_type,
            Materializer::ScalarHit(m) => &m.element_type,
            Materializer::Facets(m) => &m.element_type,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Materializer::ListHits(_) => "list_hits",
            Materializer::ScalarHit(_) => "scalar_hit",
            Materializer::Facets(_) => "facets",
        }
    }

    /// Decode `response` into a JSON value of the element shape
    pub fn materialize(&self, response: Option<&SearchResponse>) -> Result<Value> {
        match self {
            Materializer::ListHits(m) => m.materialize(response),
            Materializer::ScalarHit(m) => m.materialize(response),
            Materializer::Facets(m) => m.materialize(response),
        }
    }
}
