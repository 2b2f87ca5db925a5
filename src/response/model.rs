//! Decoded search engine response

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Top-level response of a search call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: Option<Hits>,
    #[serde(default)]
    pub facets: Option<Map<String, Value>>,
}

/// Hit section of a response
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Option<Vec<Hit>>,
}

/// One matching document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(rename = "_type", default)]
    pub doc_type: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
    #[serde(default)]
    pub fields: Option<Map<String, Value>>,
}

impl Hit {
    /// Value of a returned field, `Null` when absent
    pub fn field(&self, name: &str) -> Value {
        self.fields
            .as_ref()
            .and_then(|fields| fields.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Statistic carried by a facet result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Count,
    Total,
    Mean,
    Min,
    Max,
}

impl Statistic {
    /// Key of the statistic in a facet result
    pub fn key(&self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Total => "total",
            Statistic::Mean => "mean",
            Statistic::Min => "min",
            Statistic::Max => "max",
        }
    }

    /// Value reported for a group that has no result for this statistic
    pub fn absent_value(&self) -> Value {
        match self {
            Statistic::Count => json!(0),
            _ => Value::Null,
        }
    }
}

/// Bucket of a `terms` or `terms_stats` facet result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub term: Value,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

/// Result of one facet, keyed in the response by the facet name
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum FacetResult {
    #[serde(rename = "terms")]
    Terms {
        #[serde(default)]
        terms: Vec<FacetBucket>,
    },
    #[serde(rename = "terms_stats")]
    TermsStats {
        #[serde(default)]
        terms: Vec<FacetBucket>,
    },
    #[serde(rename = "statistical")]
    Statistical {
        #[serde(flatten)]
        values: Map<String, Value>,
    },
    #[serde(rename = "filter")]
    Filter {
        #[serde(default)]
        count: u64,
    },
}

impl FacetResult {
    /// Buckets of a bucketed result, empty otherwise
    pub fn buckets(&self) -> &[FacetBucket] {
        match self {
            FacetResult::Terms { terms } | FacetResult::TermsStats { terms } => terms,
            FacetResult::Statistical { .. } | FacetResult::Filter { .. } => &[],
        }
    }

    /// Statistic of the bucket with `term`, or of the whole result when `term` is `None`
    pub fn statistic(&self, term: Option<&Value>, statistic: Statistic) -> Option<Value> {
        match (self, term) {
            (FacetResult::Terms { .. } | FacetResult::TermsStats { .. }, Some(term)) => self
                .buckets()
                .iter()
                .find(|bucket| &bucket.term == term)
                .and_then(|bucket| bucket.values.get(statistic.key()).cloned()),
            (FacetResult::Statistical { values }, None) => values.get(statistic.key()).cloned(),
            (FacetResult::Filter { count }, None) if statistic == Statistic::Count => {
                Some(json!(count))
            }
            _ => None,
        }
    }
}

impl SearchResponse {
    /// Decode a raw response body
    pub fn from_json(value: Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Hits of the response; absent sections read as no hits
    pub fn hit_list(&self) -> &[Hit] {
        self.hits
            .as_ref()
            .and_then(|hits| hits.hits.as_deref())
            .unwrap_or(&[])
    }

    /// Total number of matching documents
    pub fn total(&self) -> u64 {
        self.hits.as_ref().map(|hits| hits.total).unwrap_or(0)
    }

    /// Decoded facet result by name; results of unknown type are skipped
    pub fn facet(&self, name: &str) -> Option<FacetResult> {
        let raw = self.facets.as_ref()?.get(name)?;
        match serde_json::from_value(raw.clone()) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::debug!(facet = name, error = %e, "skipping undecodable facet result");
                None
            }
        }
    }
}
