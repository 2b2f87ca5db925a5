//! Facet (aggregation) descriptors attached to a search request

use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::criteria::Criteria;

/// Bucket counts per distinct value of the given fields
#[derive(Clone, Debug, PartialEq)]
pub struct TermsFacet {
    pub name: String,
    pub fields: Vec<String>,
    pub filter: Option<Criteria>,
    pub size: Option<usize>,
}

/// Numeric statistics of `value` per distinct value of `key`
#[derive(Clone, Debug, PartialEq)]
pub struct TermsStatsFacet {
    pub name: String,
    pub key: String,
    pub value: String,
    pub filter: Option<Criteria>,
    pub size: Option<usize>,
}

/// Numeric statistics over the whole (filtered) collection
#[derive(Clone, Debug, PartialEq)]
pub struct StatisticalFacet {
    pub name: String,
    pub fields: Vec<String>,
    pub filter: Option<Criteria>,
}

/// Count of the documents matching a filter
#[derive(Clone, Debug, PartialEq)]
pub struct FilterFacet {
    pub name: String,
    pub filter: Criteria,
}

/// An aggregation request
#[derive(Clone, Debug, PartialEq)]
pub enum Facet {
    Terms(TermsFacet),
    TermsStats(TermsStatsFacet),
    Statistical(StatisticalFacet),
    Filter(FilterFacet),
}

impl Facet {
    /// Name the facet result is keyed by in the response
    pub fn name(&self) -> &str {
        match self {
            Facet::Terms(f) => &f.name,
            Facet::TermsStats(f) => &f.name,
            Facet::Statistical(f) => &f.name,
            Facet::Filter(f) => &f.name,
        }
    }

    /// Wire type of the facet
    pub fn facet_type(&self) -> &'static str {
        match self {
            Facet::Terms(_) => "terms",
            Facet::TermsStats(_) => "terms_stats",
            Facet::Statistical(_) => "statistical",
            Facet::Filter(_) => "filter",
        }
    }

    /// Filter restricting which documents feed the facet
    pub fn filter(&self) -> Option<&Criteria> {
        match self {
            Facet::Terms(f) => f.filter.as_ref(),
            Facet::TermsStats(f) => f.filter.as_ref(),
            Facet::Statistical(f) => f.filter.as_ref(),
            Facet::Filter(f) => Some(&f.filter),
        }
    }

    /// Maximum number of buckets, for bucketed facets
    pub fn size(&self) -> Option<usize> {
        match self {
            Facet::Terms(f) => f.size,
            Facet::TermsStats(f) => f.size,
            Facet::Statistical(_) | Facet::Filter(_) => None,
        }
    }

    /// Whether results are split into buckets keyed by term
    pub fn is_bucketed(&self) -> bool {
        matches!(self, Facet::Terms(_) | Facet::TermsStats(_))
    }

    /// Whether `other` requests the same aggregation and can share one result.
    ///
    /// Facets merge when they have the same kind, key field(s), value field
    /// and filter; names and sizes are not compared. The statistic picked
    /// from a merged result is decided when materializing.
    pub fn merges_with(&self, other: &Facet) -> bool {
        match (self, other) {
            (Facet::Terms(a), Facet::Terms(b)) => a.fields == b.fields && a.filter == b.filter,
            (Facet::TermsStats(a), Facet::TermsStats(b)) => {
                a.key == b.key && a.value == b.value && a.filter == b.filter
            }
            (Facet::Statistical(a), Facet::Statistical(b)) => {
                a.fields == b.fields && a.filter == b.filter
            }
            (Facet::Filter(a), Facet::Filter(b)) => a.filter == b.filter,
            _ => false,
        }
    }

    /// Copy of the facet under another result name
    pub fn with_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        match self {
            Facet::Terms(f) => Facet::Terms(TermsFacet { name, ..f }),
            Facet::TermsStats(f) => Facet::TermsStats(TermsStatsFacet { name, ..f }),
            Facet::Statistical(f) => Facet::Statistical(StatisticalFacet { name, ..f }),
            Facet::Filter(f) => Facet::Filter(FilterFacet { name, ..f }),
        }
    }

    /// Copy of the facet limited to `size` buckets; unbucketed facets are unchanged
    pub fn with_size(self, size: usize) -> Self {
        match self {
            Facet::Terms(f) => Facet::Terms(TermsFacet {
                size: Some(size),
                ..f
            }),
            Facet::TermsStats(f) => Facet::TermsStats(TermsStatsFacet {
                size: Some(size),
                ..f
            }),
            other => other,
        }
    }

    /// Encode the facet body (without its name)
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        match self {
            Facet::Terms(f) => {
                let mut inner = Map::new();
                inner.insert("fields".to_string(), json!(f.fields));
                if let Some(size) = f.size {
                    inner.insert("size".to_string(), json!(size));
                }
                body.insert("terms".to_string(), Value::Object(inner));
            }
            Facet::TermsStats(f) => {
                let mut inner = Map::new();
                inner.insert("key_field".to_string(), json!(f.key));
                inner.insert("value_field".to_string(), json!(f.value));
                if let Some(size) = f.size {
                    inner.insert("size".to_string(), json!(size));
                }
                body.insert("terms_stats".to_string(), Value::Object(inner));
            }
            Facet::Statistical(f) => {
                body.insert("statistical".to_string(), json!({ "fields": f.fields }));
            }
            Facet::Filter(f) => {
                body.insert("filter".to_string(), f.filter.to_json());
            }
        }

        if !matches!(self, Facet::Filter(_)) {
            if let Some(filter) = self.filter() {
                body.insert("facet_filter".to_string(), filter.to_json());
            }
        }
        Value::Object(body)
    }
}

impl Serialize for Facet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::criteria::RangeComparison;

    fn terms_stats() -> Facet {
        Facet::TermsStats(TermsStatsFacet {
            name: "energyUse".to_string(),
            key: "zone".to_string(),
            value: "energyUse".to_string(),
            filter: None,
            size: None,
        })
    }

    #[test]
    fn test_with_size_applies_to_bucketed_only() {
        assert_eq!(terms_stats().with_size(5).size(), Some(5));

        let filter = Facet::Filter(FilterFacet {
            name: "count".to_string(),
            filter: Criteria::MatchAll,
        });
        assert_eq!(filter.clone().with_size(5), filter);
        assert!(!filter.is_bucketed());
    }

    #[test]
    fn test_merge_ignores_name_and_size() {
        let renamed = terms_stats().with_name("other").with_size(3);
        assert!(terms_stats().merges_with(&renamed));
        assert_eq!(renamed.name(), "other");
    }

    #[test]
    fn test_merge_distinguishes_filter_and_value() {
        let filtered = Facet::TermsStats(TermsStatsFacet {
            name: "energyUse".to_string(),
            key: "zone".to_string(),
            value: "energyUse".to_string(),
            filter: Some(Criteria::exists("cost")),
            size: None,
        });
        assert!(!terms_stats().merges_with(&filtered));

        let other_value = Facet::TermsStats(TermsStatsFacet {
            name: "cost".to_string(),
            key: "zone".to_string(),
            value: "cost".to_string(),
            filter: None,
            size: None,
        });
        assert!(!terms_stats().merges_with(&other_value));
    }

    #[test]
    fn test_terms_stats_json() {
        assert_eq!(
            terms_stats().with_size(5).to_json(),
            json!({
                "terms_stats": { "key_field": "zone", "value_field": "energyUse", "size": 5 }
            })
        );
    }

    #[test]
    fn test_terms_json_with_filter() {
        let facet = Facet::Terms(TermsFacet {
            name: "count".to_string(),
            fields: vec!["zone".to_string()],
            filter: Some(Criteria::range("cost", RangeComparison::GreaterThan, 5.0)),
            size: None,
        });

        assert_eq!(facet.facet_type(), "terms");
        assert_eq!(
            facet.to_json(),
            json!({
                "terms": { "fields": ["zone"] },
                "facet_filter": { "range": { "cost": { "gt": 5.0 } } }
            })
        );
    }
}
