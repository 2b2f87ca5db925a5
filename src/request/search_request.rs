use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::criteria::Criteria;
use super::facets::Facet;

/// Sort key meaning "rank by relevance"
pub const SCORE_FIELD: &str = "_score";

/// One sort key of a search request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortOption {
    pub field: String,
    pub descending: bool,
}

impl SortOption {
    pub fn new(field: impl Into<String>, descending: bool) -> Self {
        Self {
            field: field.into(),
            descending,
        }
    }

    /// Relevance sort
    pub fn score(descending: bool) -> Self {
        Self::new(SCORE_FIELD, descending)
    }

    pub fn is_score(&self) -> bool {
        self.field == SCORE_FIELD
    }

    fn to_json(&self) -> Value {
        let order = if self.descending { "desc" } else { "asc" };
        let mut map = Map::new();
        map.insert(self.field.clone(), json!(order));
        Value::Object(map)
    }
}

/// Search request produced by translating a query
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchRequest {
    /// Collection name resolved from the document type
    pub doc_type: String,
    pub filter: Option<Criteria>,
    pub query: Option<Criteria>,
    pub facets: Vec<Facet>,
    pub sort_fields: Vec<SortOption>,
    /// Stored fields to return instead of the full source
    pub fields: Vec<String>,
    pub from: Option<usize>,
    pub size: Option<usize>,
}

impl SearchRequest {
    /// Search request over one collection
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            ..Default::default()
        }
    }

    /// Look up a facet by its result name
    pub fn facet(&self, name: &str) -> Option<&Facet> {
        self.facets.iter().find(|f| f.name() == name)
    }

    /// Encode the request body. Absent optional parts are omitted.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();

        if let Some(from) = self.from {
            body.insert("from".to_string(), json!(from));
        }
        if let Some(size) = self.size {
            body.insert("size".to_string(), json!(size));
        }
        if !self.sort_fields.is_empty() {
            body.insert(
                "sort".to_string(),
                Value::Array(self.sort_fields.iter().map(SortOption::to_json).collect()),
            );
        }
        if !self.fields.is_empty() {
            body.insert("fields".to_string(), json!(self.fields));
        }
        match (&self.query, &self.filter) {
            // A top-level filter does not narrow facets; fold it into the query instead
            (query, Some(filter)) if !self.facets.is_empty() => {
                let query = query.as_ref().map_or_else(|| Criteria::MatchAll.to_json(), Criteria::to_json);
                body.insert(
                    "query".to_string(),
                    json!({ "filtered": { "query": query, "filter": filter.to_json() } }),
                );
            }
            (query, filter) => {
                if let Some(query) = query {
                    body.insert("query".to_string(), query.to_json());
                }
                if let Some(filter) = filter {
                    body.insert("filter".to_string(), filter.to_json());
                }
            }
        }
        if !self.facets.is_empty() {
            let mut facets = Map::new();
            for facet in &self.facets {
                facets.insert(facet.name().to_string(), facet.to_json());
            }
            body.insert("facets".to_string(), Value::Object(facets));
        }

        Value::Object(body)
    }

    /// Path of the search endpoint for this request, relative to the index
    pub fn search_path(&self, index: Option<&str>) -> String {
        match index {
            Some(index) if !index.is_empty() => format!("/{}/{}/_search", index, self.doc_type),
            _ => format!("/{}/_search", self.doc_type),
        }
    }
}

impl Serialize for SearchRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
