//! Wire-level request model
//!
//! This module defines what a translated query turns into:
//! - Criteria (filter tree: term, terms, range, exists, missing, prefix, regexp, bool)
//! - Facets (terms, terms_stats, statistical, filter)
//! - The search request carrying filter, query, facets, sort and paging
//!
//! # Example
//!
//! ```json
//! {
//!   "size": 5,
//!   "filter": { "exists": { "field": "zone" } },
//!   "facets": {
//!     "energyUse": {
//!       "terms_stats": { "key_field": "zone", "value_field": "energyUse", "size": 5 }
//!     }
//!   }
//! }
//! ```

pub mod criteria;
pub mod facets;
pub mod search_request;

pub use criteria::{BoolCriteria, Criteria, RangeComparison, RangeSpecification};
pub use facets::{Facet, FilterFacet, StatisticalFacet, TermsFacet, TermsStatsFacet};
pub use search_request::{SearchRequest, SortOption, SCORE_FIELD};
