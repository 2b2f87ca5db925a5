//! Response decoding and materialization

pub mod materializer;
pub mod model;

pub use materializer::{
    ColumnSource, ElementType, FacetColumn, FacetsMaterializer, HitProjection, ListHitsMaterializer,
    Materializer, ScalarHitMaterializer, ScalarKind,
};
pub use model::{FacetBucket, FacetResult, Hit, Hits, SearchResponse, Statistic};
