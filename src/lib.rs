pub mod config;
pub mod context;
pub mod error;
pub mod mapping;
pub mod query;
pub mod request;
pub mod response;

pub use config::{MappingSettings, QuerySettings};
pub use context::SearchContext;
pub use error::{QueryError, Result};
pub use mapping::{Mapping, TrivialMapping};
pub use query::{field, translate, value, Document, Expr, Member, Query, QueryExpr, Translation};
pub use request::{Criteria, Facet, SearchRequest, SortOption};
pub use response::{Materializer, SearchResponse};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
