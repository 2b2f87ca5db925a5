//! Lowering of grouped aggregate projections into facets
//!
//! Each aggregate call in a projection becomes a facet plus a column that
//! tells the materializer which statistic of which facet result to read.
//! Aggregates that request the same facet share it; only the statistic
//! read from the shared result differs.

use super::ast::{AggregateKind, Expr, RecordField};
use super::predicate::PredicateTranslator;
use crate::error::{QueryError, Result};
use crate::request::{Criteria, Facet, FilterFacet, StatisticalFacet, TermsFacet, TermsStatsFacet};
use crate::response::{ColumnSource, ElementType, FacetColumn, FacetsMaterializer, Statistic};

const COUNT_FACET: &str = "count";

/// Ordered set of facets built during one translation
#[derive(Debug, Default)]
pub(crate) struct FacetAccumulator {
    facets: Vec<Facet>,
}

impl FacetAccumulator {
    /// Add `facet`, or reuse an equivalent one already present.
    /// Returns the result name the facet is known by.
    pub fn add(&mut self, facet: Facet) -> String {
        if let Some(existing) = self.facets.iter().find(|f| f.merges_with(&facet)) {
            tracing::trace!(facet = existing.name(), "merged aggregate into existing facet");
            return existing.name().to_string();
        }

        let name = self.unique_name(facet.name());
        self.facets.push(facet.with_name(name.clone()));
        name
    }

    fn unique_name(&self, base: &str) -> String {
        let taken = |name: &str| self.facets.iter().any(|f| f.name() == name);
        if !taken(base) {
            return base.to_string();
        }
        let mut n = self.facets.len();
        loop {
            let candidate = format!("{}_{}", base, n);
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn into_facets(self) -> Vec<Facet> {
        self.facets
    }
}

/// Facets and materializer produced by a grouped projection
#[derive(Debug)]
pub(crate) struct GroupedProjection {
    pub facets: Vec<Facet>,
    pub materializer: FacetsMaterializer,
}

/// Lowers the projection of `GroupBy(key).Select(projection)`
///
/// `key` is the resolved bucket field, or `None` when the whole collection
/// forms a single group.
pub(crate) struct GroupProjectionLowering<'a> {
    predicates: PredicateTranslator<'a>,
    key: Option<String>,
    facets: FacetAccumulator,
}

impl<'a> GroupProjectionLowering<'a> {
    pub fn new(predicates: PredicateTranslator<'a>, key: Option<String>) -> Self {
        Self {
            predicates,
            key,
            facets: FacetAccumulator::default(),
        }
    }

    pub fn lower(mut self, projection: &Expr) -> Result<GroupedProjection> {
        let (columns, element_type) = match projection {
            Expr::Record { fields } => self.record(fields)?,
            single => {
                let element_type = scalar_type(single);
                (vec![self.column(None, single)?], element_type)
            }
        };

        // Key-only projections still need buckets to enumerate the groups
        if let Some(key) = &self.key {
            if self.facets.is_empty() {
                self.facets.add(count_facet(key.clone(), None));
            }
        }

        let facets = self.facets.into_facets();
        let bucket_facets = facets
            .iter()
            .filter(|f| f.is_bucketed())
            .map(|f| f.name().to_string())
            .collect();

        Ok(GroupedProjection {
            facets,
            materializer: FacetsMaterializer {
                columns,
                element_type,
                grouped: self.key.is_some(),
                bucket_facets,
            },
        })
    }

    fn record(&mut self, fields: &[RecordField]) -> Result<(Vec<FacetColumn>, ElementType)> {
        let mut names: Vec<String> = Vec::with_capacity(fields.len());
        let mut columns = Vec::with_capacity(fields.len());
        for field in fields {
            if names.contains(&field.name) {
                return Err(QueryError::InvalidArgument(format!(
                    "duplicate member {} in projection",
                    field.name
                )));
            }
            columns.push(self.column(Some(field.name.clone()), &field.expr)?);
            names.push(field.name.clone());
        }
        Ok((columns, ElementType::Record(names)))
    }

    fn column(&mut self, name: Option<String>, expr: &Expr) -> Result<FacetColumn> {
        let source = match expr {
            Expr::GroupKey => ColumnSource::Key,
            Expr::Aggregate {
                aggregate,
                argument,
            } => self.aggregate(*aggregate, argument.as_deref())?,
            other => {
                return Err(QueryError::unsupported(format!(
                    "{} in a grouped projection; only aggregates and the group key are allowed",
                    other.describe()
                )))
            }
        };
        Ok(FacetColumn { name, source })
    }

    fn aggregate(&mut self, kind: AggregateKind, argument: Option<&Expr>) -> Result<ColumnSource> {
        let (facet, statistic) = match kind {
            AggregateKind::Count => {
                let filter = argument.map(|p| self.predicates.translate(p)).transpose()?;
                let facet = match &self.key {
                    Some(key) => count_facet(key.clone(), filter),
                    None => Facet::Filter(FilterFacet {
                        name: COUNT_FACET.to_string(),
                        filter: filter.unwrap_or(Criteria::MatchAll),
                    }),
                };
                (facet, Statistic::Count)
            }
            numeric => {
                let selector = argument.ok_or_else(|| QueryError::missing_argument(numeric.name()))?;
                let value = self.predicates.member_field(selector, numeric.name())?;
                let facet = match &self.key {
                    Some(key) => Facet::TermsStats(TermsStatsFacet {
                        name: value.clone(),
                        key: key.clone(),
                        value,
                        filter: None,
                        size: None,
                    }),
                    None => Facet::Statistical(StatisticalFacet {
                        name: value.clone(),
                        fields: vec![value],
                        filter: None,
                    }),
                };
                (facet, statistic_of(numeric))
            }
        };

        let facet = self.facets.add(facet);
        Ok(ColumnSource::Statistic { facet, statistic })
    }
}

fn count_facet(key: String, filter: Option<Criteria>) -> Facet {
    Facet::Terms(TermsFacet {
        name: COUNT_FACET.to_string(),
        fields: vec![key],
        filter,
        size: None,
    })
}

fn statistic_of(kind: AggregateKind) -> Statistic {
    match kind {
        AggregateKind::Count => Statistic::Count,
        AggregateKind::Sum => Statistic::Total,
        AggregateKind::Average => Statistic::Mean,
        AggregateKind::Min => Statistic::Min,
        AggregateKind::Max => Statistic::Max,
    }
}

/// Element type of a single-valued grouped projection
fn scalar_type(expr: &Expr) -> ElementType {
    match expr {
        Expr::Aggregate {
            aggregate: AggregateKind::Count,
            ..
        } => ElementType::Integer,
        Expr::Aggregate {
            aggregate: AggregateKind::Average,
            ..
        } => ElementType::Double,
        Expr::Aggregate { .. } => ElementType::Number,
        _ => ElementType::Value,
    }
}
