//! Translation of composed queries into search requests
//!
//! The translator walks the operation chain from the source outwards,
//! collecting filter and query criteria, sort keys and paging, and lowering
//! a grouped projection into facets. The result is a [`SearchRequest`] and
//! the [`Materializer`] able to decode the engine's response to it.
//!
//! Translation is a pure function of the query, the mapping and the field
//! prefix: it keeps no state between calls.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::aggregate::{GroupProjectionLowering, GroupedProjection};
use super::ast::{AggregateKind, Expr, QueryExpr, Terminal};
use super::predicate::PredicateTranslator;
use crate::error::{QueryError, Result};
use crate::mapping::Mapping;
use crate::request::{Criteria, Facet, SearchRequest, SortOption};
use crate::response::{
    ElementType, HitProjection, ListHitsMaterializer, Materializer, ScalarHitMaterializer,
    SearchResponse,
};

/// Search request plus the materializer for its response
#[derive(Clone, Debug, PartialEq)]
pub struct Translation {
    pub search_request: SearchRequest,
    pub materializer: Materializer,
}

impl Translation {
    /// Decode `response` into the query's result type
    pub fn materialize<T: DeserializeOwned>(&self, response: Option<&SearchResponse>) -> Result<T> {
        let value = self.materializer.materialize(response)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Decode `response` into an untyped JSON value
    pub fn materialize_value(&self, response: Option<&SearchResponse>) -> Result<Value> {
        self.materializer.materialize(response)
    }
}

/// Translate `query` with field names resolved through `mapping`
///
/// A non-empty `field_prefix` places every resolved field under that dotted
/// namespace, for queries over documents nested inside another document.
pub fn translate(mapping: &dyn Mapping, field_prefix: &str, query: &QueryExpr) -> Result<Translation> {
    QueryTranslator::new(mapping, field_prefix).translate(query)
}

/// Translator bound to one mapping and field prefix
#[derive(Clone, Copy, Debug)]
pub struct QueryTranslator<'a> {
    mapping: &'a dyn Mapping,
    predicates: PredicateTranslator<'a>,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(mapping: &'a dyn Mapping, field_prefix: &'a str) -> Self {
        Self {
            mapping,
            predicates: PredicateTranslator::new(mapping, field_prefix),
        }
    }

    pub fn translate(&self, query: &QueryExpr) -> Result<Translation> {
        validate(query)?;

        let mut state = TranslationState::default();
        for op in query.chain() {
            self.apply(&mut state, op)?;
        }
        let translation = state.finish()?;

        tracing::debug!(
            doc_type = %translation.search_request.doc_type,
            facets = translation.search_request.facets.len(),
            sort_fields = translation.search_request.sort_fields.len(),
            has_filter = translation.search_request.filter.is_some(),
            materializer = translation.materializer.kind(),
            "translated query"
        );
        Ok(translation)
    }

    fn apply(&self, state: &mut TranslationState, op: &QueryExpr) -> Result<()> {
        match op {
            QueryExpr::Source { doc_type } => {
                state.element_type = ElementType::Document(doc_type.clone());
                state.doc_type = self.mapping.get_type_name(doc_type);
            }
            QueryExpr::Where { predicate, .. } => {
                state.ensure_document_stage(op)?;
                state.filters.push(self.predicates.translate(required(predicate, "predicate")?)?);
            }
            QueryExpr::Query { predicate, .. } => {
                state.ensure_document_stage(op)?;
                state.queries.push(self.predicates.translate(required(predicate, "predicate")?)?);
            }
            QueryExpr::QueryString { text, .. } => {
                state.ensure_document_stage(op)?;
                state.queries.push(Criteria::query_string(required(text, "query")?.clone()));
            }
            QueryExpr::OrderBy {
                key,
                descending,
                then,
                ..
            } => {
                state.ensure_document_stage(op)?;
                let field = self.predicates.member_field(required(key, "keySelector")?, "OrderBy")?;
                state.order(SortOption::new(field, *descending), *then);
            }
            QueryExpr::OrderByScore {
                descending, then, ..
            } => {
                state.ensure_document_stage(op)?;
                state.order(SortOption::score(*descending), *then);
            }
            QueryExpr::Skip { count, .. } => {
                state.ensure_ungrouped(op)?;
                state.ensure_not_executed(op)?;
                state.from = Some(state.from.unwrap_or(0).saturating_add(*count));
                state.size = state.size.map(|size| size.saturating_sub(*count));
            }
            QueryExpr::Take { count, .. } => {
                state.ensure_not_executed(op)?;
                match &mut state.group {
                    GroupState::Ungrouped => state.size = Some(min_limit(state.size, *count)),
                    GroupState::Pending { .. } => {
                        return Err(QueryError::unsupported("Take between GroupBy and Select"))
                    }
                    GroupState::Projected { size, .. } => *size = Some(min_limit(*size, *count)),
                }
            }
            QueryExpr::GroupBy { key, .. } => {
                if !matches!(state.group, GroupState::Ungrouped) {
                    return Err(QueryError::unsupported("nested GroupBy"));
                }
                state.ensure_document_stage(op)?;
                if state.from.is_some() || state.size.is_some() {
                    return Err(QueryError::unsupported("GroupBy after Skip or Take"));
                }
                let key = match required(key, "keySelector")? {
                    Expr::Member(member) => Some(self.predicates.field_name(member)),
                    Expr::Constant { .. } => None,
                    other => {
                        return Err(QueryError::unsupported(format!(
                            "GroupBy key must be a member or a constant, found {}",
                            other.describe()
                        )))
                    }
                };
                state.group = GroupState::Pending { key };
            }
            QueryExpr::Select { projection, .. } => {
                let projection = required(projection, "selector")?;
                match std::mem::replace(&mut state.group, GroupState::Ungrouped) {
                    GroupState::Pending { key } => {
                        let lowered = GroupProjectionLowering::new(self.predicates, key).lower(projection)?;
                        state.group = GroupState::Projected {
                            projection: lowered,
                            size: None,
                        };
                    }
                    GroupState::Projected { .. } => {
                        return Err(QueryError::unsupported("Select after a grouped projection"))
                    }
                    GroupState::Ungrouped => {
                        state.ensure_document_stage(op)?;
                        self.project_fields(state, projection)?;
                    }
                }
            }
            QueryExpr::Execute {
                terminal,
                predicate,
                ..
            } => {
                state.ensure_ungrouped(op)?;
                state.ensure_not_executed(op)?;
                if let Some(predicate) = predicate {
                    if state.projection.is_some() {
                        return Err(QueryError::unsupported(format!(
                            "{} with a predicate after Select",
                            op.name()
                        )));
                    }
                    state.filters.push(self.predicates.translate(predicate)?);
                }
                state.terminal = Some(*terminal);
            }
        }
        Ok(())
    }

    /// `Select` over documents: return only the projected fields
    fn project_fields(&self, state: &mut TranslationState, projection: &Expr) -> Result<()> {
        match projection {
            Expr::Member(member) => {
                let field = self.predicates.field_name(member);
                state.fields.push(field.clone());
                state.projection = Some(HitProjection::Field(field));
                state.element_type = ElementType::Value;
            }
            Expr::Record { fields } => {
                let mut members = Vec::with_capacity(fields.len());
                for record_field in fields {
                    let field = self.predicates.member_field(&record_field.expr, "Select")?;
                    if !state.fields.contains(&field) {
                        state.fields.push(field.clone());
                    }
                    members.push((record_field.name.clone(), field));
                }
                state.element_type =
                    ElementType::Record(members.iter().map(|(name, _)| name.clone()).collect());
                state.projection = Some(HitProjection::Record(members));
            }
            other => {
                return Err(QueryError::unsupported(format!(
                    "{} in Select; only members and records of members can be projected",
                    other.describe()
                )))
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
enum GroupState {
    #[default]
    Ungrouped,
    /// `GroupBy` seen, waiting for its projection; `None` key groups everything
    Pending { key: Option<String> },
    Projected {
        projection: GroupedProjection,
        size: Option<usize>,
    },
}

#[derive(Debug, Default)]
struct TranslationState {
    doc_type: String,
    element_type: ElementType,
    filters: Vec<Criteria>,
    queries: Vec<Criteria>,
    sort_fields: Vec<SortOption>,
    fields: Vec<String>,
    from: Option<usize>,
    size: Option<usize>,
    group: GroupState,
    projection: Option<HitProjection>,
    terminal: Option<Terminal>,
}

impl TranslationState {
    fn ensure_ungrouped(&self, op: &QueryExpr) -> Result<()> {
        if matches!(self.group, GroupState::Ungrouped) {
            Ok(())
        } else {
            Err(QueryError::unsupported(format!("{} on a grouped query", op.name())))
        }
    }

    fn ensure_not_executed(&self, op: &QueryExpr) -> Result<()> {
        match self.terminal {
            None => Ok(()),
            Some(_) => Err(QueryError::unsupported(format!(
                "{} after a terminal operation",
                op.name()
            ))),
        }
    }

    /// Operations that act on documents before any projection
    fn ensure_document_stage(&self, op: &QueryExpr) -> Result<()> {
        self.ensure_ungrouped(op)?;
        self.ensure_not_executed(op)?;
        if self.projection.is_some() {
            return Err(QueryError::unsupported(format!(
                "{} after Select",
                op.name()
            )));
        }
        Ok(())
    }

    /// A primary ordering takes precedence over earlier ones
    fn order(&mut self, sort: SortOption, then: bool) {
        if then {
            self.sort_fields.push(sort);
        } else {
            self.sort_fields.insert(0, sort);
        }
    }

    fn finish(self) -> Result<Translation> {
        let mut request = SearchRequest {
            doc_type: self.doc_type,
            filter: conjunction(self.filters),
            query: conjunction(self.queries),
            sort_fields: self.sort_fields,
            fields: self.fields,
            from: self.from,
            size: self.size,
            facets: Vec::new(),
        };

        let materializer = match self.group {
            GroupState::Pending { .. } => {
                return Err(QueryError::unsupported(
                    "GroupBy must be followed by a Select of aggregates",
                ))
            }
            GroupState::Projected { projection, size } => {
                request.facets = match size {
                    Some(size) => projection.facets.into_iter().map(|f: Facet| f.with_size(size)).collect(),
                    None => projection.facets,
                };
                // Only facet results are read back
                request.size = Some(0);
                Materializer::Facets(projection.materializer)
            }
            GroupState::Ungrouped => {
                let projection = self.projection.unwrap_or(HitProjection::Source);
                let from = self.from.unwrap_or(0);
                match self.terminal {
                    None => Materializer::ListHits(ListHitsMaterializer::new(projection, self.element_type)),
                    Some(Terminal::First) => {
                        // `from` stays on the wire; an earlier Take(0) keeps the page empty
                        request.size = Some(min_limit(self.size, 1));
                        Materializer::ScalarHit(
                            ScalarHitMaterializer::first(projection, self.element_type)
                                .with_paging(from, self.size),
                        )
                    }
                    Some(terminal) => {
                        // Counted from hits.total, so the window is applied when materializing
                        request.from = None;
                        request.size = Some(0);
                        let materializer = match terminal {
                            Terminal::Any => ScalarHitMaterializer::any(),
                            _ => ScalarHitMaterializer::count(),
                        };
                        Materializer::ScalarHit(materializer.with_paging(from, self.size))
                    }
                }
            }
        };

        Ok(Translation {
            search_request: request,
            materializer,
        })
    }
}

fn conjunction(criteria: Vec<Criteria>) -> Option<Criteria> {
    if criteria.is_empty() {
        return None;
    }
    match Criteria::and(criteria) {
        Criteria::MatchAll => None,
        c => Some(c),
    }
}

fn min_limit(current: Option<usize>, count: usize) -> usize {
    current.map_or(count, |c| c.min(count))
}

fn required<'e, T>(argument: &'e Option<T>, name: &str) -> Result<&'e T> {
    argument.as_ref().ok_or_else(|| QueryError::missing_argument(name))
}

/// Reject a query with absent required arguments before translating any of it
fn validate(query: &QueryExpr) -> Result<()> {
    for op in query.chain() {
        match op {
            QueryExpr::Where { predicate, .. } | QueryExpr::Query { predicate, .. } => {
                validate_expr(required(predicate, "predicate")?)?;
            }
            QueryExpr::QueryString { text, .. } => {
                required(text, "query")?;
            }
            QueryExpr::OrderBy { key, .. } | QueryExpr::GroupBy { key, .. } => {
                validate_expr(required(key, "keySelector")?)?;
            }
            QueryExpr::Select { projection, .. } => {
                validate_expr(required(projection, "selector")?)?;
            }
            QueryExpr::Execute {
                predicate: Some(predicate),
                ..
            } => validate_expr(predicate)?,
            _ => {}
        }
    }
    Ok(())
}

fn validate_expr(expr: &Expr) -> Result<()> {
    match expr {
        Expr::Aggregate {
            aggregate,
            argument,
        } => match argument {
            Some(argument) => validate_expr(argument),
            None if *aggregate == AggregateKind::Count => Ok(()),
            None => Err(QueryError::missing_argument(aggregate.name())),
        },
        Expr::Compare { left, right, .. } | Expr::And { left, right } | Expr::Or { left, right } => {
            validate_expr(left)?;
            validate_expr(right)
        }
        Expr::Not { operand } => validate_expr(operand),
        Expr::Record { fields } => fields.iter().try_for_each(|f| validate_expr(&f.expr)),
        Expr::Member(_)
        | Expr::Constant { .. }
        | Expr::Prefix { .. }
        | Expr::Regexp { .. }
        | Expr::GroupKey => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::TrivialMapping;
    use crate::query::ast::field;
    use crate::query::builder::Query;
    use crate::request::RangeComparison;

    fn translate_query(query: Query) -> Result<Translation> {
        translate(&TrivialMapping::new(), "", query.expression())
    }

    #[test]
    fn test_plain_source_lists_hits() {
        let translation = translate_query(Query::source("Robot")).unwrap();

        assert_eq!(translation.search_request.doc_type, "robots");
        assert!(translation.search_request.filter.is_none());
        assert!(translation.search_request.size.is_none());
        assert_eq!(
            translation.materializer.element_type(),
            &ElementType::Document("Robot".to_string())
        );
        assert!(matches!(translation.materializer, Materializer::ListHits(_)));
    }

    #[test]
    fn test_successive_wheres_conjoin() {
        let translation = translate_query(
            Query::source("Robot")
                .filter(field("Zone").is_not_null())
                .filter(field("Cost").gt(5).and(field("Cost").lte(9))),
        )
        .unwrap();

        assert_eq!(
            translation.search_request.filter,
            Some(Criteria::and([
                Criteria::exists("zone"),
                Criteria::Range {
                    field: "cost".to_string(),
                    specifications: vec![
                        crate::request::RangeSpecification::new(RangeComparison::GreaterThan, 5),
                        crate::request::RangeSpecification::new(RangeComparison::LessThanOrEqual, 9),
                    ],
                },
            ]))
        );
    }

    #[test]
    fn test_ordering_and_paging() {
        let translation = translate_query(
            Query::source("Robot")
                .order_by(field("Name"))
                .then_by_score_descending()
                .order_by_descending(field("Cost"))
                .skip(10)
                .take(5),
        )
        .unwrap();

        let request = &translation.search_request;
        assert_eq!(
            request.sort_fields,
            vec![
                SortOption::new("cost", true),
                SortOption::new("name", false),
                SortOption::score(true),
            ]
        );
        assert_eq!(request.from, Some(10));
        assert_eq!(request.size, Some(5));
    }

    #[test]
    fn test_take_then_skip_shrinks_page() {
        let translation = translate_query(Query::source("Robot").take(10).skip(4).take(20)).unwrap();
        assert_eq!(translation.search_request.from, Some(4));
        assert_eq!(translation.search_request.size, Some(6));
    }

    #[test]
    fn test_query_string_and_query_predicate() {
        let translation = translate_query(
            Query::source("Robot")
                .query_string("arm*")
                .query(field("Zone").equals("north")),
        )
        .unwrap();

        assert_eq!(
            translation.search_request.query,
            Some(Criteria::and([
                Criteria::query_string("arm*"),
                Criteria::term("zone", "north"),
            ]))
        );
        assert!(translation.search_request.filter.is_none());
    }

    #[test]
    fn test_empty_query_string_accepted() {
        let translation = translate_query(Query::source("Robot").query_string("")).unwrap();
        assert_eq!(translation.search_request.query, Some(Criteria::query_string("")));
    }

    #[test]
    fn test_terminals() {
        let count = translate_query(Query::source("Robot").count_where(field("Cost").gt(1))).unwrap();
        assert_eq!(count.search_request.size, Some(0));
        assert_eq!(count.materializer.element_type(), &ElementType::Integer);
        assert!(count.search_request.filter.is_some());

        let any = translate_query(Query::source("Robot").any()).unwrap();
        assert_eq!(any.materializer.element_type(), &ElementType::Boolean);

        let first = translate_query(Query::source("Robot").skip(3).first()).unwrap();
        assert_eq!(first.search_request.size, Some(1));
        assert_eq!(first.search_request.from, Some(3));
    }

    #[test]
    fn test_terminals_keep_earlier_paging() {
        let response = SearchResponse::from_json(serde_json::json!({
            "hits": { "total": 42, "hits": [ { "_source": { "name": "R2" } } ] }
        }))
        .unwrap();

        let taken = translate_query(Query::source("Robot").take(5).count()).unwrap();
        assert_eq!(taken.search_request.size, Some(0));
        assert_eq!(taken.materialize::<u64>(Some(&response)).unwrap(), 5);

        let skipped = translate_query(Query::source("Robot").skip(40).count()).unwrap();
        assert!(skipped.search_request.from.is_none());
        assert_eq!(skipped.materialize::<u64>(Some(&response)).unwrap(), 2);

        let beyond = translate_query(Query::source("Robot").skip(42).any()).unwrap();
        assert!(!beyond.materialize::<bool>(Some(&response)).unwrap());

        let empty = translate_query(Query::source("Robot").take(0).first()).unwrap();
        assert_eq!(empty.search_request.size, Some(0));
        assert_eq!(empty.materialize_value(Some(&response)).unwrap(), Value::Null);
    }

    #[test]
    fn test_skip_saturates() {
        let translation = translate_query(Query::source("Robot").skip(usize::MAX).skip(10)).unwrap();
        assert_eq!(translation.search_request.from, Some(usize::MAX));
    }

    #[test]
    fn test_field_projection() {
        let translation = translate_query(
            Query::source("Robot").select(Expr::record([("Name", field("Name")), ("Zone", field("Zone"))])),
        )
        .unwrap();

        assert_eq!(translation.search_request.fields, vec!["name", "zone"]);
        assert_eq!(
            translation.materializer.element_type(),
            &ElementType::Record(vec!["Name".to_string(), "Zone".to_string()])
        );
    }

    #[test]
    fn test_unsupported_shapes() {
        let cases = vec![
            Query::source("Robot")
                .group_by(field("Zone"))
                .group_by(field("Cost")),
            Query::source("Robot").group_by(field("Zone")),
            Query::source("Robot")
                .group_by(field("Zone"))
                .select(Expr::count())
                .filter(field("Cost").gt(1)),
            Query::source("Robot").select(field("Name")).filter(field("Cost").gt(1)),
            Query::source("Robot").count().take(1),
            Query::source("Robot").order_by(Expr::count()),
            Query::source("Robot")
                .take(3)
                .group_by(field("Zone"))
                .select(Expr::count()),
            Query::source("Robot")
                .skip(10)
                .group_by(field("Zone"))
                .select(Expr::count()),
        ];

        for query in cases {
            let err = translate_query(query).unwrap_err();
            assert!(
                matches!(err, QueryError::UnsupportedExpression(_)),
                "unexpected error {:?}",
                err
            );
        }
    }

    #[test]
    fn test_missing_aggregate_argument_rejected_before_translation() {
        let query = Query::source("Robot").group_by(field("Zone")).select(Expr::Aggregate {
            aggregate: crate::query::ast::AggregateKind::Sum,
            argument: None,
        });
        let err = translate_query(query).unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }
}
