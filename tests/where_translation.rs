//! Integration tests for filtering, ordering, paging and terminal operations

use serde_json::json;

use elastiq::query::{field, Expr, Member, Query, QueryExpr};
use elastiq::request::{Criteria, SortOption};
use elastiq::response::{ElementType, Materializer};
use elastiq::{translate, QueryError, QuerySettings, SearchContext, Translation, TrivialMapping};

fn robots() -> Query {
    Query::source("Robot")
}

fn translate_query(query: &Query) -> elastiq::Result<Translation> {
    translate(&TrivialMapping::new(), "", query.expression())
}

#[test]
fn test_where_chain_request_json() {
    let query = robots()
        .filter(field("Zone").not_equals(Expr::null()))
        .filter(field("Cost").gte(10).and(field("Cost").lt(20)))
        .filter(field("Zone").equals("north").or(field("Zone").equals("south")))
        .order_by_descending(field("Cost"))
        .skip(5)
        .take(10);

    let translation = translate_query(&query).unwrap();
    assert_eq!(
        translation.search_request.to_json(),
        json!({
            "from": 5,
            "size": 10,
            "sort": [{ "cost": "desc" }],
            "filter": {
                "bool": {
                    "must": [
                        { "exists": { "field": "zone" } },
                        { "range": { "cost": { "gte": 10, "lt": 20 } } },
                        { "terms": { "zone": ["north", "south"] } }
                    ]
                }
            }
        })
    );
}

#[test]
fn test_negations() {
    let translation = translate_query(&robots().filter(!field("Zone").is_null())).unwrap();
    assert_eq!(translation.search_request.filter, Some(Criteria::exists("zone")));

    let translation = translate_query(&robots().filter(!field("Active"))).unwrap();
    assert_eq!(
        translation.search_request.filter.map(|c| c.to_json()),
        Some(json!({ "bool": { "must_not": [{ "term": { "active": true } }] } }))
    );
}

#[test]
fn test_prefix_and_regexp_predicates() {
    let query = robots()
        .filter(Expr::starts_with(Member::new("Name"), "R2"))
        .query(Expr::regexp(Member::nested(["Address", "City"]), "lon.*"));

    let translation = translate_query(&query).unwrap();
    assert_eq!(translation.search_request.filter, Some(Criteria::prefix("name", "R2")));
    assert_eq!(
        translation.search_request.query,
        Some(Criteria::regexp("address.city", "lon.*"))
    );
}

#[test]
fn test_query_string_is_independent_of_filter() {
    let query = robots()
        .filter(field("Cost").gt(1))
        .query_string("laser AND arm");

    let translation = translate_query(&query).unwrap();
    assert_eq!(
        translation.search_request.query,
        Some(Criteria::query_string("laser AND arm"))
    );
    assert!(translation.search_request.filter.is_some());
}

#[test]
fn test_score_ordering() {
    let query = robots()
        .query_string("arm")
        .order_by_score_descending()
        .then_by(field("Name"));

    let translation = translate_query(&query).unwrap();
    assert_eq!(
        translation.search_request.sort_fields,
        vec![SortOption::score(true), SortOption::new("name", false)]
    );
    assert_eq!(
        translation.search_request.to_json()["sort"],
        json!([{ "_score": "desc" }, { "name": "asc" }])
    );
}

#[test]
fn test_where_true_adds_no_filter() {
    let translation = translate_query(&robots().filter(Expr::from(true))).unwrap();
    assert!(translation.search_request.filter.is_none());
}

#[test]
fn test_terminals_choose_scalar_materializer() {
    let first = translate_query(&robots().first_where(field("Zone").equals("north"))).unwrap();
    assert!(matches!(first.materializer, Materializer::ScalarHit(_)));
    assert_eq!(first.search_request.size, Some(1));
    assert_eq!(first.search_request.filter, Some(Criteria::term("zone", "north")));
    assert_eq!(
        first.materializer.element_type(),
        &ElementType::Document("Robot".to_string())
    );

    let any = translate_query(&robots().any_where(field("Cost").lt(3))).unwrap();
    assert_eq!(any.search_request.size, Some(0));
    assert_eq!(any.materializer.element_type(), &ElementType::Boolean);
}

#[test]
fn test_null_predicate_rejected_before_translation() {
    let expr = QueryExpr::Where {
        source: Box::new(QueryExpr::Query {
            source: Box::new(robots().into_expression()),
            predicate: None,
        }),
        // Would be unsupported if it were reached
        predicate: Some(field("Cost").gt(field("Price"))),
    };

    let err = translate(&TrivialMapping::new(), "", &expr).unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));
    assert!(err.is_translation_error());
}

#[test]
fn test_null_query_string_rejected() {
    let expr: QueryExpr = serde_json::from_value(json!({
        "op": "query_string",
        "source": { "op": "source", "doc_type": "Robot" }
    }))
    .unwrap();

    let err = translate(&TrivialMapping::new(), "", &expr).unwrap_err();
    assert!(matches!(err, QueryError::InvalidArgument(_)));
}

#[test]
fn test_non_constant_comparison_unsupported() {
    let err = translate_query(&robots().filter(field("Cost").gt(field("Price")))).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedExpression(_)));
}

#[test]
fn test_nested_group_by_unsupported() {
    let query = robots()
        .group_by(field("Zone"))
        .group_by(field("Cost"))
        .select(Expr::count());
    let err = translate_query(&query).unwrap_err();
    assert!(matches!(err, QueryError::UnsupportedExpression(_)));
}

#[test]
fn test_ast_from_json() {
    let expr: QueryExpr = serde_json::from_value(json!({
        "op": "take",
        "count": 3,
        "source": {
            "op": "where",
            "predicate": {
                "kind": "compare",
                "op": "eq",
                "left": { "kind": "member", "path": ["Zone"] },
                "right": { "kind": "constant", "value": null }
            },
            "source": { "op": "source", "doc_type": "Robot" }
        }
    }))
    .unwrap();

    let translation = translate(&TrivialMapping::new(), "", &expr).unwrap();
    assert_eq!(translation.search_request.filter, Some(Criteria::missing("zone")));
    assert_eq!(translation.search_request.size, Some(3));
}

#[test]
fn test_context_translation_is_repeatable() {
    let settings = QuerySettings::from_json_str(
        r#"{ "index": "fleet", "field_prefix": "doc", "default_size": 50 }"#,
    )
    .unwrap();
    let context = SearchContext::new(settings).unwrap();
    let query = robots().filter(field("Cost").gt(5));

    let first = context.translate(&query).unwrap();
    let second = context.translate(&query).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.search_request.size, Some(50));
    assert_eq!(
        first.search_request.filter,
        Some(Criteria::range("doc.cost", elastiq::request::RangeComparison::GreaterThan, 5))
    );
    assert_eq!(context.search_path(&first), "/fleet/robots/_search");
}
