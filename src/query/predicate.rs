//! Lowering of boolean expressions into filter criteria

use serde_json::Value;

use super::ast::{CompareOp, Expr, Member};
use crate::error::{QueryError, Result};
use crate::mapping::Mapping;
use crate::request::{Criteria, RangeComparison};

/// Translates predicates over one document (or one group member) into criteria
///
/// Field names are resolved through the mapping and, when a prefix is set,
/// placed under that dotted namespace.
#[derive(Clone, Copy, Debug)]
pub struct PredicateTranslator<'a> {
    mapping: &'a dyn Mapping,
    prefix: &'a str,
}

impl<'a> PredicateTranslator<'a> {
    pub fn new(mapping: &'a dyn Mapping, prefix: &'a str) -> Self {
        Self { mapping, prefix }
    }

    /// Wire name of a member, prefixed when a prefix is active
    pub fn field_name(&self, member: &Member) -> String {
        let name = self.mapping.get_field_name(member);
        if self.prefix.is_empty() {
            name
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }

    /// Wire name of an expression that must be a plain member access
    pub fn member_field(&self, expr: &Expr, context: &str) -> Result<String> {
        match expr {
            Expr::Member(member) => Ok(self.field_name(member)),
            other => Err(QueryError::unsupported(format!(
                "{} must select a member, found {}",
                context,
                other.describe()
            ))),
        }
    }

    pub fn translate(&self, expr: &Expr) -> Result<Criteria> {
        match expr {
            Expr::Compare { op, left, right } => self.comparison(*op, left, right),
            Expr::And { left, right } => {
                Ok(Criteria::and([self.translate(left)?, self.translate(right)?]))
            }
            Expr::Or { left, right } => {
                Ok(Criteria::or([self.translate(left)?, self.translate(right)?]))
            }
            Expr::Not { operand } => Ok(Criteria::not(self.translate(operand)?)),
            // A bare boolean member is a test for `true`
            Expr::Member(member) => Ok(Criteria::term(self.field_name(member), true)),
            Expr::Constant {
                value: Value::Bool(true),
            } => Ok(Criteria::MatchAll),
            Expr::Constant {
                value: Value::Bool(false),
            } => Ok(Criteria::not(Criteria::MatchAll)),
            Expr::Prefix { member, prefix } => Ok(Criteria::prefix(self.field_name(member), prefix.clone())),
            Expr::Regexp { member, pattern } => {
                Ok(Criteria::regexp(self.field_name(member), pattern.clone()))
            }
            other => Err(QueryError::unsupported(format!(
                "{} can not be used as a predicate",
                other.describe()
            ))),
        }
    }

    fn comparison(&self, op: CompareOp, left: &Expr, right: &Expr) -> Result<Criteria> {
        let (member, constant, op) = match (left, right) {
            (Expr::Member(member), Expr::Constant { value }) => (member, value, op),
            (Expr::Constant { value }, Expr::Member(member)) => (member, value, flip(op)),
            _ => {
                return Err(QueryError::unsupported(format!(
                    "comparison between {} and {}; one side must be a member and the other a constant",
                    left.describe(),
                    right.describe()
                )))
            }
        };

        let field = self.field_name(member);
        match (op, constant.is_null()) {
            (CompareOp::Eq, true) => Ok(Criteria::missing(field)),
            (CompareOp::Ne, true) => Ok(Criteria::exists(field)),
            (CompareOp::Eq, false) => Ok(Criteria::term(field, constant.clone())),
            (CompareOp::Ne, false) => Ok(Criteria::not(Criteria::term(field, constant.clone()))),
            (_, true) => Err(QueryError::unsupported(format!(
                "ordering comparison of {} against null",
                field
            ))),
            (op, false) => Ok(Criteria::range(field, range_comparison(op), constant.clone())),
        }
    }
}

fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Ge => CompareOp::Le,
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Le => CompareOp::Ge,
        eq_or_ne => eq_or_ne,
    }
}

fn range_comparison(op: CompareOp) -> RangeComparison {
    match op {
        CompareOp::Gt => RangeComparison::GreaterThan,
        CompareOp::Ge => RangeComparison::GreaterThanOrEqual,
        CompareOp::Lt => RangeComparison::LessThan,
        // Eq and Ne never reach here
        CompareOp::Le | CompareOp::Eq | CompareOp::Ne => RangeComparison::LessThanOrEqual,
    }
}
