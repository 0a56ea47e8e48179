// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Lowering of pre-parsed submodel filter expressions to SQL.
//!
//! The engine does not parse query text — it consumes a closed expression
//! tree ([`QueryExpr`]) and lowers it to a `WHERE` fragment with bound
//! parameters. Expressions that cannot be expressed against the schema are a
//! bad request ("query cannot be lowered"), never a silent mismatch.

use crate::error::{RepoError, Result};

/// Queryable submodel fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    /// The globally unique submodel identifier.
    Id,
    /// The submodel's idShort.
    IdShort,
    /// Any key value of the submodel's semantic id.
    SemanticId
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Exact equality.
    Eq,
    /// Inequality.
    Ne,
    /// Substring containment (case-insensitive).
    Contains,
    /// Prefix match.
    StartsWith
}

/// One field comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    /// Field to compare.
    pub field: QueryField,
    /// Operator.
    pub op: CompareOp,
    /// Comparison value.
    pub value: String
}

/// A pre-parsed filter expression over submodels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    /// Every operand must hold.
    And(Vec<QueryExpr>),
    /// At least one operand must hold.
    Or(Vec<QueryExpr>),
    /// The operand must not hold.
    Not(Box<QueryExpr>),
    /// A single comparison.
    Match(FieldMatch)
}

/// A lowered predicate: SQL fragment plus bind values, placeholders starting
/// at `$<first_param>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lowered {
    /// SQL boolean expression over the `s` (submodel) table alias.
    pub sql: String,
    /// Bind values, in placeholder order.
    pub params: Vec<String>
}

/// Lower an expression tree to SQL.
///
/// # Errors
///
/// [`RepoError::BadRequest`] for empty conjunctions/disjunctions — the
/// expression cannot be lowered to a defined predicate.
pub fn lower(expr: &QueryExpr, first_param: usize) -> Result<Lowered> {
    let mut params = Vec::new();
    let sql = lower_into(expr, first_param, &mut params)?;
    Ok(Lowered {
        sql,
        params
    })
}

fn lower_into(expr: &QueryExpr, first_param: usize, params: &mut Vec<String>) -> Result<String> {
    match expr {
        QueryExpr::And(operands) | QueryExpr::Or(operands) => {
            if operands.is_empty() {
                return Err(RepoError::bad_request(
                    "query cannot be lowered: empty logical operand list"
                ));
            }
            let joiner = if matches!(expr, QueryExpr::And(_)) {
                " AND "
            } else {
                " OR "
            };
            let mut parts = Vec::with_capacity(operands.len());
            for operand in operands {
                parts.push(lower_into(operand, first_param, params)?);
            }
            Ok(format!("({})", parts.join(joiner)))
        }
        QueryExpr::Not(operand) => {
            let inner = lower_into(operand, first_param, params)?;
            Ok(format!("NOT {inner}"))
        }
        QueryExpr::Match(m) => {
            let placeholder = first_param + params.len();
            let (column_sql, bound) = match (m.field, m.op) {
                (QueryField::SemanticId, op) => {
                    let comparison = key_comparison(op, placeholder);
                    params.push(bind_value(op, &m.value));
                    return Ok(format!(
                        "EXISTS (SELECT 1 FROM reference_key rk \
                         WHERE rk.reference_id = s.semantic_id AND {comparison})"
                    ));
                }
                (QueryField::Id, op) => (column(op, "s.submodel_identifier", placeholder), op),
                (QueryField::IdShort, op) => (column(op, "s.id_short", placeholder), op)
            };
            params.push(bind_value(bound, &m.value));
            Ok(column_sql)
        }
    }
}

fn column(op: CompareOp, column: &str, placeholder: usize) -> String {
    match op {
        CompareOp::Eq => format!("{column} = ${placeholder}"),
        CompareOp::Ne => format!("{column} IS DISTINCT FROM ${placeholder}"),
        CompareOp::Contains => format!("{column} ILIKE ${placeholder}"),
        CompareOp::StartsWith => format!("{column} LIKE ${placeholder}")
    }
}

fn key_comparison(op: CompareOp, placeholder: usize) -> String {
    column(op, "rk.value", placeholder)
}

fn bind_value(op: CompareOp, value: &str) -> String {
    match op {
        CompareOp::Eq | CompareOp::Ne => value.to_owned(),
        CompareOp::Contains => format!("%{}%", escape(value)),
        CompareOp::StartsWith => format!("{}%", escape(value))
    }
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(field: QueryField, value: &str) -> QueryExpr {
        QueryExpr::Match(FieldMatch {
            field,
            op: CompareOp::Eq,
            value: value.into()
        })
    }

    #[test]
    fn single_match_lowers_to_one_placeholder() {
        let lowered = lower(&eq(QueryField::Id, "urn:x"), 1).unwrap();
        assert_eq!(lowered.sql, "s.submodel_identifier = $1");
        assert_eq!(lowered.params, vec!["urn:x"]);
    }

    #[test]
    fn conjunction_numbers_placeholders_in_order() {
        let expr = QueryExpr::And(vec![
            eq(QueryField::IdShort, "demo"),
            QueryExpr::Match(FieldMatch {
                field: QueryField::IdShort,
                op:    CompareOp::Contains,
                value: "emo".into()
            }),
        ]);
        let lowered = lower(&expr, 3).unwrap();
        assert_eq!(lowered.sql, "(s.id_short = $3 AND s.id_short ILIKE $4)");
        assert_eq!(lowered.params, vec!["demo", "%emo%"]);
    }

    #[test]
    fn semantic_id_lowers_to_key_subquery() {
        let lowered = lower(&eq(QueryField::SemanticId, "urn:sem"), 1).unwrap();
        assert!(lowered.sql.contains("reference_key"));
        assert!(lowered.sql.contains("rk.value = $1"));
        assert_eq!(lowered.params, vec!["urn:sem"]);
    }

    #[test]
    fn negation_wraps_the_operand() {
        let lowered = lower(&QueryExpr::Not(Box::new(eq(QueryField::Id, "a"))), 1).unwrap();
        assert_eq!(lowered.sql, "NOT s.submodel_identifier = $1");
    }

    #[test]
    fn empty_conjunction_cannot_be_lowered() {
        let err = lower(&QueryExpr::And(Vec::new()), 1).unwrap_err();
        assert!(err.is_bad_request());
        assert!(err.to_string().contains("cannot be lowered"));
    }

    #[test]
    fn contains_escapes_like_metacharacters() {
        let expr = QueryExpr::Match(FieldMatch {
            field: QueryField::IdShort,
            op:    CompareOp::Contains,
            value: "50%_x".into()
        });
        let lowered = lower(&expr, 1).unwrap();
        assert_eq!(lowered.params, vec!["%50\\%\\_x%"]);
    }
}
