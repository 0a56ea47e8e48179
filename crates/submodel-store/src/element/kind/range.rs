// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Range: min/max bounds in the typed-column scheme, two column groups.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, Row, postgres::PgRow};
use submodel_core::{ElementMeta, ElementValue, ModelType, Range, SubmodelElement};

use super::slots_from_row;
use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result},
    typed_value::{self, TypedSlots}
};

fn bound_slots(value_type: Option<&str>, bound: Option<&str>) -> Result<TypedSlots> {
    match value_type {
        Some(value_type) => typed_value::parse_opt(value_type, bound),
        None if bound.is_some() => {
            Err(RepoError::bad_request("a Range bound requires a valueType"))
        }
        None => Ok(TypedSlots::empty())
    }
}

/// Handler for [`ModelType::Range`].
pub(crate) struct RangeHandler;

#[async_trait]
impl KindHandler for RangeHandler {
    fn model_type(&self) -> ModelType {
        ModelType::Range
    }

    fn table(&self) -> &'static str {
        "range_element"
    }

    async fn insert(
        &self,
        conn: &mut PgConnection,
        id: i64,
        element: &SubmodelElement
    ) -> Result<()> {
        self.bulk_insert(conn, &[(id, element)]).await
    }

    async fn bulk_insert(
        &self,
        conn: &mut PgConnection,
        rows: &[(i64, &SubmodelElement)]
    ) -> Result<()> {
        let mut parsed = Vec::with_capacity(rows.len());
        for (id, element) in rows {
            let range = expect_kind!(*element, Range)?;
            let min = bound_slots(range.value_type.as_deref(), range.min.as_deref())?;
            let max = bound_slots(range.value_type.as_deref(), range.max.as_deref())?;
            parsed.push((*id, range, min, max));
        }

        let mut insert = QueryBuilder::new(
            "INSERT INTO range_element \
             (id, value_type, min_text, min_num, min_bool, min_time, min_date, min_datetime, \
              max_text, max_num, max_bool, max_time, max_date, max_datetime) "
        );
        insert.push_values(parsed, |mut row, (id, range, min, max)| {
            row.push_bind(id)
                .push_bind(range.value_type.clone())
                .push_bind(min.text)
                .push_bind(min.num)
                .push_bind(min.boolean)
                .push_bind(min.time)
                .push_bind(min.date)
                .push_bind(min.datetime)
                .push_bind(max.text)
                .push_bind(max.num)
                .push_bind(max.boolean)
                .push_bind(max.time)
                .push_bind(max.date)
                .push_bind(max.datetime);
        });
        insert.build().execute(conn).await?;
        Ok(())
    }

    async fn update_patch(
        &self,
        conn: &mut PgConnection,
        id: i64,
        element: &SubmodelElement
    ) -> Result<()> {
        let range = expect_kind!(element, Range)?;
        if range.value_type.is_none() && range.min.is_none() && range.max.is_none() {
            return Ok(());
        }

        let row = sqlx::query(
            "SELECT value_type, \
                    min_text AS r_min_text, min_num AS r_min_num, min_bool AS r_min_bool, \
                    min_time AS r_min_time, min_date AS r_min_date, \
                    min_datetime AS r_min_datetime, \
                    max_text AS r_max_text, max_num AS r_max_num, max_bool AS r_max_bool, \
                    max_time AS r_max_time, max_date AS r_max_date, \
                    max_datetime AS r_max_datetime \
             FROM range_element WHERE id = $1"
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
        let existing_type: Option<String> = row.try_get("value_type")?;
        let existing_min = typed_value::render(&slots_from_row(&row, "r_min")?);
        let existing_max = typed_value::render(&slots_from_row(&row, "r_max")?);

        let effective_type = range.value_type.clone().or(existing_type);
        let effective_min = range.min.clone().or(existing_min);
        let effective_max = range.max.clone().or(existing_max);
        let min = bound_slots(effective_type.as_deref(), effective_min.as_deref())?;
        let max = bound_slots(effective_type.as_deref(), effective_max.as_deref())?;

        write_bounds(conn, id, effective_type.as_deref(), &min, &max).await
    }

    async fn apply_value(
        &self,
        conn: &mut PgConnection,
        id: i64,
        value: &ElementValue
    ) -> Result<()> {
        let ElementValue::Range {
            min,
            max
        } = value
        else {
            return Err(RepoError::bad_request("value shape does not match Range"));
        };
        let value_type: Option<String> =
            sqlx::query_scalar("SELECT value_type FROM range_element WHERE id = $1")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
        let value_type = value_type.ok_or_else(|| {
            RepoError::bad_request("range has no valueType to interpret the bounds with")
        })?;
        let min = bound_slots(Some(&value_type), min.as_deref())?;
        let max = bound_slots(Some(&value_type), max.as_deref())?;

        write_bounds(conn, id, Some(&value_type), &min, &max).await
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::Range(Range {
            meta: ElementMeta::default(),
            value_type: row.try_get("r_value_type")?,
            min: typed_value::render(&slots_from_row(row, "r_min")?),
            max: typed_value::render(&slots_from_row(row, "r_max")?)
        }))
    }
}

async fn write_bounds(
    conn: &mut PgConnection,
    id: i64,
    value_type: Option<&str>,
    min: &TypedSlots,
    max: &TypedSlots
) -> Result<()> {
    sqlx::query(
        "UPDATE range_element SET value_type = $1, \
            min_text = $2, min_num = $3, min_bool = $4, min_time = $5, min_date = $6, \
            min_datetime = $7, \
            max_text = $8, max_num = $9, max_bool = $10, max_time = $11, max_date = $12, \
            max_datetime = $13 \
         WHERE id = $14"
    )
    .bind(value_type)
    .bind(&min.text)
    .bind(min.num)
    .bind(min.boolean)
    .bind(min.time)
    .bind(min.date)
    .bind(&min.datetime)
    .bind(&max.text)
    .bind(max.num)
    .bind(max.boolean)
    .bind(max.time)
    .bind(max.date)
    .bind(&max.datetime)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_share_the_value_type() {
        let min = bound_slots(Some("xs:int"), Some("0")).unwrap();
        let max = bound_slots(Some("xs:int"), Some("100")).unwrap();
        assert!(min.num.is_some());
        assert!(max.num.is_some());
    }

    #[test]
    fn bound_without_type_is_rejected() {
        assert!(bound_slots(None, Some("1")).unwrap_err().is_bad_request());
    }

    #[test]
    fn open_bound_is_all_null() {
        let slots = bound_slots(Some("xs:int"), None).unwrap();
        assert_eq!(slots.kind(), None);
    }
}
