// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Property: a scalar value spread over the typed-column scheme.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, postgres::PgRow};
use submodel_core::{ElementMeta, ElementValue, ModelType, Property, SubmodelElement};

use super::slots_from_row;
use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result},
    refstore::{from_json_opt, json_opt},
    typed_value::{self, TypedSlots}
};

/// Parse the typed slots of a property payload.
///
/// A value without a value type cannot be slotted and is a bad request; a
/// value type without a value is a fully-null row.
fn slots_of(value_type: Option<&str>, value: Option<&str>) -> Result<TypedSlots> {
    match value_type {
        Some(value_type) => typed_value::parse_opt(value_type, value),
        None if value.is_some() => Err(RepoError::bad_request(
            "a Property value requires a valueType"
        )),
        None => Ok(TypedSlots::empty())
    }
}

/// Handler for [`ModelType::Property`].
pub(crate) struct PropertyHandler;

#[async_trait]
impl KindHandler for PropertyHandler {
    fn model_type(&self) -> ModelType {
        ModelType::Property
    }

    fn table(&self) -> &'static str {
        "property_element"
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
            let property = expect_kind!(*element, Property)?;
            let slots = slots_of(property.value_type.as_deref(), property.value.as_deref())?;
            parsed.push((*id, property, slots, json_opt(property.value_id.as_ref())?));
        }

        let mut insert = QueryBuilder::new(
            "INSERT INTO property_element \
             (id, value_type, value_text, value_num, value_bool, value_time, value_date, \
              value_datetime, value_id) "
        );
        insert.push_values(parsed, |mut row, (id, property, slots, value_id)| {
            row.push_bind(id)
                .push_bind(property.value_type.clone())
                .push_bind(slots.text)
                .push_bind(slots.num)
                .push_bind(slots.boolean)
                .push_bind(slots.time)
                .push_bind(slots.date)
                .push_bind(slots.datetime)
                .push_bind(value_id);
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
        let property = expect_kind!(element, Property)?;
        if property.value_type.is_none() && property.value.is_none() && property.value_id.is_none()
        {
            return Ok(());
        }

        // Re-slotting needs the full current state: a new valueType moves the
        // existing value, a new value lands in the existing type's slot.
        let row = sqlx::query(
            "SELECT value_type, value_text AS p_value_text, value_num AS p_value_num, \
                    value_bool AS p_value_bool, value_time AS p_value_time, \
                    value_date AS p_value_date, value_datetime AS p_value_datetime \
             FROM property_element WHERE id = $1"
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
        let existing_type: Option<String> = sqlx::Row::try_get(&row, "value_type")?;
        let existing_value = typed_value::render(&slots_from_row(&row, "p_value")?);

        let effective_type = property.value_type.clone().or(existing_type);
        let effective_value = property.value.clone().or(existing_value);
        let slots = slots_of(effective_type.as_deref(), effective_value.as_deref())?;

        sqlx::query(
            "UPDATE property_element SET value_type = $1, value_text = $2, value_num = $3, \
             value_bool = $4, value_time = $5, value_date = $6, value_datetime = $7 \
             WHERE id = $8"
        )
        .bind(&effective_type)
        .bind(&slots.text)
        .bind(slots.num)
        .bind(slots.boolean)
        .bind(slots.time)
        .bind(slots.date)
        .bind(&slots.datetime)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if let Some(value_id) = property.value_id.as_ref() {
            sqlx::query("UPDATE property_element SET value_id = $1 WHERE id = $2")
                .bind(json_opt(Some(value_id))?)
                .bind(id)
                .execute(conn)
                .await?;
        }
        Ok(())
    }

    async fn apply_value(
        &self,
        conn: &mut PgConnection,
        id: i64,
        value: &ElementValue
    ) -> Result<()> {
        let ElementValue::Property(raw) = value else {
            return Err(RepoError::bad_request("value shape does not match Property"));
        };
        let value_type: Option<String> =
            sqlx::query_scalar("SELECT value_type FROM property_element WHERE id = $1")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
        let value_type = value_type.ok_or_else(|| {
            RepoError::bad_request("property has no valueType to interpret the value with")
        })?;
        let slots = typed_value::parse(&value_type, raw)?;

        sqlx::query(
            "UPDATE property_element SET value_text = $1, value_num = $2, value_bool = $3, \
             value_time = $4, value_date = $5, value_datetime = $6 WHERE id = $7"
        )
        .bind(&slots.text)
        .bind(slots.num)
        .bind(slots.boolean)
        .bind(slots.time)
        .bind(slots.date)
        .bind(&slots.datetime)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        let slots = slots_from_row(row, "p_value")?;
        Ok(SubmodelElement::Property(Property {
            meta: ElementMeta::default(),
            value_type: sqlx::Row::try_get(row, "p_value_type")?,
            value: typed_value::render(&slots),
            value_id: from_json_opt(sqlx::Row::try_get(row, "p_value_id")?)?
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_without_type_is_rejected() {
        assert!(slots_of(None, Some("7")).unwrap_err().is_bad_request());
    }

    #[test]
    fn type_without_value_is_an_empty_row() {
        let slots = slots_of(Some("xs:int"), None).unwrap();
        assert_eq!(slots.kind(), None);
    }

    #[test]
    fn typed_value_lands_in_its_slot() {
        let slots = slots_of(Some("xs:int"), Some("7")).unwrap();
        assert!(slots.num.is_some());
        assert!(slots.text.is_none());
    }
}
