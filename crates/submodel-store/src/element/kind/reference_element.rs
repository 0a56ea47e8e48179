// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! ReferenceElement: a single reference value, inline JSON.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, Row, postgres::PgRow};
use submodel_core::{ElementMeta, ElementValue, ModelType, ReferenceElement, SubmodelElement};

use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result},
    refstore::{from_json_opt, json_opt}
};

/// Handler for [`ModelType::ReferenceElement`].
pub(crate) struct ReferenceElementHandler;

#[async_trait]
impl KindHandler for ReferenceElementHandler {
    fn model_type(&self) -> ModelType {
        ModelType::ReferenceElement
    }

    fn table(&self) -> &'static str {
        "reference_element"
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
            let reference_element = expect_kind!(*element, ReferenceElement)?;
            let value = reference_element
                .value
                .as_ref()
                .filter(|r| !r.is_empty());
            parsed.push((*id, json_opt(value)?));
        }

        let mut insert = QueryBuilder::new("INSERT INTO reference_element (id, value) ");
        insert.push_values(parsed, |mut row, (id, value)| {
            row.push_bind(id).push_bind(value);
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
        let reference_element = expect_kind!(element, ReferenceElement)?;
        if let Some(value) = reference_element.value.as_ref() {
            sqlx::query("UPDATE reference_element SET value = $1 WHERE id = $2")
                .bind(json_opt(Some(value).filter(|r| !r.is_empty()))?)
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
        let ElementValue::ReferenceElement(reference) = value else {
            return Err(RepoError::bad_request(
                "value shape does not match ReferenceElement"
            ));
        };
        sqlx::query("UPDATE reference_element SET value = $1 WHERE id = $2")
            .bind(json_opt(Some(reference).filter(|r| !r.is_empty()))?)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::ReferenceElement(ReferenceElement {
            meta:  ElementMeta::default(),
            value: from_json_opt(row.try_get("re_value")?)?
        }))
    }
}
