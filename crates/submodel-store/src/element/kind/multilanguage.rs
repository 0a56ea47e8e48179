// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! MultiLanguageProperty: localized value rows in a dedicated side table.
//!
//! The value rows live in `multilanguage_property_value`, apart from the
//! metadata langstring tables: they are mutable payload, not metadata, and
//! value-only updates rewrite them without touching any header aggregate.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, Row, postgres::PgRow};
use submodel_core::{
    ElementMeta, ElementValue, LangString, ModelType, MultiLanguageProperty, SubmodelElement
};

use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result},
    refstore::{from_json_opt, json_opt}
};

/// Handler for [`ModelType::MultiLanguageProperty`].
pub(crate) struct MultiLanguageHandler;

async fn replace_value_rows(
    conn: &mut PgConnection,
    mlp_id: i64,
    entries: &[LangString]
) -> Result<()> {
    sqlx::query("DELETE FROM multilanguage_property_value WHERE mlp_id = $1")
        .bind(mlp_id)
        .execute(&mut *conn)
        .await?;
    insert_value_rows(conn, &[(mlp_id, entries)]).await
}

async fn insert_value_rows(
    conn: &mut PgConnection,
    sets: &[(i64, &[LangString])]
) -> Result<()> {
    let mut rows: Vec<(i64, i32, &LangString)> = Vec::new();
    for (mlp_id, entries) in sets {
        for (position, entry) in entries.iter().enumerate() {
            rows.push((*mlp_id, position as i32, entry));
        }
    }
    if rows.is_empty() {
        return Ok(());
    }

    let mut insert = QueryBuilder::new(
        "INSERT INTO multilanguage_property_value (mlp_id, position, language, text) "
    );
    insert.push_values(rows, |mut row, (mlp_id, position, entry)| {
        row.push_bind(mlp_id)
            .push_bind(position)
            .push_bind(entry.language.clone())
            .push_bind(entry.text.clone());
    });
    insert.build().execute(conn).await?;
    Ok(())
}

#[async_trait]
impl KindHandler for MultiLanguageHandler {
    fn model_type(&self) -> ModelType {
        ModelType::MultiLanguageProperty
    }

    fn table(&self) -> &'static str {
        "multilanguage_property_element"
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
            let mlp = expect_kind!(*element, MultiLanguageProperty)?;
            parsed.push((*id, mlp, json_opt(mlp.value_id.as_ref())?));
        }

        let mut insert =
            QueryBuilder::new("INSERT INTO multilanguage_property_element (id, value_id) ");
        insert.push_values(&parsed, |mut row, (id, _, value_id)| {
            row.push_bind(id).push_bind(value_id.clone());
        });
        insert.build().execute(&mut *conn).await?;

        let value_sets: Vec<(i64, &[LangString])> = parsed
            .iter()
            .filter_map(|(id, mlp, _)| {
                mlp.value
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (*id, v))
            })
            .collect();
        insert_value_rows(conn, &value_sets).await
    }

    async fn update_patch(
        &self,
        conn: &mut PgConnection,
        id: i64,
        element: &SubmodelElement
    ) -> Result<()> {
        let mlp = expect_kind!(element, MultiLanguageProperty)?;
        if let Some(entries) = mlp.value.as_deref() {
            replace_value_rows(conn, id, entries).await?;
        }
        if let Some(value_id) = mlp.value_id.as_ref() {
            sqlx::query("UPDATE multilanguage_property_element SET value_id = $1 WHERE id = $2")
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
        let ElementValue::MultiLanguage(entries) = value else {
            return Err(RepoError::bad_request(
                "value shape does not match MultiLanguageProperty"
            ));
        };
        replace_value_rows(conn, id, entries).await
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        // Value rows are bulk-fetched by the tree assembler and attached
        // during hydration.
        Ok(SubmodelElement::MultiLanguageProperty(MultiLanguageProperty {
            meta: ElementMeta::default(),
            value: None,
            value_id: from_json_opt(row.try_get("m_value_id")?)?
        }))
    }
}
