// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Entity: asset entity with statement children.
//!
//! Statements are tree-managed children; the side table carries only the
//! entity kind, the global asset id and the serialized specific asset ids.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, Row, postgres::PgRow};
use submodel_core::{ElementMeta, ElementValue, Entity, ModelType, SubmodelElement};

use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result},
    refstore::{from_json_opt, json_opt}
};

/// Handler for [`ModelType::Entity`].
pub(crate) struct EntityHandler;

#[async_trait]
impl KindHandler for EntityHandler {
    fn model_type(&self) -> ModelType {
        ModelType::Entity
    }

    fn table(&self) -> &'static str {
        "entity_element"
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
            let entity = expect_kind!(*element, Entity)?;
            let asset_ids = entity
                .specific_asset_ids
                .as_ref()
                .filter(|v| !v.is_empty());
            parsed.push((*id, entity, json_opt(asset_ids)?));
        }

        let mut insert = QueryBuilder::new(
            "INSERT INTO entity_element (id, entity_type, global_asset_id, specific_asset_ids) "
        );
        insert.push_values(parsed, |mut row, (id, entity, asset_ids)| {
            row.push_bind(id)
                .push_bind(entity.entity_type.clone())
                .push_bind(entity.global_asset_id.clone())
                .push_bind(asset_ids);
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
        let entity = expect_kind!(element, Entity)?;
        if let Some(entity_type) = entity.entity_type.as_deref() {
            sqlx::query("UPDATE entity_element SET entity_type = $1 WHERE id = $2")
                .bind(entity_type)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        if let Some(global_asset_id) = entity.global_asset_id.as_deref() {
            sqlx::query("UPDATE entity_element SET global_asset_id = $1 WHERE id = $2")
                .bind(global_asset_id)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        if entity.specific_asset_ids.is_some() {
            sqlx::query("UPDATE entity_element SET specific_asset_ids = $1 WHERE id = $2")
                .bind(json_opt(
                    entity.specific_asset_ids.as_ref().filter(|v| !v.is_empty())
                )?)
                .bind(id)
                .execute(&mut *conn)
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
        // Statement children are descended into by the value-only driver.
        let ElementValue::Entity {
            entity_type,
            global_asset_id,
            ..
        } = value
        else {
            return Err(RepoError::bad_request("value shape does not match Entity"));
        };
        if let Some(entity_type) = entity_type.as_deref() {
            sqlx::query("UPDATE entity_element SET entity_type = $1 WHERE id = $2")
                .bind(entity_type)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        if let Some(global_asset_id) = global_asset_id.as_deref() {
            sqlx::query("UPDATE entity_element SET global_asset_id = $1 WHERE id = $2")
                .bind(global_asset_id)
                .bind(id)
                .execute(conn)
                .await?;
        }
        Ok(())
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::Entity(Entity {
            meta: ElementMeta::default(),
            statements: None,
            entity_type: row.try_get("en_entity_type")?,
            global_asset_id: row.try_get("en_global_asset_id")?,
            specific_asset_ids: from_json_opt(row.try_get("en_specific_asset_ids")?)?
        }))
    }
}
