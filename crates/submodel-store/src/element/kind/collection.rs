// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! The two generic containers.
//!
//! SubmodelElementCollection has no attributes of its own — its side table is
//! identity only. SubmodelElementList persists the order-relevance flag and
//! the member expectations. Children of both are tree-managed.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, Row, postgres::PgRow};
use submodel_core::{
    ElementMeta, ElementValue, ModelType, SubmodelElement, SubmodelElementCollection,
    SubmodelElementList
};

use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result},
    refstore::{from_json_opt, json_opt}
};

/// Handler for [`ModelType::SubmodelElementCollection`].
pub(crate) struct CollectionHandler;

#[async_trait]
impl KindHandler for CollectionHandler {
    fn model_type(&self) -> ModelType {
        ModelType::SubmodelElementCollection
    }

    fn table(&self) -> &'static str {
        "submodel_element_collection"
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
        for (_, element) in rows {
            expect_kind!(*element, SubmodelElementCollection)?;
        }
        let mut insert = QueryBuilder::new("INSERT INTO submodel_element_collection (id) ");
        insert.push_values(rows, |mut row, (id, _)| {
            row.push_bind(*id);
        });
        insert.build().execute(conn).await?;
        Ok(())
    }

    async fn update_patch(
        &self,
        _conn: &mut PgConnection,
        _id: i64,
        element: &SubmodelElement
    ) -> Result<()> {
        expect_kind!(element, SubmodelElementCollection)?;
        Ok(())
    }

    async fn apply_value(
        &self,
        _conn: &mut PgConnection,
        _id: i64,
        value: &ElementValue
    ) -> Result<()> {
        // Children are descended into by the value-only driver; the side
        // table itself has nothing to write.
        match value {
            ElementValue::Collection(_) => Ok(()),
            _ => Err(RepoError::bad_request(
                "value shape does not match SubmodelElementCollection"
            ))
        }
    }

    fn from_row(&self, _row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::SubmodelElementCollection(
            SubmodelElementCollection {
                meta:  ElementMeta::default(),
                value: None
            }
        ))
    }
}

/// Handler for [`ModelType::SubmodelElementList`].
pub(crate) struct ListHandler;

#[async_trait]
impl KindHandler for ListHandler {
    fn model_type(&self) -> ModelType {
        ModelType::SubmodelElementList
    }

    fn table(&self) -> &'static str {
        "submodel_element_list"
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
            let list = expect_kind!(*element, SubmodelElementList)?;
            let semantic_id = list
                .semantic_id_list_element
                .as_ref()
                .filter(|r| !r.is_empty());
            parsed.push((*id, list, json_opt(semantic_id)?));
        }

        let mut insert = QueryBuilder::new(
            "INSERT INTO submodel_element_list \
             (id, order_relevant, semantic_id_list_element, type_value_list_element, \
              value_type_list_element) "
        );
        insert.push_values(parsed, |mut row, (id, list, semantic_id)| {
            row.push_bind(id)
                .push_bind(list.order_relevant)
                .push_bind(semantic_id)
                .push_bind(list.type_value_list_element.clone())
                .push_bind(list.value_type_list_element.clone());
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
        let list = expect_kind!(element, SubmodelElementList)?;
        if let Some(order_relevant) = list.order_relevant {
            sqlx::query("UPDATE submodel_element_list SET order_relevant = $1 WHERE id = $2")
                .bind(order_relevant)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        if let Some(semantic_id) = list.semantic_id_list_element.as_ref() {
            sqlx::query(
                "UPDATE submodel_element_list SET semantic_id_list_element = $1 WHERE id = $2"
            )
            .bind(json_opt(Some(semantic_id).filter(|r| !r.is_empty()))?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        }
        if let Some(type_value) = list.type_value_list_element.as_deref() {
            sqlx::query(
                "UPDATE submodel_element_list SET type_value_list_element = $1 WHERE id = $2"
            )
            .bind(type_value)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        }
        if let Some(value_type) = list.value_type_list_element.as_deref() {
            sqlx::query(
                "UPDATE submodel_element_list SET value_type_list_element = $1 WHERE id = $2"
            )
            .bind(value_type)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    async fn apply_value(
        &self,
        _conn: &mut PgConnection,
        _id: i64,
        value: &ElementValue
    ) -> Result<()> {
        match value {
            ElementValue::List(_) => Ok(()),
            _ => Err(RepoError::bad_request(
                "value shape does not match SubmodelElementList"
            ))
        }
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::SubmodelElementList(SubmodelElementList {
            meta: ElementMeta::default(),
            order_relevant: row.try_get("li_order_relevant")?,
            semantic_id_list_element: from_json_opt(row.try_get("li_semantic_id_list_element")?)?,
            type_value_list_element: row.try_get("li_type_value_list_element")?,
            value_type_list_element: row.try_get("li_value_type_list_element")?,
            value: None
        }))
    }
}
