// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! RelationshipElement and AnnotatedRelationshipElement.
//!
//! Both persist their two endpoints as inline JSON; the annotated variant
//! additionally owns annotation children, which are tree-managed and never
//! touch this side table.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, Row, postgres::PgRow};
use submodel_core::{
    AnnotatedRelationshipElement, ElementMeta, ElementValue, ModelType, Reference,
    RelationshipElement, SubmodelElement
};

use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result},
    refstore::{from_json_opt, json_opt}
};

fn endpoint(reference: Option<&Reference>) -> Option<&Reference> {
    reference.filter(|r| !r.is_empty())
}

async fn bulk_insert_endpoints(
    conn: &mut PgConnection,
    table: &str,
    rows: Vec<(i64, Option<serde_json::Value>, Option<serde_json::Value>)>
) -> Result<()> {
    let mut insert = QueryBuilder::new(format!("INSERT INTO {table} (id, first, second) "));
    insert.push_values(rows, |mut row, (id, first, second)| {
        row.push_bind(id).push_bind(first).push_bind(second);
    });
    insert.build().execute(conn).await?;
    Ok(())
}

async fn patch_endpoints(
    conn: &mut PgConnection,
    table: &str,
    id: i64,
    first: Option<&Reference>,
    second: Option<&Reference>
) -> Result<()> {
    if let Some(first) = first {
        sqlx::query(&format!("UPDATE {table} SET first = $1 WHERE id = $2"))
            .bind(json_opt(endpoint(Some(first)))?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    if let Some(second) = second {
        sqlx::query(&format!("UPDATE {table} SET second = $1 WHERE id = $2"))
            .bind(json_opt(endpoint(Some(second)))?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Handler for [`ModelType::RelationshipElement`].
pub(crate) struct RelationshipHandler;

#[async_trait]
impl KindHandler for RelationshipHandler {
    fn model_type(&self) -> ModelType {
        ModelType::RelationshipElement
    }

    fn table(&self) -> &'static str {
        "relationship_element"
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
            let relationship = expect_kind!(*element, RelationshipElement)?;
            parsed.push((
                *id,
                json_opt(endpoint(relationship.first.as_ref()))?,
                json_opt(endpoint(relationship.second.as_ref()))?,
            ));
        }
        bulk_insert_endpoints(conn, self.table(), parsed).await
    }

    async fn update_patch(
        &self,
        conn: &mut PgConnection,
        id: i64,
        element: &SubmodelElement
    ) -> Result<()> {
        let relationship = expect_kind!(element, RelationshipElement)?;
        patch_endpoints(
            conn,
            self.table(),
            id,
            relationship.first.as_ref(),
            relationship.second.as_ref()
        )
        .await
    }

    async fn apply_value(
        &self,
        conn: &mut PgConnection,
        id: i64,
        value: &ElementValue
    ) -> Result<()> {
        let ElementValue::Relationship {
            first,
            second
        } = value
        else {
            return Err(RepoError::bad_request(
                "value shape does not match RelationshipElement"
            ));
        };
        patch_endpoints(conn, self.table(), id, first.as_ref(), second.as_ref()).await
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::RelationshipElement(RelationshipElement {
            meta:   ElementMeta::default(),
            first:  from_json_opt(row.try_get("rel_first")?)?,
            second: from_json_opt(row.try_get("rel_second")?)?
        }))
    }
}

/// Handler for [`ModelType::AnnotatedRelationshipElement`].
pub(crate) struct AnnotatedRelationshipHandler;

#[async_trait]
impl KindHandler for AnnotatedRelationshipHandler {
    fn model_type(&self) -> ModelType {
        ModelType::AnnotatedRelationshipElement
    }

    fn table(&self) -> &'static str {
        "annotated_relationship_element"
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
            let annotated = expect_kind!(*element, AnnotatedRelationshipElement)?;
            parsed.push((
                *id,
                json_opt(endpoint(annotated.first.as_ref()))?,
                json_opt(endpoint(annotated.second.as_ref()))?,
            ));
        }
        bulk_insert_endpoints(conn, self.table(), parsed).await
    }

    async fn update_patch(
        &self,
        conn: &mut PgConnection,
        id: i64,
        element: &SubmodelElement
    ) -> Result<()> {
        let annotated = expect_kind!(element, AnnotatedRelationshipElement)?;
        patch_endpoints(
            conn,
            self.table(),
            id,
            annotated.first.as_ref(),
            annotated.second.as_ref()
        )
        .await
    }

    async fn apply_value(
        &self,
        conn: &mut PgConnection,
        id: i64,
        value: &ElementValue
    ) -> Result<()> {
        // Annotation children are descended into by the value-only driver;
        // only the endpoints are written here.
        let ElementValue::AnnotatedRelationship {
            first,
            second,
            ..
        } = value
        else {
            return Err(RepoError::bad_request(
                "value shape does not match AnnotatedRelationshipElement"
            ));
        };
        patch_endpoints(conn, self.table(), id, first.as_ref(), second.as_ref()).await
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::AnnotatedRelationshipElement(
            AnnotatedRelationshipElement {
                meta: ElementMeta::default(),
                first: from_json_opt(row.try_get("ar_first")?)?,
                second: from_json_opt(row.try_get("ar_second")?)?,
                annotations: None
            }
        ))
    }
}
