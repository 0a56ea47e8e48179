// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Capability: a marker element; its side table is identity only.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, postgres::PgRow};
use submodel_core::{Capability, ElementMeta, ElementValue, ModelType, SubmodelElement};

use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result}
};

/// Handler for [`ModelType::Capability`].
pub(crate) struct CapabilityHandler;

#[async_trait]
impl KindHandler for CapabilityHandler {
    fn model_type(&self) -> ModelType {
        ModelType::Capability
    }

    fn table(&self) -> &'static str {
        "capability_element"
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
            expect_kind!(*element, Capability)?;
        }
        let mut insert = QueryBuilder::new("INSERT INTO capability_element (id) ");
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
        expect_kind!(element, Capability)?;
        Ok(())
    }

    async fn apply_value(
        &self,
        _conn: &mut PgConnection,
        _id: i64,
        _value: &ElementValue
    ) -> Result<()> {
        Err(RepoError::bad_request(
            "Capability has no value representation"
        ))
    }

    fn from_row(&self, _row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::Capability(Capability {
            meta: ElementMeta::default()
        }))
    }
}
