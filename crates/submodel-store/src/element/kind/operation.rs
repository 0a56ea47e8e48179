// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Operation: three serialized variable lists.
//!
//! Operation variables are templates, not live tree members; they travel as
//! JSON arrays and change atomically with the element.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, Row, postgres::PgRow};
use submodel_core::{ElementMeta, ElementValue, ModelType, Operation, SubmodelElement};

use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result},
    refstore::{from_json_opt, json_opt}
};

/// Handler for [`ModelType::Operation`].
pub(crate) struct OperationHandler;

#[async_trait]
impl KindHandler for OperationHandler {
    fn model_type(&self) -> ModelType {
        ModelType::Operation
    }

    fn table(&self) -> &'static str {
        "operation_element"
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
            let operation = expect_kind!(*element, Operation)?;
            parsed.push((
                *id,
                json_opt(operation.input_variables.as_ref().filter(|v| !v.is_empty()))?,
                json_opt(
                    operation
                        .output_variables
                        .as_ref()
                        .filter(|v| !v.is_empty())
                )?,
                json_opt(
                    operation
                        .inoutput_variables
                        .as_ref()
                        .filter(|v| !v.is_empty())
                )?,
            ));
        }

        let mut insert = QueryBuilder::new(
            "INSERT INTO operation_element \
             (id, input_variables, output_variables, inoutput_variables) "
        );
        insert.push_values(parsed, |mut row, (id, input, output, inoutput)| {
            row.push_bind(id)
                .push_bind(input)
                .push_bind(output)
                .push_bind(inoutput);
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
        let operation = expect_kind!(element, Operation)?;
        for (column, variables) in [
            ("input_variables", &operation.input_variables),
            ("output_variables", &operation.output_variables),
            ("inoutput_variables", &operation.inoutput_variables),
        ] {
            if variables.is_some() {
                sqlx::query(&format!(
                    "UPDATE operation_element SET {column} = $1 WHERE id = $2"
                ))
                .bind(json_opt(variables.as_ref().filter(|v| !v.is_empty()))?)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn apply_value(
        &self,
        _conn: &mut PgConnection,
        _id: i64,
        _value: &ElementValue
    ) -> Result<()> {
        Err(RepoError::bad_request(
            "Operation has no value representation"
        ))
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::Operation(Operation {
            meta: ElementMeta::default(),
            input_variables: from_json_opt(row.try_get("op_input_variables")?)?,
            output_variables: from_json_opt(row.try_get("op_output_variables")?)?,
            inoutput_variables: from_json_opt(row.try_get("op_inoutput_variables")?)?
        }))
    }
}
