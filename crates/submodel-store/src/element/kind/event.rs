// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! BasicEventElement: event source description with timing windows.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, Row, postgres::PgRow};
use submodel_core::{BasicEventElement, ElementMeta, ElementValue, ModelType, SubmodelElement};

use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result},
    refstore::{from_json_opt, json_opt}
};

/// Handler for [`ModelType::BasicEventElement`].
pub(crate) struct BasicEventHandler;

#[async_trait]
impl KindHandler for BasicEventHandler {
    fn model_type(&self) -> ModelType {
        ModelType::BasicEventElement
    }

    fn table(&self) -> &'static str {
        "basic_event_element"
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
            let event = expect_kind!(*element, BasicEventElement)?;
            parsed.push((
                *id,
                event,
                json_opt(event.observed.as_ref().filter(|r| !r.is_empty()))?,
                json_opt(event.message_broker.as_ref().filter(|r| !r.is_empty()))?,
            ));
        }

        let mut insert = QueryBuilder::new(
            "INSERT INTO basic_event_element \
             (id, observed, direction, state, message_topic, message_broker, last_update, \
              min_interval, max_interval) "
        );
        insert.push_values(parsed, |mut row, (id, event, observed, broker)| {
            row.push_bind(id)
                .push_bind(observed)
                .push_bind(event.direction.clone())
                .push_bind(event.state.clone())
                .push_bind(event.message_topic.clone())
                .push_bind(broker)
                .push_bind(event.last_update.clone())
                .push_bind(event.min_interval.clone())
                .push_bind(event.max_interval.clone());
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
        let event = expect_kind!(element, BasicEventElement)?;

        if let Some(observed) = event.observed.as_ref() {
            sqlx::query("UPDATE basic_event_element SET observed = $1 WHERE id = $2")
                .bind(json_opt(Some(observed).filter(|r| !r.is_empty()))?)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        if let Some(broker) = event.message_broker.as_ref() {
            sqlx::query("UPDATE basic_event_element SET message_broker = $1 WHERE id = $2")
                .bind(json_opt(Some(broker).filter(|r| !r.is_empty()))?)
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        for (column, value) in [
            ("direction", event.direction.as_deref()),
            ("state", event.state.as_deref()),
            ("message_topic", event.message_topic.as_deref()),
            ("last_update", event.last_update.as_deref()),
            ("min_interval", event.min_interval.as_deref()),
            ("max_interval", event.max_interval.as_deref()),
        ] {
            if let Some(value) = value {
                sqlx::query(&format!(
                    "UPDATE basic_event_element SET {column} = $1 WHERE id = $2"
                ))
                .bind(value)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn apply_value(
        &self,
        conn: &mut PgConnection,
        id: i64,
        value: &ElementValue
    ) -> Result<()> {
        let ElementValue::BasicEvent {
            observed
        } = value
        else {
            return Err(RepoError::bad_request(
                "value shape does not match BasicEventElement"
            ));
        };
        if let Some(observed) = observed.as_ref() {
            sqlx::query("UPDATE basic_event_element SET observed = $1 WHERE id = $2")
                .bind(json_opt(Some(observed).filter(|r| !r.is_empty()))?)
                .bind(id)
                .execute(conn)
                .await?;
        }
        Ok(())
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::BasicEventElement(BasicEventElement {
            meta: ElementMeta::default(),
            observed: from_json_opt(row.try_get("ev_observed")?)?,
            direction: row.try_get("ev_direction")?,
            state: row.try_get("ev_state")?,
            message_topic: row.try_get("ev_message_topic")?,
            message_broker: from_json_opt(row.try_get("ev_message_broker")?)?,
            last_update: row.try_get("ev_last_update")?,
            min_interval: row.try_get("ev_min_interval")?,
            max_interval: row.try_get("ev_max_interval")?
        }))
    }
}
