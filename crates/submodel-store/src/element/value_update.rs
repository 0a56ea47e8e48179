// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! The value-only update verb.
//!
//! Distinct from PUT and PATCH: it mutates only the kind-specific value
//! columns of the target and leaves the header and all metadata untouched.
//! For containers the update descends, applying per-child value-only updates;
//! child payloads stay raw JSON until the child's kind is resolved, then are
//! parsed against that kind.

use futures::future::BoxFuture;
use sqlx::PgConnection;
use submodel_core::ElementValue;

use crate::{
    element::{self, ElementRef, handler},
    error::{RepoError, Result},
    path
};

/// Apply a parsed value-only payload to a resolved element, descending
/// through container children.
///
/// # Errors
///
/// - [`RepoError::BadRequest`] when the payload shape does not match the
///   element's kind;
/// - [`RepoError::NotFound`] when a named child or list index in the payload
///   does not exist;
/// - [`RepoError::Internal`] on database failures.
pub(crate) fn apply<'a>(
    conn: &'a mut PgConnection,
    target: &'a ElementRef,
    value: &'a ElementValue
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        handler(target.model_type)
            .apply_value(conn, target.id, value)
            .await?;

        match value {
            ElementValue::Collection(children) => {
                apply_named_children(conn, target, children).await
            }
            ElementValue::Entity {
                statements, ..
            } => apply_named_children(conn, target, statements).await,
            ElementValue::AnnotatedRelationship {
                annotations, ..
            } => apply_named_children(conn, target, annotations).await,
            ElementValue::List(members) => {
                for (index, raw) in members.iter().enumerate() {
                    let index = u32::try_from(index)
                        .map_err(|_| RepoError::bad_request("list index out of range"))?;
                    let child_path = path::indexed(&target.id_short_path, index);
                    let child =
                        element::resolve(conn, target.submodel_id, &child_path).await?;
                    let child_value = ElementValue::from_json(child.model_type, raw)?;
                    apply(conn, &child, &child_value).await?;
                }
                Ok(())
            }
            _ => Ok(())
        }
    })
}

async fn apply_named_children(
    conn: &mut PgConnection,
    parent: &ElementRef,
    children: &[(String, serde_json::Value)]
) -> Result<()> {
    for (id_short, raw) in children {
        let child_path = path::extend(&parent.id_short_path, id_short);
        let child = element::resolve(conn, parent.submodel_id, &child_path).await?;
        let child_value = ElementValue::from_json(child.model_type, raw)?;
        apply(conn, &child, &child_value).await?;
    }
    Ok(())
}
