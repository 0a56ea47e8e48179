// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Writes against the polymorphic element header table.
//!
//! The header row carries everything shared across kinds: identity, tree
//! location, metadata foreign keys and the three read-mostly JSON aggregates.
//! Inserts go through the batch fast path; this module owns the update paths,
//! where PUT and PATCH differ exactly as everywhere else — PUT nulls what the
//! request omits, PATCH preserves it.

use sqlx::{PgConnection, Row};
use submodel_core::{ElementMeta, LangStringKind, SubmodelElement};

use crate::{
    error::Result,
    refstore::{self, json_opt}
};

/// Old aggregate ids of a header row, fetched before replacement.
struct HeaderAggregates {
    semantic_id: Option<i64>,
    description_id: Option<i64>,
    displayname_id: Option<i64>
}

async fn fetch_aggregates(conn: &mut PgConnection, id: i64) -> Result<HeaderAggregates> {
    let row = sqlx::query(
        "SELECT semantic_id, description_id, displayname_id FROM submodel_element WHERE id = $1"
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(HeaderAggregates {
        semantic_id: row.try_get("semantic_id")?,
        description_id: row.try_get("description_id")?,
        displayname_id: row.try_get("displayname_id")?
    })
}

async fn drop_aggregates(conn: &mut PgConnection, old: &HeaderAggregates) -> Result<()> {
    if let Some(reference_id) = old.semantic_id {
        refstore::delete_reference(conn, reference_id).await?;
    }
    if let Some(description_id) = old.description_id {
        refstore::delete_lang_strings(conn, LangStringKind::Text, &[description_id]).await?;
    }
    if let Some(displayname_id) = old.displayname_id {
        refstore::delete_lang_strings(conn, LangStringKind::Name, &[displayname_id]).await?;
    }
    Ok(())
}

/// Total replacement of the header metadata of an element.
///
/// Every metadata column is rewritten from the supplied element; omitted
/// fields become null. Tree-location columns (parent, position, path, root)
/// are not touched — path rewrites on idShort changes are the coordinator's
/// move. Qualifiers are replaced wholesale.
///
/// # Errors
///
/// Database failures surface as [`crate::RepoError::Internal`].
pub(crate) async fn update_put(
    conn: &mut PgConnection,
    id: i64,
    element: &SubmodelElement
) -> Result<()> {
    let meta = element.meta();
    let old = fetch_aggregates(conn, id).await?;
    drop_aggregates(conn, &old).await?;

    let semantic_id = refstore::create_reference(conn, meta.semantic_id.as_ref()).await?;
    let description_id =
        refstore::create_lang_strings(conn, LangStringKind::Text, meta.description.as_deref())
            .await?;
    let displayname_id =
        refstore::create_lang_strings(conn, LangStringKind::Name, meta.display_name.as_deref())
            .await?;

    sqlx::query(
        "UPDATE submodel_element SET \
            id_short = $1, category = $2, semantic_id = $3, description_id = $4, \
            displayname_id = $5, embedded_data_specification = $6, \
            supplemental_semantic_ids = $7, extensions = $8 \
         WHERE id = $9"
    )
    .bind(&meta.id_short)
    .bind(&meta.category)
    .bind(semantic_id)
    .bind(description_id)
    .bind(displayname_id)
    .bind(json_opt(non_empty_specs(meta))?)
    .bind(json_opt(non_empty_supplementals(meta))?)
    .bind(json_opt(non_empty_extensions(meta))?)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    refstore::delete_qualifiers_for(conn, &[id]).await?;
    if let Some(qualifiers) = meta.qualifiers.as_deref()
        && !qualifiers.is_empty()
    {
        refstore::create_qualifiers(conn, id, qualifiers).await?;
    }
    Ok(())
}

/// Partial update of the header metadata of an element.
///
/// A column is written only when the request carries a value for it; supplied
/// aggregates replace their predecessor, absent ones survive.
///
/// # Errors
///
/// Database failures surface as [`crate::RepoError::Internal`].
pub(crate) async fn update_patch(
    conn: &mut PgConnection,
    id: i64,
    element: &SubmodelElement
) -> Result<()> {
    let meta = element.meta();
    let old = fetch_aggregates(conn, id).await?;

    if let Some(id_short) = &meta.id_short {
        sqlx::query("UPDATE submodel_element SET id_short = $1 WHERE id = $2")
            .bind(id_short)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    if let Some(category) = &meta.category {
        sqlx::query("UPDATE submodel_element SET category = $1 WHERE id = $2")
            .bind(category)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    if let Some(semantic_id) = meta.semantic_id.as_ref() {
        if let Some(old_reference) = old.semantic_id {
            refstore::delete_reference(conn, old_reference).await?;
        }
        let new_id = refstore::create_reference(conn, Some(semantic_id)).await?;
        sqlx::query("UPDATE submodel_element SET semantic_id = $1 WHERE id = $2")
            .bind(new_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    if let Some(description) = meta.description.as_deref() {
        if let Some(old_description) = old.description_id {
            refstore::delete_lang_strings(conn, LangStringKind::Text, &[old_description]).await?;
        }
        let new_id =
            refstore::create_lang_strings(conn, LangStringKind::Text, Some(description)).await?;
        sqlx::query("UPDATE submodel_element SET description_id = $1 WHERE id = $2")
            .bind(new_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    if let Some(display_name) = meta.display_name.as_deref() {
        if let Some(old_displayname) = old.displayname_id {
            refstore::delete_lang_strings(conn, LangStringKind::Name, &[old_displayname]).await?;
        }
        let new_id =
            refstore::create_lang_strings(conn, LangStringKind::Name, Some(display_name)).await?;
        sqlx::query("UPDATE submodel_element SET displayname_id = $1 WHERE id = $2")
            .bind(new_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    if meta.embedded_data_specifications.is_some() {
        sqlx::query("UPDATE submodel_element SET embedded_data_specification = $1 WHERE id = $2")
            .bind(json_opt(non_empty_specs(meta))?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    if meta.supplemental_semantic_ids.is_some() {
        sqlx::query("UPDATE submodel_element SET supplemental_semantic_ids = $1 WHERE id = $2")
            .bind(json_opt(non_empty_supplementals(meta))?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    if meta.extensions.is_some() {
        sqlx::query("UPDATE submodel_element SET extensions = $1 WHERE id = $2")
            .bind(json_opt(non_empty_extensions(meta))?)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    if let Some(qualifiers) = meta.qualifiers.as_deref() {
        refstore::delete_qualifiers_for(conn, &[id]).await?;
        if !qualifiers.is_empty() {
            refstore::create_qualifiers(conn, id, qualifiers).await?;
        }
    }
    Ok(())
}

/// Empty inline aggregates are stored as null so the get path reads them as
/// absent.
fn non_empty_specs(meta: &ElementMeta) -> Option<&Vec<submodel_core::EmbeddedDataSpecification>> {
    meta.embedded_data_specifications
        .as_ref()
        .filter(|v| !v.is_empty())
}

fn non_empty_supplementals(meta: &ElementMeta) -> Option<&Vec<submodel_core::Reference>> {
    meta.supplemental_semantic_ids
        .as_ref()
        .filter(|v| !v.is_empty())
}

fn non_empty_extensions(meta: &ElementMeta) -> Option<&Vec<submodel_core::Extension>> {
    meta.extensions.as_ref().filter(|v| !v.is_empty())
}
