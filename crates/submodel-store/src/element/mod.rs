// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Per-kind element persistence.
//!
//! Every element writes one row into the polymorphic header table plus one
//! row into its kind's narrow side table. The polymorphism surface is the
//! [`KindHandler`] trait — a closed registry indexed by [`ModelType`] — whose
//! capability set is {insert, bulk insert, PUT update, PATCH update,
//! value-only update, row reconstruction}. New kinds are added by extending
//! the registry in [`handler`].
//!
//! Submodule map:
//!
//! - [`batch`] — the O(depth) bulk-insert fast path for whole subtrees
//! - [`header`] — header-table writes shared by all kinds
//! - [`value_update`] — the value-only verb, descending through containers
//! - [`kind`] — the fourteen handlers

use async_trait::async_trait;
use sqlx::{PgConnection, Row, postgres::PgRow};
use submodel_core::{ElementValue, ModelType, SubmodelElement};

use crate::{
    error::{RepoError, Result},
    path, refstore
};

pub mod batch;
pub mod header;
pub mod kind;
pub mod value_update;

/// Downcast a polymorphic element to one concrete kind.
///
/// A mismatch is a caller error ([`RepoError::BadRequest`]), not a bug: the
/// coordinator hands elements through untyped from deserialization.
macro_rules! expect_kind {
    ($element:expr, $kind:ident) => {
        match $element {
            submodel_core::SubmodelElement::$kind(inner) => Ok(inner),
            other => Err($crate::error::RepoError::bad_request(format!(
                "expected {}, got {}",
                stringify!($kind),
                other.model_type().as_str()
            )))
        }
    };
}
pub(crate) use expect_kind;

/// Capability set every element kind implements.
#[async_trait]
pub(crate) trait KindHandler: Send + Sync {
    /// Which kind this handler serves.
    fn model_type(&self) -> ModelType;

    /// Side table of the kind.
    fn table(&self) -> &'static str;

    /// Insert the kind-specific side row for one element.
    async fn insert(&self, conn: &mut PgConnection, id: i64, element: &SubmodelElement)
    -> Result<()>;

    /// Insert side rows for a whole batch in one statement per table.
    async fn bulk_insert(
        &self,
        conn: &mut PgConnection,
        rows: &[(i64, &SubmodelElement)]
    ) -> Result<()>;

    /// Total replacement of the side row: unsupplied fields become null.
    async fn update_put(
        &self,
        conn: &mut PgConnection,
        id: i64,
        element: &SubmodelElement
    ) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table()))
            .bind(id)
            .execute(&mut *conn)
            .await?;
        self.insert(conn, id, element).await
    }

    /// Partial update: only fields the request carries are written.
    async fn update_patch(
        &self,
        conn: &mut PgConnection,
        id: i64,
        element: &SubmodelElement
    ) -> Result<()>;

    /// Mutate only the value columns, leaving metadata untouched.
    async fn apply_value(
        &self,
        conn: &mut PgConnection,
        id: i64,
        value: &ElementValue
    ) -> Result<()>;

    /// Rebuild the kind-specific part of an element from a joined row.
    ///
    /// Shared metadata and container children are attached by the tree
    /// assembler afterwards.
    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement>;
}

/// Resolve the handler for a kind.
pub(crate) fn handler(model_type: ModelType) -> &'static dyn KindHandler {
    match model_type {
        ModelType::Property => &kind::property::PropertyHandler,
        ModelType::MultiLanguageProperty => &kind::multilanguage::MultiLanguageHandler,
        ModelType::Range => &kind::range::RangeHandler,
        ModelType::File => &kind::file::FileHandler,
        ModelType::Blob => &kind::file::BlobHandler,
        ModelType::ReferenceElement => &kind::reference_element::ReferenceElementHandler,
        ModelType::RelationshipElement => &kind::relationship::RelationshipHandler,
        ModelType::AnnotatedRelationshipElement => {
            &kind::relationship::AnnotatedRelationshipHandler
        }
        ModelType::Capability => &kind::capability::CapabilityHandler,
        ModelType::BasicEventElement => &kind::event::BasicEventHandler,
        ModelType::Entity => &kind::entity::EntityHandler,
        ModelType::Operation => &kind::operation::OperationHandler,
        ModelType::SubmodelElementCollection => &kind::collection::CollectionHandler,
        ModelType::SubmodelElementList => &kind::collection::ListHandler
    }
}

/// Parse a `model_type` column value.
pub(crate) fn model_type_of(tag: &str) -> Result<ModelType> {
    ModelType::parse(tag).ok_or_else(|| {
        RepoError::internal(std::io::Error::other(format!(
            "unknown model_type {tag:?} in database"
        )))
    })
}

/// Resolved identity of one persisted element.
#[derive(Debug, Clone)]
pub(crate) struct ElementRef {
    /// Internal id.
    pub id: i64,
    /// Owning submodel's internal id.
    pub submodel_id: i64,
    /// Parent element, `None` for top-level.
    pub parent_sme_id: Option<i64>,
    /// Root of the owning subtree.
    pub root_sme_id: i64,
    /// Position among siblings.
    pub position: Option<i32>,
    /// Short identifier.
    pub id_short: Option<String>,
    /// Full path from the submodel root.
    pub id_short_path: String,
    /// Concrete kind.
    pub model_type: ModelType
}

/// Resolve an element by `(submodel_id, idShortPath)`.
///
/// # Errors
///
/// [`RepoError::NotFound`] when no such element exists.
pub(crate) async fn resolve(
    conn: &mut PgConnection,
    submodel_id: i64,
    id_short_path: &str
) -> Result<ElementRef> {
    let row = sqlx::query(
        "SELECT id, submodel_id, parent_sme_id, root_sme_id, position, id_short, \
                id_short_path, model_type \
         FROM submodel_element WHERE submodel_id = $1 AND id_short_path = $2"
    )
    .bind(submodel_id)
    .bind(id_short_path)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| RepoError::not_found(format!("element {id_short_path:?} not found")))?;

    let tag: String = row.try_get("model_type")?;
    Ok(ElementRef {
        id: row.try_get("id")?,
        submodel_id: row.try_get("submodel_id")?,
        parent_sme_id: row.try_get("parent_sme_id")?,
        root_sme_id: row.try_get("root_sme_id")?,
        position: row.try_get("position")?,
        id_short: row.try_get("id_short")?,
        id_short_path: row.try_get("id_short_path")?,
        model_type: model_type_of(&tag)?
    })
}

/// Fail with [`RepoError::Conflict`] when a sibling with the same idShort
/// already exists under the given parent. Duplicates are rejected in named
/// containers and in lists alike.
pub(crate) async fn assert_id_short_free(
    conn: &mut PgConnection,
    submodel_id: i64,
    parent_sme_id: Option<i64>,
    id_short: &str
) -> Result<()> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM submodel_element \
         WHERE submodel_id = $1 AND parent_sme_id IS NOT DISTINCT FROM $2 AND id_short = $3)"
    )
    .bind(submodel_id)
    .bind(parent_sme_id)
    .bind(id_short)
    .fetch_one(conn)
    .await?;

    if taken {
        return Err(RepoError::conflict(format!(
            "an element with idShort {id_short:?} already exists at this level"
        )));
    }
    Ok(())
}

/// Ids and shared-aggregate ids of a subtree, gathered before deletion.
struct SubtreeIds {
    element_ids: Vec<i64>,
    reference_ids: Vec<i64>,
    description_ids: Vec<i64>,
    displayname_ids: Vec<i64>,
    attachment_oids: Vec<i64>
}

async fn collect_subtree(
    conn: &mut PgConnection,
    submodel_id: i64,
    where_clause: &str,
    params: &[String]
) -> Result<SubtreeIds> {
    let sql = format!(
        "SELECT id, semantic_id, description_id, displayname_id \
         FROM submodel_element WHERE submodel_id = $1 AND {where_clause}"
    );
    let mut query = sqlx::query(&sql).bind(submodel_id);
    for param in params {
        query = query.bind(param);
    }
    let rows = query.fetch_all(&mut *conn).await?;

    let mut ids = SubtreeIds {
        element_ids: Vec::with_capacity(rows.len()),
        reference_ids: Vec::new(),
        description_ids: Vec::new(),
        displayname_ids: Vec::new(),
        attachment_oids: Vec::new()
    };
    for row in rows {
        ids.element_ids.push(row.try_get("id")?);
        if let Some(reference_id) = row.try_get::<Option<i64>, _>("semantic_id")? {
            ids.reference_ids.push(reference_id);
        }
        if let Some(description_id) = row.try_get::<Option<i64>, _>("description_id")? {
            ids.description_ids.push(description_id);
        }
        if let Some(displayname_id) = row.try_get::<Option<i64>, _>("displayname_id")? {
            ids.displayname_ids.push(displayname_id);
        }
    }

    if !ids.element_ids.is_empty() {
        ids.attachment_oids =
            sqlx::query_scalar("SELECT file_oid FROM file_data WHERE id = ANY($1)")
                .bind(&ids.element_ids)
                .fetch_all(conn)
                .await?;
    }
    Ok(ids)
}

async fn delete_collected(conn: &mut PgConnection, ids: SubtreeIds) -> Result<u64> {
    if ids.element_ids.is_empty() {
        return Ok(0);
    }

    refstore::delete_qualifiers_for(conn, &ids.element_ids).await?;
    for oid in &ids.attachment_oids {
        sqlx::query("SELECT lo_unlink($1::oid)")
            .bind(oid)
            .execute(&mut *conn)
            .await?;
    }

    let affected = sqlx::query("DELETE FROM submodel_element WHERE id = ANY($1)")
        .bind(&ids.element_ids)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    refstore::delete_references(conn, &ids.reference_ids).await?;
    refstore::delete_lang_strings(conn, submodel_core::LangStringKind::Text, &ids.description_ids)
        .await?;
    refstore::delete_lang_strings(conn, submodel_core::LangStringKind::Name, &ids.displayname_ids)
        .await?;

    Ok(affected)
}

/// Delete an element and its entire subtree, matched by the path predicate.
/// Side tables, the attachment sidecar and the qualifier junction cascade;
/// shared aggregates and large objects are reclaimed explicitly. Returns the
/// number of removed elements.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub(crate) async fn delete_subtree(
    conn: &mut PgConnection,
    submodel_id: i64,
    id_short_path: &str
) -> Result<u64> {
    let where_clause = path::subtree_where("id_short_path", 2);
    let params = path::subtree_params(id_short_path);
    let ids = collect_subtree(conn, submodel_id, &where_clause, &params).await?;
    delete_collected(conn, ids).await
}

/// Delete only the descendants of a container, keeping the element itself.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub(crate) async fn delete_children(
    conn: &mut PgConnection,
    submodel_id: i64,
    id_short_path: &str
) -> Result<u64> {
    let where_clause =
        "(id_short_path LIKE $2 ESCAPE '\\' OR id_short_path LIKE $3 ESCAPE '\\')".to_owned();
    let [_, dot, bracket] = path::subtree_params(id_short_path);
    let ids = collect_subtree(conn, submodel_id, &where_clause, &[dot, bracket]).await?;
    delete_collected(conn, ids).await
}

/// Delete every element of a submodel (used by PUT-replace of a submodel).
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub(crate) async fn delete_all_elements(conn: &mut PgConnection, submodel_id: i64) -> Result<u64> {
    let ids = collect_subtree(conn, submodel_id, "TRUE", &[]).await?;
    delete_collected(conn, ids).await
}

/// Next free position among the children of a parent (or the top level when
/// `parent_sme_id` is `None`).
pub(crate) async fn next_position(
    conn: &mut PgConnection,
    submodel_id: i64,
    parent_sme_id: Option<i64>
) -> Result<i32> {
    let next: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM submodel_element \
         WHERE submodel_id = $1 AND parent_sme_id IS NOT DISTINCT FROM $2"
    )
    .bind(submodel_id)
    .bind(parent_sme_id)
    .fetch_one(conn)
    .await?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_kind() {
        for model_type in ModelType::ALL {
            assert_eq!(handler(model_type).model_type(), model_type);
        }
    }

    #[test]
    fn registry_tables_are_distinct() {
        let mut tables: Vec<&str> = ModelType::ALL
            .into_iter()
            .map(|mt| handler(mt).table())
            .collect();
        tables.sort_unstable();
        tables.dedup();
        // Fourteen kinds, fourteen side tables.
        assert_eq!(tables.len(), 14);
    }

    #[test]
    fn expect_kind_rejects_mismatches() {
        let element = SubmodelElement::Capability(submodel_core::Capability {
            meta: submodel_core::ElementMeta::named("cap")
        });
        let result: Result<&submodel_core::Property> = expect_kind!(&element, Property);
        assert!(result.unwrap_err().is_bad_request());
    }

    #[test]
    fn unknown_model_type_is_internal() {
        assert!(model_type_of("Gadget").unwrap_err().is_internal());
        assert_eq!(model_type_of("Property").unwrap(), ModelType::Property);
    }
}
