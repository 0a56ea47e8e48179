// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Bulk insert of element forests.
//!
//! The fast path inserts a forest of elements and all their descendants in
//! O(tree depth) database round trips: per level, three bulk aggregate
//! inserts, one header insert with `RETURNING id`, one root fix-up, one bulk
//! insert per touched side table, then one recursion per container child set.
//! Qualifiers are written in a loop — their rows are small and rare enough
//! that batching buys nothing measurable.
//!
//! The whole path runs in the caller's transaction and tolerates empty input.

use std::collections::{HashMap, HashSet};

use futures::future::BoxFuture;
use sqlx::{PgConnection, QueryBuilder};
use submodel_core::{ModelType, SubmodelElement};

use crate::{
    element::handler,
    error::{RepoError, Result},
    path,
    refstore::{self, json_opt}
};

/// Placement context for one level of the forest.
#[derive(Debug, Clone)]
pub(crate) struct BatchCtx {
    /// Owning submodel.
    pub submodel_id: i64,
    /// Parent element; `None` inserts at the top level.
    pub parent_sme_id: Option<i64>,
    /// Path of the parent; empty at the top level.
    pub parent_path: String,
    /// Root of the subtree being extended; `None` when the level elements
    /// are themselves roots (their `root_sme_id` becomes their own id).
    pub root_sme_id: Option<i64>,
    /// Whether the parent is a `SubmodelElementList`.
    pub is_list: bool,
    /// Position of the first element of this level.
    pub start_position: i32
}

impl BatchCtx {
    /// Context for inserting top-level elements of a submodel.
    pub fn top_level(submodel_id: i64, start_position: i32) -> Self {
        Self {
            submodel_id,
            parent_sme_id: None,
            parent_path: String::new(),
            root_sme_id: None,
            is_list: false,
            start_position
        }
    }
}

/// Insert a forest of elements and all descendants.
///
/// Returns the header ids of the level elements in input order.
///
/// # Errors
///
/// - [`RepoError::BadRequest`] on missing/invalid idShorts and oversized
///   blobs;
/// - [`RepoError::Conflict`] on duplicate sibling idShorts (in-level
///   duplicates are caught eagerly, races by the unique path constraint);
/// - [`RepoError::Internal`] on database failures.
pub(crate) fn insert_forest<'a>(
    conn: &'a mut PgConnection,
    elements: &'a [SubmodelElement],
    ctx: BatchCtx
) -> BoxFuture<'a, Result<Vec<i64>>> {
    Box::pin(async move {
        if elements.is_empty() {
            return Ok(Vec::new());
        }

        let placements = place(elements, &ctx)?;

        // Shared aggregates, one bulk insert per kind.
        let semantic_ids = refstore::create_references_bulk(
            conn,
            &elements
                .iter()
                .map(|e| e.meta().semantic_id.as_ref())
                .collect::<Vec<_>>()
        )
        .await?;
        let description_ids = refstore::create_lang_strings_bulk(
            conn,
            submodel_core::LangStringKind::Text,
            &elements
                .iter()
                .map(|e| e.meta().description.as_deref())
                .collect::<Vec<_>>()
        )
        .await?;
        let displayname_ids = refstore::create_lang_strings_bulk(
            conn,
            submodel_core::LangStringKind::Name,
            &elements
                .iter()
                .map(|e| e.meta().display_name.as_deref())
                .collect::<Vec<_>>()
        )
        .await?;

        // Inline JSON aggregates, serialized up front (empty stores as null).
        let mut inline_json = Vec::with_capacity(elements.len());
        for element in elements {
            let meta = element.meta();
            inline_json.push((
                json_opt(
                    meta.embedded_data_specifications
                        .as_ref()
                        .filter(|v| !v.is_empty())
                )?,
                json_opt(
                    meta.supplemental_semantic_ids
                        .as_ref()
                        .filter(|v| !v.is_empty())
                )?,
                json_opt(meta.extensions.as_ref().filter(|v| !v.is_empty()))?,
            ));
        }

        // One header insert for the whole level, ids captured in input order.
        let mut insert = QueryBuilder::new(
            "INSERT INTO submodel_element \
             (submodel_id, parent_sme_id, root_sme_id, position, id_short, id_short_path, \
              category, model_type, semantic_id, description_id, displayname_id, \
              embedded_data_specification, supplemental_semantic_ids, extensions) "
        );
        insert.push_values(
            elements.iter().zip(placements.iter()).enumerate(),
            |mut row, (i, (element, placement))| {
                let meta = element.meta();
                let (specs, supplementals, extensions) = &inline_json[i];
                row.push_bind(ctx.submodel_id)
                    .push_bind(ctx.parent_sme_id)
                    .push_bind(ctx.root_sme_id)
                    .push_bind(placement.position)
                    .push_bind(meta.id_short.clone())
                    .push_bind(placement.path.clone())
                    .push_bind(meta.category.clone())
                    .push_bind(element.model_type().as_str())
                    .push_bind(semantic_ids[i])
                    .push_bind(description_ids[i])
                    .push_bind(displayname_ids[i])
                    .push_bind(specs.clone())
                    .push_bind(supplementals.clone())
                    .push_bind(extensions.clone());
            }
        );
        insert.push(" RETURNING id");
        let ids: Vec<i64> = insert.build_query_scalar().fetch_all(&mut *conn).await?;

        // Level elements without an inherited root are roots themselves.
        if ctx.root_sme_id.is_none() {
            sqlx::query("UPDATE submodel_element SET root_sme_id = id WHERE id = ANY($1)")
                .bind(&ids)
                .execute(&mut *conn)
                .await?;
        }

        // Side tables, grouped by kind, one bulk insert per table.
        let mut by_kind: HashMap<ModelType, Vec<(i64, &SubmodelElement)>> = HashMap::new();
        for (element, id) in elements.iter().zip(&ids) {
            by_kind
                .entry(element.model_type())
                .or_default()
                .push((*id, element));
        }
        for (model_type, rows) in &by_kind {
            handler(*model_type).bulk_insert(conn, rows).await?;
        }

        // Qualifiers, plain loop.
        for (element, id) in elements.iter().zip(&ids) {
            if let Some(qualifiers) = element.meta().qualifiers.as_deref()
                && !qualifiers.is_empty()
            {
                refstore::create_qualifiers(conn, *id, qualifiers).await?;
            }
        }

        // Recurse into container children, one level deeper.
        for ((element, id), placement) in elements.iter().zip(&ids).zip(&placements) {
            let Some(children) = element.children() else {
                continue;
            };
            let root = ctx.root_sme_id.unwrap_or(*id);
            let child_ctx = BatchCtx {
                submodel_id: ctx.submodel_id,
                parent_sme_id: Some(*id),
                parent_path: placement.path.clone(),
                root_sme_id: Some(root),
                is_list: element.model_type() == ModelType::SubmodelElementList,
                start_position: 0
            };
            insert_forest(conn, children, child_ctx).await?;
        }

        Ok(ids)
    })
}

#[derive(Debug)]
struct Placement {
    position: i32,
    path: String
}

/// Compute position and path for each level element, validating idShorts and
/// in-level uniqueness.
fn place(elements: &[SubmodelElement], ctx: &BatchCtx) -> Result<Vec<Placement>> {
    let mut seen = HashSet::new();
    let mut placements = Vec::with_capacity(elements.len());

    for (i, element) in elements.iter().enumerate() {
        let position = ctx.start_position
            + i32::try_from(i).map_err(|_| RepoError::bad_request("too many elements"))?;

        if let Some(id_short) = element.id_short() {
            path::validate_id_short(id_short)?;
            if !seen.insert(id_short.to_owned()) {
                return Err(RepoError::conflict(format!(
                    "duplicate sibling idShort {id_short:?}"
                )));
            }
        }

        let path = if ctx.is_list {
            let index = u32::try_from(position)
                .map_err(|_| RepoError::bad_request("negative list position"))?;
            path::indexed(&ctx.parent_path, index)
        } else {
            let id_short = element.id_short().ok_or_else(|| {
                RepoError::bad_request("idShort is required outside of a SubmodelElementList")
            })?;
            path::extend(&ctx.parent_path, id_short)
        };

        placements.push(Placement {
            position,
            path
        });
    }
    Ok(placements)
}

/// Replace the header metadata and children of an existing container element
/// with fresh state, reusing the fast path for the new children. PUT-replace
/// of containers routes through here after the old subtree is gone.
///
/// # Errors
///
/// Same as [`insert_forest`].
pub(crate) async fn insert_children(
    conn: &mut PgConnection,
    submodel_id: i64,
    parent: &crate::element::ElementRef,
    children: &[SubmodelElement]
) -> Result<Vec<i64>> {
    let ctx = BatchCtx {
        submodel_id,
        parent_sme_id: Some(parent.id),
        parent_path: parent.id_short_path.clone(),
        root_sme_id: Some(parent.root_sme_id),
        is_list: parent.model_type == ModelType::SubmodelElementList,
        start_position: 0
    };
    insert_forest(conn, children, ctx).await
}

#[cfg(test)]
mod tests {
    use submodel_core::{ElementMeta, Property};

    use super::*;

    fn property(id_short: &str) -> SubmodelElement {
        SubmodelElement::Property(Property {
            meta: ElementMeta::named(id_short),
            value_type: Some("xs:string".into()),
            value: None,
            value_id: None
        })
    }

    fn unnamed_property() -> SubmodelElement {
        SubmodelElement::Property(Property::default())
    }

    #[test]
    fn placement_uses_id_short_for_named_parents() {
        let ctx = BatchCtx {
            submodel_id: 1,
            parent_sme_id: Some(7),
            parent_path: "coll".into(),
            root_sme_id: Some(3),
            is_list: false,
            start_position: 0
        };
        let placements = place(&[property("a"), property("b")], &ctx).unwrap();
        assert_eq!(placements[0].path, "coll.a");
        assert_eq!(placements[0].position, 0);
        assert_eq!(placements[1].path, "coll.b");
        assert_eq!(placements[1].position, 1);
    }

    #[test]
    fn placement_uses_index_for_list_parents() {
        let ctx = BatchCtx {
            submodel_id: 1,
            parent_sme_id: Some(7),
            parent_path: "L".into(),
            root_sme_id: Some(3),
            is_list: true,
            start_position: 2
        };
        let placements = place(&[unnamed_property(), unnamed_property()], &ctx).unwrap();
        assert_eq!(placements[0].path, "L[2]");
        assert_eq!(placements[0].position, 2);
        assert_eq!(placements[1].path, "L[3]");
        assert_eq!(placements[1].position, 3);
    }

    #[test]
    fn top_level_placement_uses_bare_id_short() {
        let ctx = BatchCtx::top_level(1, 0);
        let placements = place(&[property("root")], &ctx).unwrap();
        assert_eq!(placements[0].path, "root");
    }

    #[test]
    fn missing_id_short_outside_lists_is_rejected() {
        let ctx = BatchCtx::top_level(1, 0);
        let err = place(&[unnamed_property()], &ctx).unwrap_err();
        assert!(err.is_bad_request());
    }

    #[test]
    fn in_level_duplicates_are_rejected() {
        let ctx = BatchCtx::top_level(1, 0);
        let err = place(&[property("dup"), property("dup")], &ctx).unwrap_err();
        assert!(err.is_conflict());
    }
}
