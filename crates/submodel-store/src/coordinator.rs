// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! The public contract of the persistence engine.
//!
//! [`SubmodelRepository`] owns the transaction boundaries and drives the
//! other components. Every write runs in a single transaction begun here;
//! helpers operate on the transaction's connection and never commit — if any
//! step errors, dropping the transaction rolls everything back. Concurrent
//! writes to the same submodel serialize on a row lock taken on the submodel
//! header; writes to different submodels interleave freely.
//!
//! Reads use pooled connections directly and fan out during tree hydration.

use futures::StreamExt;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use submodel_core::{ElementValue, ModelType, Submodel, SubmodelElement, element_value};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::{
    attachment::{self, AttachmentInfo},
    element::{self, batch, header, value_update},
    error::{RepoError, Result},
    path,
    query::{self, QueryExpr},
    refstore::{self, from_json_opt, json_opt},
    tree
};

/// A page of submodels plus the cursor naming the next one.
pub type SubmodelPage = (Vec<Submodel>, Option<String>);

/// A page of elements plus the cursor naming the next one.
pub type ElementPage = (Vec<SubmodelElement>, Option<String>);

/// A downloadable attachment: metadata plus a chunked byte stream.
pub struct Download {
    /// Content type and file name recorded at upload.
    pub info: AttachmentInfo,
    /// 8 KiB chunks; dropping the stream stops all database work.
    pub stream: futures::stream::BoxStream<'static, Result<Vec<u8>>>
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("info", &self.info)
            .field("stream", &"<stream>")
            .finish()
    }
}

/// Top-level repository API over a PostgreSQL pool.
#[derive(Clone)]
pub struct SubmodelRepository {
    pool: PgPool,
    cancel: CancellationToken
}

impl SubmodelRepository {
    /// Repository over an established pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cancel: CancellationToken::new()
        }
    }

    /// Repository whose operations observe the given cancellation token.
    ///
    /// Cancellation is cooperative: it is checked at operation entry and
    /// between attachment chunks; an in-flight transaction rolls back.
    #[must_use]
    pub fn with_cancellation(pool: PgPool, cancel: CancellationToken) -> Self {
        Self {
            pool,
            cancel
        }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn ensure_live(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RepoError::Cancelled);
        }
        Ok(())
    }

    /// List submodels, cursor-paginated over the identifier order.
    ///
    /// # Errors
    ///
    /// [`RepoError::Internal`] on database failures.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_submodels(
        &self,
        limit: Option<u32>,
        cursor: Option<&str>
    ) -> Result<SubmodelPage> {
        self.ensure_live()?;
        self.fetch_submodel_page(None, limit, cursor).await
    }

    /// List submodels matching a pre-parsed filter expression.
    ///
    /// # Errors
    ///
    /// [`RepoError::BadRequest`] when the query cannot be lowered;
    /// [`RepoError::Internal`] on database failures.
    #[tracing::instrument(skip(self, filter))]
    pub async fn query_submodels(
        &self,
        filter: &QueryExpr,
        limit: Option<u32>,
        cursor: Option<&str>
    ) -> Result<SubmodelPage> {
        self.ensure_live()?;
        self.fetch_submodel_page(Some(filter), limit, cursor).await
    }

    /// Fetch one submodel with its full element tree.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] for unknown identifiers.
    #[tracing::instrument(skip(self))]
    pub async fn get_submodel(&self, submodel_id: &str) -> Result<Submodel> {
        self.ensure_live()?;
        let (pk, mut submodel) = self.fetch_submodel_row(submodel_id).await?;
        let assembled =
            tree::load(&self.pool, pk, tree::Scope::All, &tree::Page::default()).await?;
        if !assembled.elements.is_empty() {
            submodel.submodel_elements = Some(assembled.elements);
        }
        Ok(submodel)
    }

    /// Fetch one submodel without its element trees.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] for unknown identifiers.
    #[tracing::instrument(skip(self))]
    pub async fn get_submodel_metadata(&self, submodel_id: &str) -> Result<Submodel> {
        self.ensure_live()?;
        let (_, submodel) = self.fetch_submodel_row(submodel_id).await?;
        Ok(submodel)
    }

    /// Value-only view of one submodel.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] for unknown identifiers.
    #[tracing::instrument(skip(self))]
    pub async fn get_submodel_value_only(&self, submodel_id: &str) -> Result<serde_json::Value> {
        let submodel = self.get_submodel(submodel_id).await?;
        Ok(submodel_core::submodel_value(&submodel))
    }

    /// Create or atomically replace a submodel. Returns whether a previous
    /// version existed.
    ///
    /// # Errors
    ///
    /// [`RepoError::Conflict`] when a concurrent creation wins the race;
    /// [`RepoError::BadRequest`] for malformed elements.
    #[tracing::instrument(skip(self, submodel), fields(submodel_id = %submodel.id))]
    pub async fn put_submodel(&self, submodel: &Submodel) -> Result<bool> {
        self.ensure_live()?;
        let mut tx = self.pool.begin().await?;

        let existing: Option<(i64, Option<i64>)> = sqlx::query_as(
            "SELECT id, semantic_id FROM submodel WHERE submodel_identifier = $1 FOR UPDATE"
        )
        .bind(&submodel.id)
        .fetch_optional(&mut *tx)
        .await?;
        let existed = existing.is_some();

        let pk = match existing {
            Some((pk, old_semantic)) => {
                element::delete_all_elements(&mut *tx, pk).await?;
                if let Some(reference_id) = old_semantic {
                    refstore::delete_reference(&mut *tx, reference_id).await?;
                }
                self.update_submodel_row(&mut *tx, pk, submodel).await?;
                pk
            }
            None => self.insert_submodel_row(&mut *tx, submodel).await?
        };

        batch::insert_forest(
            &mut *tx,
            submodel.elements(),
            batch::BatchCtx::top_level(pk, 0)
        )
        .await?;

        tx.commit().await?;
        tracing::debug!(existed, "submodel stored");
        Ok(existed)
    }

    /// Delete a submodel and its entire element tree.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] for unknown identifiers.
    #[tracing::instrument(skip(self))]
    pub async fn delete_submodel(&self, submodel_id: &str) -> Result<()> {
        self.ensure_live()?;
        let mut tx = self.pool.begin().await?;

        let (pk, semantic_id): (i64, Option<i64>) = sqlx::query_as(
            "SELECT id, semantic_id FROM submodel WHERE submodel_identifier = $1 FOR UPDATE"
        )
        .bind(submodel_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepoError::not_found(format!("submodel {submodel_id:?} not found")))?;

        element::delete_all_elements(&mut *tx, pk).await?;
        if let Some(reference_id) = semantic_id {
            refstore::delete_reference(&mut *tx, reference_id).await?;
        }
        sqlx::query("DELETE FROM submodel WHERE id = $1")
            .bind(pk)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Fetch one element (and its subtree) by path.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] when the submodel or path does not resolve.
    #[tracing::instrument(skip(self))]
    pub async fn get_submodel_element(
        &self,
        submodel_id: &str,
        id_short_path: &str
    ) -> Result<SubmodelElement> {
        self.ensure_live()?;
        path::parse(id_short_path)?;
        let pk = self.submodel_pk(submodel_id).await?;
        let mut assembled = tree::load(
            &self.pool,
            pk,
            tree::Scope::Subtree(id_short_path),
            &tree::Page::default()
        )
        .await?;
        assembled
            .elements
            .pop()
            .ok_or_else(|| RepoError::not_found(format!("element {id_short_path:?} not found")))
    }

    /// Value-only view of one element.
    ///
    /// # Errors
    ///
    /// [`RepoError::BadRequest`] for kinds without a value representation.
    #[tracing::instrument(skip(self))]
    pub async fn get_submodel_element_value_only(
        &self,
        submodel_id: &str,
        id_short_path: &str
    ) -> Result<serde_json::Value> {
        let element = self.get_submodel_element(submodel_id, id_short_path).await?;
        element_value(&element).map(|v| v.to_json()).ok_or_else(|| {
            RepoError::bad_request(format!(
                "{} has no value representation",
                element.model_type().as_str()
            ))
        })
    }

    /// List the top-level elements of a submodel, cursor-paginated.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] for unknown submodels.
    #[tracing::instrument(skip(self))]
    pub async fn get_submodel_elements(
        &self,
        submodel_id: &str,
        limit: Option<u32>,
        cursor: Option<&str>
    ) -> Result<ElementPage> {
        self.ensure_live()?;
        let pk = self.submodel_pk(submodel_id).await?;
        let page = tree::Page {
            limit,
            cursor: cursor.map(str::to_owned)
        };
        let assembled = tree::load(&self.pool, pk, tree::Scope::All, &page).await?;
        Ok((assembled.elements, assembled.next_cursor))
    }

    /// Add a top-level element (with its whole subtree).
    ///
    /// # Errors
    ///
    /// [`RepoError::Conflict`] when the idShort is taken at the top level;
    /// [`RepoError::BadRequest`] for missing or malformed idShorts.
    #[tracing::instrument(skip(self, element))]
    pub async fn add_submodel_element(
        &self,
        submodel_id: &str,
        element: &SubmodelElement
    ) -> Result<()> {
        self.ensure_live()?;
        let mut tx = self.pool.begin().await?;
        let pk = lock_submodel(&mut *tx, submodel_id).await?;

        let id_short = element
            .id_short()
            .ok_or_else(|| RepoError::bad_request("a top-level element requires an idShort"))?;
        path::validate_id_short(id_short)?;
        element::assert_id_short_free(&mut *tx, pk, None, id_short).await?;

        let position = element::next_position(&mut *tx, pk, None).await?;
        batch::insert_forest(
            &mut *tx,
            std::slice::from_ref(element),
            batch::BatchCtx::top_level(pk, position)
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Add an element under a container: at the next free index of a list,
    /// or at its named slot otherwise.
    ///
    /// # Errors
    ///
    /// [`RepoError::BadRequest`] when the parent is not a container;
    /// [`RepoError::NotFound`] when the parent does not resolve;
    /// [`RepoError::Conflict`] on duplicate sibling idShorts.
    #[tracing::instrument(skip(self, element))]
    pub async fn add_submodel_element_with_path(
        &self,
        submodel_id: &str,
        parent_path: &str,
        element: &SubmodelElement
    ) -> Result<()> {
        self.ensure_live()?;
        path::parse(parent_path)?;
        let mut tx = self.pool.begin().await?;
        let pk = lock_submodel(&mut *tx, submodel_id).await?;

        let parent = element::resolve(&mut *tx, pk, parent_path).await?;
        if !parent.model_type.is_container() {
            return Err(RepoError::bad_request(format!(
                "{} at {parent_path:?} cannot hold children",
                parent.model_type.as_str()
            )));
        }

        let is_list = parent.model_type == ModelType::SubmodelElementList;
        if let Some(id_short) = element.id_short() {
            path::validate_id_short(id_short)?;
            element::assert_id_short_free(&mut *tx, pk, Some(parent.id), id_short).await?;
        } else if !is_list {
            return Err(RepoError::bad_request(
                "an element outside of a SubmodelElementList requires an idShort"
            ));
        }

        let position = element::next_position(&mut *tx, pk, Some(parent.id)).await?;
        let ctx = batch::BatchCtx {
            submodel_id: pk,
            parent_sme_id: Some(parent.id),
            parent_path: parent.id_short_path.clone(),
            root_sme_id: Some(parent.root_sme_id),
            is_list,
            start_position: position
        };
        batch::insert_forest(&mut *tx, std::slice::from_ref(element), ctx).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replace (PUT) or merge (PATCH) an element.
    ///
    /// PUT nulls every unsupplied field and replaces a container's whole
    /// child subtree; a changed idShort cascades a path rewrite over all
    /// descendants. PATCH writes only the supplied fields; a supplied child
    /// list replaces the children, an absent one preserves them.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] when the element does not resolve;
    /// [`RepoError::BadRequest`] on kind mismatches and malformed input.
    #[tracing::instrument(skip(self, element))]
    pub async fn update_submodel_element(
        &self,
        submodel_id: &str,
        id_short_path: &str,
        element: &SubmodelElement,
        is_put: bool
    ) -> Result<()> {
        self.ensure_live()?;
        path::parse(id_short_path)?;
        let mut tx = self.pool.begin().await?;
        let pk = lock_submodel(&mut *tx, submodel_id).await?;

        let target = element::resolve(&mut *tx, pk, id_short_path).await?;
        if target.model_type != element.model_type() {
            return Err(RepoError::bad_request(format!(
                "cannot change {} into {}",
                target.model_type.as_str(),
                element.model_type().as_str()
            )));
        }

        if is_put {
            // A PUT that omits the idShort of a named element would break the
            // path/idShort invariant; list members live by index and may drop
            // theirs.
            if !path::is_list_tail(&target.id_short_path) && element.id_short().is_none() {
                return Err(RepoError::bad_request(
                    "PUT of an element outside of a SubmodelElementList requires an idShort"
                ));
            }
            if target.model_type.is_container() {
                element::delete_children(&mut *tx, pk, &target.id_short_path).await?;
            }
            header::update_put(&mut *tx, target.id, element).await?;
            element::handler(target.model_type)
                .update_put(&mut *tx, target.id, element)
                .await?;
        } else {
            header::update_patch(&mut *tx, target.id, element).await?;
            element::handler(target.model_type)
                .update_patch(&mut *tx, target.id, element)
                .await?;
            if target.model_type.is_container()
                && element.children().is_some()
            {
                element::delete_children(&mut *tx, pk, &target.id_short_path).await?;
            }
        }

        // idShort changes rewrite the path of the element and every
        // descendant; list members keep their bracketed path regardless.
        let mut target = target;
        let renamed = element.meta().id_short.as_deref().is_some_and(|new| {
            target.id_short.as_deref() != Some(new)
        });
        if renamed && !path::is_list_tail(&target.id_short_path) {
            let new_id_short = element.id_short().ok_or_else(|| {
                RepoError::bad_request("an element outside of a SubmodelElementList requires an idShort")
            })?;
            path::validate_id_short(new_id_short)?;
            element::assert_id_short_free(&mut *tx, pk, target.parent_sme_id, new_id_short)
                .await?;

            let new_path = match path::parent(&target.id_short_path) {
                Some(parent_path) => path::extend(parent_path, new_id_short),
                None => new_id_short.to_owned()
            };
            path::rewrite_subtree_paths(&mut *tx, pk, &target.id_short_path, &new_path).await?;
            target.id_short_path = new_path;
        }

        // New children go in after any rename so their paths build on the
        // final parent path.
        if target.model_type.is_container()
            && let Some(children) = element.children()
        {
            batch::insert_children(&mut *tx, pk, &target, children).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete an element and its subtree; list siblings are renumbered.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] when the path does not resolve.
    #[tracing::instrument(skip(self))]
    pub async fn delete_submodel_element_by_path(
        &self,
        submodel_id: &str,
        id_short_path: &str
    ) -> Result<()> {
        self.ensure_live()?;
        path::parse(id_short_path)?;
        let mut tx = self.pool.begin().await?;
        let pk = lock_submodel(&mut *tx, submodel_id).await?;

        let target = element::resolve(&mut *tx, pk, id_short_path).await?;
        let affected = element::delete_subtree(&mut *tx, pk, &target.id_short_path).await?;
        if affected == 0 {
            return Err(RepoError::not_found(format!(
                "element {id_short_path:?} not found"
            )));
        }

        if let Some(deleted_index) = path::last_index(&target.id_short_path)
            && let (Some(parent_id), Some(parent_path)) =
                (target.parent_sme_id, path::parent(&target.id_short_path))
        {
            path::renumber_list_siblings(&mut *tx, pk, parent_id, parent_path, deleted_index)
                .await?;
        }

        tx.commit().await?;
        tracing::debug!(affected, "subtree deleted");
        Ok(())
    }

    /// Value-only update: mutate payload columns, preserve all metadata.
    /// Containers descend into per-child value-only updates.
    ///
    /// # Errors
    ///
    /// [`RepoError::BadRequest`] when the payload does not fit the element's
    /// kind; [`RepoError::NotFound`] for unresolved paths or children.
    #[tracing::instrument(skip(self, value))]
    pub async fn update_submodel_element_value_only(
        &self,
        submodel_id: &str,
        id_short_path: &str,
        value: &serde_json::Value
    ) -> Result<()> {
        self.ensure_live()?;
        path::parse(id_short_path)?;
        let mut tx = self.pool.begin().await?;
        let pk = lock_submodel(&mut *tx, submodel_id).await?;

        let target = element::resolve(&mut *tx, pk, id_short_path).await?;
        let parsed = ElementValue::from_json(target.model_type, value)?;
        value_update::apply(&mut *tx, &target, &parsed).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Stream an attachment into the File/Blob element at the path, swapping
    /// out any prior attachment atomically.
    ///
    /// Returns the number of stored bytes.
    ///
    /// # Errors
    ///
    /// [`RepoError::BadRequest`] when the target is not File/Blob or a Blob
    /// attachment exceeds 1 GiB; [`RepoError::Cancelled`] mid-stream leaves
    /// no observable state.
    #[tracing::instrument(skip(self, input))]
    pub async fn upload_attachment<R>(
        &self,
        submodel_id: &str,
        id_short_path: &str,
        file_name: &str,
        content_type: Option<&str>,
        input: R
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin + Send
    {
        self.ensure_live()?;
        path::parse(id_short_path)?;
        let mut tx = self.pool.begin().await?;
        let pk = lock_submodel(&mut *tx, submodel_id).await?;

        let target = element::resolve(&mut *tx, pk, id_short_path).await?;
        let (side_table, enforce_cap) = attachment_table(&target)?;

        let (oid, written) =
            attachment::write_object(&mut *tx, input, enforce_cap, &self.cancel).await?;
        let old = attachment::swap_pointer(&mut *tx, target.id, oid).await?;

        sqlx::query(&format!(
            "UPDATE {side_table} SET file_name = $1, value = $2 WHERE id = $3"
        ))
        .bind(file_name)
        .bind(oid.to_string())
        .bind(target.id)
        .execute(&mut *tx)
        .await?;
        if let Some(content_type) = content_type {
            sqlx::query(&format!(
                "UPDATE {side_table} SET content_type = $1 WHERE id = $2"
            ))
            .bind(content_type)
            .bind(target.id)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(old_oid) = old {
            attachment::unlink(&mut *tx, old_oid).await?;
        }

        tx.commit().await?;
        tracing::debug!(written, "attachment stored");
        Ok(written)
    }

    /// Open an attachment for download.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] when no attachment is stored at the path.
    #[tracing::instrument(skip(self))]
    pub async fn download_attachment(
        &self,
        submodel_id: &str,
        id_short_path: &str
    ) -> Result<Download> {
        self.ensure_live()?;
        path::parse(id_short_path)?;
        let mut conn = self.pool.acquire().await?;
        let pk = submodel_pk(&mut *conn, submodel_id).await?;

        let target = element::resolve(&mut *conn, pk, id_short_path).await?;
        let (side_table, _) = attachment_table(&target)?;
        let info = attachment::info(&mut *conn, target.id, side_table, id_short_path).await?;

        let stream =
            attachment::read_object(self.pool.clone(), info.oid, self.cancel.clone()).boxed();
        Ok(Download {
            info,
            stream
        })
    }

    /// Remove an attachment: unlink the large object, clear the pointer.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] when no attachment is stored at the path.
    #[tracing::instrument(skip(self))]
    pub async fn delete_attachment(
        &self,
        submodel_id: &str,
        id_short_path: &str
    ) -> Result<()> {
        self.ensure_live()?;
        path::parse(id_short_path)?;
        let mut tx = self.pool.begin().await?;
        let pk = lock_submodel(&mut *tx, submodel_id).await?;

        let target = element::resolve(&mut *tx, pk, id_short_path).await?;
        let (side_table, _) = attachment_table(&target)?;
        let info = attachment::info(&mut *tx, target.id, side_table, id_short_path).await?;

        attachment::unlink(&mut *tx, info.oid).await?;
        sqlx::query("DELETE FROM file_data WHERE id = $1")
            .bind(target.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "UPDATE {side_table} SET value = NULL, file_name = NULL WHERE id = $1"
        ))
        .bind(target.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn submodel_pk(&self, submodel_id: &str) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        submodel_pk(&mut *conn, submodel_id).await
    }

    async fn fetch_submodel_row(&self, submodel_id: &str) -> Result<(i64, Submodel)> {
        let row = sqlx::query(&format!(
            "SELECT {SUBMODEL_COLUMNS} FROM submodel s WHERE s.submodel_identifier = $1"
        ))
        .bind(submodel_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::not_found(format!("submodel {submodel_id:?} not found")))?;

        let (pk, semantic_ref, mut submodel) = submodel_from_row(&row)?;
        if let Some(reference_id) = semantic_ref {
            let mut conn = self.pool.acquire().await?;
            submodel.semantic_id = refstore::references_by_ids(&mut *conn, &[reference_id])
                .await?
                .remove(&reference_id);
        }
        Ok((pk, submodel))
    }

    async fn fetch_submodel_page(
        &self,
        filter: Option<&QueryExpr>,
        limit: Option<u32>,
        cursor: Option<&str>
    ) -> Result<SubmodelPage> {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<String> = Vec::new();
        if let Some(filter) = filter {
            let lowered = query::lower(filter, 1)?;
            conditions.push(lowered.sql);
            params = lowered.params;
        }
        if let Some(cursor) = cursor {
            conditions.push(format!("s.submodel_identifier >= ${}", params.len() + 1));
            params.push(cursor.to_owned());
        }

        let mut sql = format!("SELECT {SUBMODEL_COLUMNS} FROM submodel s");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY s.submodel_identifier");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", u64::from(limit) + 1));
        }

        let mut fetch = sqlx::query(&sql);
        for param in &params {
            fetch = fetch.bind(param);
        }
        let rows = fetch.fetch_all(&self.pool).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(submodel_from_row(row)?);
        }

        let mut next_cursor = None;
        if let Some(limit) = limit {
            let limit = limit as usize;
            if entries.len() > limit {
                next_cursor = Some(entries[limit].2.id.clone());
                entries.truncate(limit);
            }
        }

        // Hydrate submodel-level semantic ids in one lookup.
        let reference_ids: Vec<i64> = entries.iter().filter_map(|(_, r, _)| *r).collect();
        let references = {
            let mut conn = self.pool.acquire().await?;
            refstore::references_by_ids(&mut *conn, &reference_ids).await?
        };

        // One query for all element rows of the page, hydrated together,
        // assembled per submodel.
        let pks: Vec<i64> = entries.iter().map(|(pk, _, _)| *pk).collect();
        let mut nodes = tree::fetch_forest(&self.pool, &pks).await?;
        tree::hydrate(&self.pool, &mut nodes).await?;

        let mut grouped: std::collections::HashMap<i64, Vec<tree::Node>> =
            std::collections::HashMap::new();
        for node in nodes {
            grouped.entry(node.submodel_id).or_default().push(node);
        }

        let mut submodels = Vec::with_capacity(entries.len());
        for (pk, semantic_ref, mut submodel) in entries {
            if let Some(reference_id) = semantic_ref {
                submodel.semantic_id = references.get(&reference_id).cloned();
            }
            if let Some(nodes) = grouped.remove(&pk) {
                let assembled = tree::assemble(nodes, None, &tree::Page::default())?;
                if !assembled.elements.is_empty() {
                    submodel.submodel_elements = Some(assembled.elements);
                }
            }
            submodels.push(submodel);
        }

        Ok((submodels, next_cursor))
    }

    async fn insert_submodel_row(
        &self,
        conn: &mut PgConnection,
        submodel: &Submodel
    ) -> Result<i64> {
        let semantic_id =
            refstore::create_reference(conn, submodel.semantic_id.as_ref()).await?;
        let pk: i64 = sqlx::query_scalar(
            "INSERT INTO submodel \
             (submodel_identifier, id_short, category, kind, semantic_id, administration, \
              qualifiers, description, display_name, supplemental_semantic_ids, extensions, \
              embedded_data_specifications) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id"
        )
        .bind(&submodel.id)
        .bind(&submodel.id_short)
        .bind(&submodel.category)
        .bind(&submodel.kind)
        .bind(semantic_id)
        .bind(json_opt(submodel.administration.as_ref())?)
        .bind(json_opt(submodel.qualifiers.as_ref().filter(|v| !v.is_empty()))?)
        .bind(json_opt(submodel.description.as_ref().filter(|v| !v.is_empty()))?)
        .bind(json_opt(submodel.display_name.as_ref().filter(|v| !v.is_empty()))?)
        .bind(json_opt(
            submodel
                .supplemental_semantic_ids
                .as_ref()
                .filter(|v| !v.is_empty())
        )?)
        .bind(json_opt(submodel.extensions.as_ref().filter(|v| !v.is_empty()))?)
        .bind(json_opt(
            submodel
                .embedded_data_specifications
                .as_ref()
                .filter(|v| !v.is_empty())
        )?)
        .fetch_one(conn)
        .await?;
        Ok(pk)
    }

    async fn update_submodel_row(
        &self,
        conn: &mut PgConnection,
        pk: i64,
        submodel: &Submodel
    ) -> Result<()> {
        let semantic_id =
            refstore::create_reference(conn, submodel.semantic_id.as_ref()).await?;
        sqlx::query(
            "UPDATE submodel SET id_short = $1, category = $2, kind = $3, semantic_id = $4, \
             administration = $5, qualifiers = $6, description = $7, display_name = $8, \
             supplemental_semantic_ids = $9, extensions = $10, \
             embedded_data_specifications = $11 \
             WHERE id = $12"
        )
        .bind(&submodel.id_short)
        .bind(&submodel.category)
        .bind(&submodel.kind)
        .bind(semantic_id)
        .bind(json_opt(submodel.administration.as_ref())?)
        .bind(json_opt(submodel.qualifiers.as_ref().filter(|v| !v.is_empty()))?)
        .bind(json_opt(submodel.description.as_ref().filter(|v| !v.is_empty()))?)
        .bind(json_opt(submodel.display_name.as_ref().filter(|v| !v.is_empty()))?)
        .bind(json_opt(
            submodel
                .supplemental_semantic_ids
                .as_ref()
                .filter(|v| !v.is_empty())
        )?)
        .bind(json_opt(submodel.extensions.as_ref().filter(|v| !v.is_empty()))?)
        .bind(json_opt(
            submodel
                .embedded_data_specifications
                .as_ref()
                .filter(|v| !v.is_empty())
        )?)
        .bind(pk)
        .execute(conn)
        .await?;
        Ok(())
    }
}

const SUBMODEL_COLUMNS: &str = "\
    s.id, s.submodel_identifier, s.id_short, s.category, s.kind, s.semantic_id, \
    s.administration, s.qualifiers, s.description, s.display_name, \
    s.supplemental_semantic_ids, s.extensions, s.embedded_data_specifications";

fn submodel_from_row(row: &PgRow) -> Result<(i64, Option<i64>, Submodel)> {
    let mut submodel = Submodel::new(row.try_get::<String, _>("submodel_identifier")?);
    submodel.id_short = row.try_get("id_short")?;
    submodel.category = row.try_get("category")?;
    submodel.kind = row.try_get("kind")?;
    submodel.administration = from_json_opt(row.try_get("administration")?)?;
    submodel.qualifiers = from_json_opt(row.try_get("qualifiers")?)?;
    submodel.description = from_json_opt(row.try_get("description")?)?;
    submodel.display_name = from_json_opt(row.try_get("display_name")?)?;
    submodel.supplemental_semantic_ids =
        from_json_opt(row.try_get("supplemental_semantic_ids")?)?;
    submodel.extensions = from_json_opt(row.try_get("extensions")?)?;
    submodel.embedded_data_specifications =
        from_json_opt(row.try_get("embedded_data_specifications")?)?;

    Ok((
        row.try_get("id")?,
        row.try_get("semantic_id")?,
        submodel
    ))
}

async fn submodel_pk(conn: &mut PgConnection, submodel_id: &str) -> Result<i64> {
    sqlx::query_scalar("SELECT id FROM submodel WHERE submodel_identifier = $1")
        .bind(submodel_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| RepoError::not_found(format!("submodel {submodel_id:?} not found")))
}

/// Lock the submodel header row, serializing concurrent writes to the same
/// submodel; the effective API-level ordering is the commit order.
async fn lock_submodel(conn: &mut PgConnection, submodel_id: &str) -> Result<i64> {
    sqlx::query_scalar("SELECT id FROM submodel WHERE submodel_identifier = $1 FOR UPDATE")
        .bind(submodel_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| RepoError::not_found(format!("submodel {submodel_id:?} not found")))
}

fn attachment_table(target: &element::ElementRef) -> Result<(&'static str, bool)> {
    match target.model_type {
        ModelType::File => Ok(("file_element", false)),
        ModelType::Blob => Ok(("blob_element", true)),
        other => Err(RepoError::bad_request(format!(
            "{} cannot carry an attachment",
            other.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_targets_are_file_and_blob() {
        let mut target = element::ElementRef {
            id: 1,
            submodel_id: 1,
            parent_sme_id: None,
            root_sme_id: 1,
            position: Some(0),
            id_short: Some("f".into()),
            id_short_path: "f".into(),
            model_type: ModelType::File
        };
        assert_eq!(attachment_table(&target).unwrap(), ("file_element", false));

        target.model_type = ModelType::Blob;
        assert_eq!(attachment_table(&target).unwrap(), ("blob_element", true));

        target.model_type = ModelType::Property;
        assert!(attachment_table(&target).unwrap_err().is_bad_request());
    }
}
