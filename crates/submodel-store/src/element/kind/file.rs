// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! File and Blob: identical persistent shape, different size rules.
//!
//! Both carry a content type, an optional upload file name and a logical
//! value string (a path/URL for File, base64 content for Blob; after an
//! attachment upload the value points at the stored large object). Blob
//! additionally enforces the 1 GiB cap — larger payloads belong in a File
//! attachment.

use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder, Row, postgres::PgRow};
use submodel_core::{Blob, ElementMeta, ElementValue, FileElement, ModelType, SubmodelElement};

use crate::{
    element::{KindHandler, expect_kind},
    error::{RepoError, Result}
};

/// Upper bound for inline blob content.
pub(crate) const MAX_BLOB_BYTES: u64 = 1 << 30;

/// Decoded size of base64 content of the given lexical length.
const fn decoded_size(base64_len: usize) -> u64 {
    (base64_len as u64 / 4) * 3
}

/// Reject base64 blob content whose decoded size exceeds the cap.
pub(crate) fn check_blob_size(value: &str) -> Result<()> {
    if decoded_size(value.len()) > MAX_BLOB_BYTES {
        return Err(RepoError::bad_request(
            "Blob value exceeds 1 GiB; store the content as a File attachment instead"
        ));
    }
    Ok(())
}

async fn bulk_insert_into(
    conn: &mut PgConnection,
    table: &str,
    rows: Vec<(i64, Option<String>, Option<String>)>
) -> Result<()> {
    let mut insert =
        QueryBuilder::new(format!("INSERT INTO {table} (id, content_type, value) "));
    insert.push_values(rows, |mut row, (id, content_type, value)| {
        row.push_bind(id).push_bind(content_type).push_bind(value);
    });
    insert.build().execute(conn).await?;
    Ok(())
}

async fn patch_into(
    conn: &mut PgConnection,
    table: &str,
    id: i64,
    content_type: Option<&str>,
    value: Option<&str>
) -> Result<()> {
    if let Some(content_type) = content_type {
        sqlx::query(&format!("UPDATE {table} SET content_type = $1 WHERE id = $2"))
            .bind(content_type)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    if let Some(value) = value {
        sqlx::query(&format!("UPDATE {table} SET value = $1 WHERE id = $2"))
            .bind(value)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Handler for [`ModelType::File`].
pub(crate) struct FileHandler;

#[async_trait]
impl KindHandler for FileHandler {
    fn model_type(&self) -> ModelType {
        ModelType::File
    }

    fn table(&self) -> &'static str {
        "file_element"
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
            let file = expect_kind!(*element, File)?;
            parsed.push((*id, file.content_type.clone(), file.value.clone()));
        }
        bulk_insert_into(conn, self.table(), parsed).await
    }

    async fn update_patch(
        &self,
        conn: &mut PgConnection,
        id: i64,
        element: &SubmodelElement
    ) -> Result<()> {
        let file = expect_kind!(element, File)?;
        patch_into(
            conn,
            self.table(),
            id,
            file.content_type.as_deref(),
            file.value.as_deref()
        )
        .await
    }

    async fn apply_value(
        &self,
        conn: &mut PgConnection,
        id: i64,
        value: &ElementValue
    ) -> Result<()> {
        let ElementValue::File {
            content_type,
            value
        } = value
        else {
            return Err(RepoError::bad_request("value shape does not match File"));
        };
        patch_into(
            conn,
            self.table(),
            id,
            content_type.as_deref(),
            value.as_deref()
        )
        .await
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::File(FileElement {
            meta: ElementMeta::default(),
            content_type: row.try_get("f_content_type")?,
            value: row.try_get("f_value")?
        }))
    }
}

/// Handler for [`ModelType::Blob`].
pub(crate) struct BlobHandler;

#[async_trait]
impl KindHandler for BlobHandler {
    fn model_type(&self) -> ModelType {
        ModelType::Blob
    }

    fn table(&self) -> &'static str {
        "blob_element"
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
            let blob = expect_kind!(*element, Blob)?;
            if let Some(value) = blob.value.as_deref() {
                check_blob_size(value)?;
            }
            parsed.push((*id, blob.content_type.clone(), blob.value.clone()));
        }
        bulk_insert_into(conn, self.table(), parsed).await
    }

    async fn update_patch(
        &self,
        conn: &mut PgConnection,
        id: i64,
        element: &SubmodelElement
    ) -> Result<()> {
        let blob = expect_kind!(element, Blob)?;
        if let Some(value) = blob.value.as_deref() {
            check_blob_size(value)?;
        }
        patch_into(
            conn,
            self.table(),
            id,
            blob.content_type.as_deref(),
            blob.value.as_deref()
        )
        .await
    }

    async fn apply_value(
        &self,
        conn: &mut PgConnection,
        id: i64,
        value: &ElementValue
    ) -> Result<()> {
        let ElementValue::Blob {
            content_type,
            value
        } = value
        else {
            return Err(RepoError::bad_request("value shape does not match Blob"));
        };
        if let Some(value) = value.as_deref() {
            check_blob_size(value)?;
        }
        patch_into(
            conn,
            self.table(),
            id,
            content_type.as_deref(),
            value.as_deref()
        )
        .await
    }

    fn from_row(&self, row: &PgRow) -> Result<SubmodelElement> {
        Ok(SubmodelElement::Blob(Blob {
            meta: ElementMeta::default(),
            content_type: row.try_get("b_content_type")?,
            value: row.try_get("b_value")?
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_blob_passes() {
        check_blob_size("aGVsbG8=").unwrap();
    }

    #[test]
    fn size_estimate_brackets_the_cap() {
        let at_cap = usize::try_from(MAX_BLOB_BYTES / 3 * 4).unwrap();
        assert!(decoded_size(at_cap) <= MAX_BLOB_BYTES);
        assert!(decoded_size(at_cap + 8) > MAX_BLOB_BYTES);
    }
}
