// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Binary attachments in database large objects.
//!
//! File and Blob elements can carry an uploaded attachment. The bytes live in
//! a PostgreSQL large object; the sidecar table `file_data` maps the owning
//! element to the object id. All large-object access goes through the
//! server-side functions (`lo_creat`, `lo_put`, `lo_get`, `lo_unlink`) in
//! 8 KiB chunks, so uploads participate in the surrounding transaction: a
//! rollback reclaims the half-written object and no observable state remains.
//!
//! Swap discipline: a re-upload writes the new object first, repoints the
//! sidecar row, then unlinks the prior object — at no point does the element
//! reference a missing object.

use futures::{Stream, stream};
use sqlx::{PgConnection, PgPool, Row};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::error::{RepoError, Result};

/// Chunk size for attachment streaming.
pub(crate) const CHUNK_SIZE: usize = 8 * 1024;

/// Upper bound for Blob attachments.
const MAX_BLOB_ATTACHMENT: u64 = 1 << 30;

/// Stream the caller's bytes into a fresh large object.
///
/// Returns the new object id and the byte count. Cancellation is checked
/// between chunks; the partially written object is reclaimed by the
/// transaction rollback that follows the error.
///
/// # Errors
///
/// - [`RepoError::Cancelled`] when the token fires mid-stream;
/// - [`RepoError::BadRequest`] when `enforce_cap` is set and the stream
///   exceeds 1 GiB;
/// - [`RepoError::Internal`] on database or read failures.
pub(crate) async fn write_object<R>(
    conn: &mut PgConnection,
    mut input: R,
    enforce_cap: bool,
    cancel: &CancellationToken
) -> Result<(i64, u64)>
where
    R: AsyncRead + Unpin + Send
{
    let oid: i64 = sqlx::query_scalar("SELECT lo_creat(-1)::bigint")
        .fetch_one(&mut *conn)
        .await?;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut offset: i64 = 0;
    let mut total: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RepoError::Cancelled);
        }
        let read = input
            .read(&mut buffer)
            .await
            .map_err(RepoError::internal)?;
        if read == 0 {
            break;
        }
        total += read as u64;
        if enforce_cap && total > MAX_BLOB_ATTACHMENT {
            return Err(RepoError::bad_request(
                "Blob attachment exceeds 1 GiB; use a File element instead"
            ));
        }
        sqlx::query("SELECT lo_put($1::oid, $2, $3)")
            .bind(oid)
            .bind(offset)
            .bind(&buffer[..read])
            .execute(&mut *conn)
            .await?;
        offset += read as i64;
    }

    Ok((oid, total))
}

/// Repoint the sidecar row of an element at a new object, returning the
/// previously linked object id if any.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub(crate) async fn swap_pointer(
    conn: &mut PgConnection,
    sme_id: i64,
    new_oid: i64
) -> Result<Option<i64>> {
    let old: Option<i64> = sqlx::query_scalar("SELECT file_oid FROM file_data WHERE id = $1")
        .bind(sme_id)
        .fetch_optional(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO file_data (id, file_oid) VALUES ($1, $2) \
         ON CONFLICT (id) DO UPDATE SET file_oid = EXCLUDED.file_oid"
    )
    .bind(sme_id)
    .bind(new_oid)
    .execute(&mut *conn)
    .await?;

    Ok(old)
}

/// Unlink a large object.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub(crate) async fn unlink(conn: &mut PgConnection, oid: i64) -> Result<()> {
    sqlx::query("SELECT lo_unlink($1::oid)")
        .bind(oid)
        .execute(conn)
        .await?;
    Ok(())
}

/// Metadata of a stored attachment.
#[derive(Debug, Clone)]
pub struct AttachmentInfo {
    /// MIME type recorded on the element.
    pub content_type: Option<String>,
    /// File name recorded at upload.
    pub file_name: Option<String>,
    /// Large-object id.
    pub oid: i64
}

/// Look up the attachment of an element.
///
/// # Errors
///
/// [`RepoError::NotFound`] when the element has no attachment.
pub(crate) async fn info(
    conn: &mut PgConnection,
    sme_id: i64,
    side_table: &str,
    id_short_path: &str
) -> Result<AttachmentInfo> {
    let row = sqlx::query(&format!(
        "SELECT s.content_type, s.file_name, d.file_oid \
         FROM file_data d JOIN {side_table} s ON s.id = d.id WHERE d.id = $1"
    ))
    .bind(sme_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| {
        RepoError::not_found(format!("no attachment stored at {id_short_path:?}"))
    })?;

    Ok(AttachmentInfo {
        content_type: row.try_get("content_type")?,
        file_name:    row.try_get("file_name")?,
        oid:          row.try_get("file_oid")?
    })
}

/// Stream the content of a large object in 8 KiB chunks.
///
/// Each chunk is fetched through `lo_get` on a pooled connection; the stream
/// ends at the first short chunk. Dropping the stream stops all database
/// work.
pub(crate) fn read_object(
    pool: PgPool,
    oid: i64,
    cancel: CancellationToken
) -> impl Stream<Item = Result<Vec<u8>>> + Send {
    stream::try_unfold(0i64, move |offset| {
        let pool = pool.clone();
        let cancel = cancel.clone();
        async move {
            if cancel.is_cancelled() {
                return Err(RepoError::Cancelled);
            }
            let chunk: Vec<u8> =
                sqlx::query_scalar("SELECT lo_get($1::oid, $2, $3)")
                    .bind(oid)
                    .bind(offset)
                    .bind(CHUNK_SIZE as i32)
                    .fetch_one(&pool)
                    .await?;
            if chunk.is_empty() {
                return Ok(None);
            }
            let next_offset = offset + chunk.len() as i64;
            Ok(Some((chunk, next_offset)))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_is_8_kib() {
        assert_eq!(CHUNK_SIZE, 8192);
    }

    #[test]
    fn blob_cap_is_1_gib() {
        assert_eq!(MAX_BLOB_ATTACHMENT, 1_073_741_824);
    }
}
