// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Normalized persistence of references, langstring collections and
//! qualifiers.
//!
//! These are the shared leaf structures of the element tree. All lookups are
//! bulk: one query for the head rows, one for the member rows, grouped in
//! memory, so tree hydration costs a fixed number of round trips regardless
//! of tree size. Batch lookups fill the result map only for ids that exist;
//! partial presence is not an error.

use std::collections::HashMap;

use sqlx::{PgConnection, QueryBuilder, Row};
use submodel_core::{Key, LangString, LangStringKind, Qualifier, Reference, ReferenceType};

use crate::error::{RepoError, Result};

/// Table name for a langstring flavor.
const fn lang_table(kind: LangStringKind) -> &'static str {
    match kind {
        LangStringKind::Name => "lang_string_name",
        LangStringKind::Text => "lang_string_text"
    }
}

/// Insert a reference head plus its ordered keys.
///
/// Nil or empty input stores nothing and yields `None`.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn create_reference(
    conn: &mut PgConnection,
    reference: Option<&Reference>
) -> Result<Option<i64>> {
    Ok(create_references_bulk(conn, &[reference]).await?[0])
}

/// Bulk variant of [`create_reference`]: one head insert and one key insert
/// for the whole batch, ids returned in input order (`None` where the input
/// was nil or empty).
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn create_references_bulk(
    conn: &mut PgConnection,
    references: &[Option<&Reference>]
) -> Result<Vec<Option<i64>>> {
    let present: Vec<(usize, &Reference)> = references
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.filter(|r| !r.is_empty()).map(|r| (i, r)))
        .collect();

    let mut out = vec![None; references.len()];
    if present.is_empty() {
        return Ok(out);
    }

    let mut heads = QueryBuilder::new("INSERT INTO reference (type) ");
    heads.push_values(&present, |mut row, (_, reference)| {
        row.push_bind(reference.reference_type.as_str());
    });
    heads.push(" RETURNING id");
    let ids: Vec<i64> = heads
        .build_query_scalar()
        .fetch_all(&mut *conn)
        .await?;

    let mut key_rows: Vec<(i64, i32, &Key)> = Vec::new();
    for ((_, reference), id) in present.iter().zip(&ids) {
        for (position, key) in reference.keys.iter().enumerate() {
            key_rows.push((*id, position as i32, key));
        }
    }
    if !key_rows.is_empty() {
        let mut keys =
            QueryBuilder::new("INSERT INTO reference_key (reference_id, position, type, value) ");
        keys.push_values(&key_rows, |mut row, (id, position, key)| {
            row.push_bind(id)
                .push_bind(position)
                .push_bind(&key.key_type)
                .push_bind(&key.value);
        });
        keys.build().execute(&mut *conn).await?;
    }

    for ((input_index, _), id) in present.iter().zip(ids) {
        out[*input_index] = Some(id);
    }
    Ok(out)
}

/// Remove a reference head and all its keys.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn delete_reference(conn: &mut PgConnection, id: i64) -> Result<()> {
    delete_references(conn, &[id]).await
}

/// Remove a set of references; keys cascade.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn delete_references(conn: &mut PgConnection, ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    sqlx::query("DELETE FROM reference WHERE id = ANY($1)")
        .bind(ids)
        .execute(conn)
        .await?;
    Ok(())
}

/// Fetch one reference.
///
/// # Errors
///
/// [`RepoError::NotFound`] when the id does not exist.
pub async fn reference_by_id(conn: &mut PgConnection, id: i64) -> Result<Reference> {
    references_by_ids(conn, &[id])
        .await?
        .remove(&id)
        .ok_or_else(|| RepoError::not_found(format!("reference {id} not found")))
}

/// Fetch a set of references in two queries, grouped in memory.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`]; a head row with an
/// unknown type tag is [`RepoError::Internal`] as well.
pub async fn references_by_ids(
    conn: &mut PgConnection,
    ids: &[i64]
) -> Result<HashMap<i64, Reference>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let heads = sqlx::query("SELECT id, type FROM reference WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;

    let mut out: HashMap<i64, Reference> = HashMap::with_capacity(heads.len());
    for row in heads {
        let id: i64 = row.try_get("id")?;
        let type_tag: String = row.try_get("type")?;
        let reference_type = ReferenceType::parse(&type_tag).ok_or_else(|| {
            RepoError::internal(std::io::Error::other(format!(
                "reference {id} has unknown type {type_tag:?}"
            )))
        })?;
        out.insert(id, Reference {
            reference_type,
            keys: Vec::new()
        });
    }

    let keys = sqlx::query(
        "SELECT reference_id, type, value FROM reference_key \
         WHERE reference_id = ANY($1) ORDER BY reference_id, position"
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in keys {
        let reference_id: i64 = row.try_get("reference_id")?;
        if let Some(reference) = out.get_mut(&reference_id) {
            reference.keys.push(Key {
                key_type: row.try_get("type")?,
                value:    row.try_get("value")?
            });
        }
    }

    Ok(out)
}

/// Insert a langstring collection under a fresh header id.
///
/// Nil or empty input stores nothing and yields `None`.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn create_lang_strings(
    conn: &mut PgConnection,
    kind: LangStringKind,
    entries: Option<&[LangString]>
) -> Result<Option<i64>> {
    Ok(create_lang_strings_bulk(conn, kind, &[entries]).await?[0])
}

/// Bulk variant of [`create_lang_strings`]: header ids are drawn from the
/// shared sequence in one query, member rows inserted in one statement.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn create_lang_strings_bulk(
    conn: &mut PgConnection,
    kind: LangStringKind,
    sets: &[Option<&[LangString]>]
) -> Result<Vec<Option<i64>>> {
    let present: Vec<(usize, &[LangString])> = sets
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.filter(|s| !s.is_empty()).map(|s| (i, s)))
        .collect();

    let mut out = vec![None; sets.len()];
    if present.is_empty() {
        return Ok(out);
    }

    let header_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT nextval('lang_string_header_seq') FROM generate_series(1, $1)"
    )
    .bind(present.len() as i64)
    .fetch_all(&mut *conn)
    .await?;

    let mut rows: Vec<(i64, i32, &LangString)> = Vec::new();
    for ((_, entries), header_id) in present.iter().zip(&header_ids) {
        for (position, entry) in entries.iter().enumerate() {
            rows.push((*header_id, position as i32, entry));
        }
    }

    let mut insert = QueryBuilder::new(format!(
        "INSERT INTO {} (header_id, position, language, text) ",
        lang_table(kind)
    ));
    insert.push_values(&rows, |mut row, (header_id, position, entry)| {
        row.push_bind(header_id)
            .push_bind(position)
            .push_bind(&entry.language)
            .push_bind(&entry.text);
    });
    insert.build().execute(&mut *conn).await?;

    for ((input_index, _), header_id) in present.iter().zip(header_ids) {
        out[*input_index] = Some(header_id);
    }
    Ok(out)
}

/// Remove langstring collections by header id.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn delete_lang_strings(
    conn: &mut PgConnection,
    kind: LangStringKind,
    header_ids: &[i64]
) -> Result<()> {
    if header_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(&format!(
        "DELETE FROM {} WHERE header_id = ANY($1)",
        lang_table(kind)
    ))
    .bind(header_ids)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetch langstring collections by header id set, ordered within each
/// collection.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn lang_strings_by_ids(
    conn: &mut PgConnection,
    kind: LangStringKind,
    header_ids: &[i64]
) -> Result<HashMap<i64, Vec<LangString>>> {
    if header_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(&format!(
        "SELECT header_id, language, text FROM {} \
         WHERE header_id = ANY($1) ORDER BY header_id, position",
        lang_table(kind)
    ))
    .bind(header_ids)
    .fetch_all(conn)
    .await?;

    let mut out: HashMap<i64, Vec<LangString>> = HashMap::new();
    for row in rows {
        let header_id: i64 = row.try_get("header_id")?;
        out.entry(header_id).or_default().push(LangString {
            language: row.try_get("language")?,
            text:     row.try_get("text")?
        });
    }
    Ok(out)
}

/// Attach a qualifier set to an element.
///
/// Qualifier rows are small and written one by one; the junction row is
/// inserted alongside each.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn create_qualifiers(
    conn: &mut PgConnection,
    sme_id: i64,
    qualifiers: &[Qualifier]
) -> Result<()> {
    for qualifier in qualifiers {
        let qualifier_id: i64 = sqlx::query_scalar(
            "INSERT INTO qualifier \
             (kind, type, value_type, value, value_id, semantic_id, supplemental_semantic_ids) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id"
        )
        .bind(&qualifier.kind)
        .bind(&qualifier.qualifier_type)
        .bind(&qualifier.value_type)
        .bind(&qualifier.value)
        .bind(json_opt(qualifier.value_id.as_ref())?)
        .bind(json_opt(qualifier.semantic_id.as_ref())?)
        .bind(json_opt(qualifier.supplemental_semantic_ids.as_ref())?)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query("INSERT INTO submodel_element_qualifier (sme_id, qualifier_id) VALUES ($1, $2)")
            .bind(sme_id)
            .bind(qualifier_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Remove the qualifier rows owned by a set of elements.
///
/// The junction rows cascade with the elements; the qualifier rows themselves
/// must be removed explicitly before the elements go away.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn delete_qualifiers_for(conn: &mut PgConnection, sme_ids: &[i64]) -> Result<()> {
    if sme_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "DELETE FROM qualifier WHERE id IN \
         (SELECT qualifier_id FROM submodel_element_qualifier WHERE sme_id = ANY($1))"
    )
    .bind(sme_ids)
    .execute(conn)
    .await?;
    Ok(())
}

/// Fetch the qualifier sets of a set of elements, grouped by element id.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`]; a malformed inline
/// reference blob is [`RepoError::Internal`].
pub async fn qualifiers_by_sme_ids(
    conn: &mut PgConnection,
    sme_ids: &[i64]
) -> Result<HashMap<i64, Vec<Qualifier>>> {
    if sme_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(
        "SELECT j.sme_id, q.kind, q.type, q.value_type, q.value, \
                q.value_id, q.semantic_id, q.supplemental_semantic_ids \
         FROM submodel_element_qualifier j \
         JOIN qualifier q ON q.id = j.qualifier_id \
         WHERE j.sme_id = ANY($1) \
         ORDER BY j.sme_id, q.id"
    )
    .bind(sme_ids)
    .fetch_all(conn)
    .await?;

    let mut out: HashMap<i64, Vec<Qualifier>> = HashMap::new();
    for row in rows {
        let sme_id: i64 = row.try_get("sme_id")?;
        out.entry(sme_id).or_default().push(Qualifier {
            kind: row.try_get("kind")?,
            qualifier_type: row.try_get("type")?,
            value_type: row.try_get("value_type")?,
            value: row.try_get("value")?,
            value_id: from_json_opt(row.try_get("value_id")?)?,
            semantic_id: from_json_opt(row.try_get("semantic_id")?)?,
            supplemental_semantic_ids: from_json_opt(row.try_get("supplemental_semantic_ids")?)?
        });
    }
    Ok(out)
}

/// Serialize an optional aggregate to an inline JSON column value.
pub(crate) fn json_opt<T: serde::Serialize>(
    value: Option<&T>
) -> Result<Option<serde_json::Value>> {
    value.map(serde_json::to_value).transpose().map_err(Into::into)
}

/// Deserialize an optional inline JSON column value.
pub(crate) fn from_json_opt<T: serde::de::DeserializeOwned>(
    value: Option<serde_json::Value>
) -> Result<Option<T>> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_table_selects_flavor() {
        assert_eq!(lang_table(LangStringKind::Name), "lang_string_name");
        assert_eq!(lang_table(LangStringKind::Text), "lang_string_text");
    }

    #[test]
    fn json_opt_round_trips() {
        let reference = Reference::external("urn:x");
        let json = json_opt(Some(&reference)).unwrap().unwrap();
        let back: Option<Reference> = from_json_opt(Some(json)).unwrap();
        assert_eq!(back, Some(reference));
        assert_eq!(json_opt::<Reference>(None).unwrap(), None);
        let none: Option<Reference> = from_json_opt(None).unwrap();
        assert_eq!(none, None);
    }
}
