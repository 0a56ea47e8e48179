// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Relational schema of the repository.
//!
//! One polymorphic header table (`submodel_element`) keyed by an internal id,
//! fourteen narrow side tables keyed by the same id, normalized reference and
//! langstring tables, the qualifier junction, and the attachment sidecar.
//!
//! The path/position invariants live in the data, not in constraints: the one
//! constraint the schema does enforce is `UNIQUE (submodel_id, id_short_path)`.
//! Everything else is maintained transactionally by the engine.
//!
//! [`ensure_schema`] is idempotent and safe to run on every startup.

use sqlx::PgPool;

use crate::error::Result;

/// DDL statements in dependency order.
pub const DDL: &[&str] = &[
    // Normalized references: a typed head plus ordered keys.
    "CREATE TABLE IF NOT EXISTS reference (
        id   BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        type TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS reference_key (
        reference_id BIGINT NOT NULL REFERENCES reference(id) ON DELETE CASCADE,
        position     INT    NOT NULL,
        type         TEXT   NOT NULL,
        value        TEXT   NOT NULL,
        PRIMARY KEY (reference_id, position)
    )",
    // Localized string collections share a header-id sequence; the two tables
    // differ only in which column family they serve.
    "CREATE SEQUENCE IF NOT EXISTS lang_string_header_seq",
    "CREATE TABLE IF NOT EXISTS lang_string_name (
        header_id BIGINT NOT NULL,
        position  INT    NOT NULL,
        language  TEXT   NOT NULL,
        text      TEXT   NOT NULL,
        PRIMARY KEY (header_id, position)
    )",
    "CREATE TABLE IF NOT EXISTS lang_string_text (
        header_id BIGINT NOT NULL,
        position  INT    NOT NULL,
        language  TEXT   NOT NULL,
        text      TEXT   NOT NULL,
        PRIMARY KEY (header_id, position)
    )",
    // Qualifiers are normalized; their private references travel inline.
    "CREATE TABLE IF NOT EXISTS qualifier (
        id                        BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        kind                      TEXT,
        type                      TEXT NOT NULL,
        value_type                TEXT NOT NULL,
        value                     TEXT,
        value_id                  JSONB,
        semantic_id               JSONB,
        supplemental_semantic_ids JSONB
    )",
    "CREATE TABLE IF NOT EXISTS submodel (
        id                           BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        submodel_identifier          TEXT NOT NULL UNIQUE,
        id_short                     TEXT,
        category                     TEXT,
        kind                         TEXT,
        semantic_id                  BIGINT REFERENCES reference(id),
        administration               JSONB,
        qualifiers                   JSONB,
        description                  JSONB,
        display_name                 JSONB,
        supplemental_semantic_ids    JSONB,
        extensions                   JSONB,
        embedded_data_specifications JSONB
    )",
    // The polymorphic element header.
    "CREATE TABLE IF NOT EXISTS submodel_element (
        id                           BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        submodel_id                  BIGINT NOT NULL REFERENCES submodel(id) ON DELETE CASCADE,
        parent_sme_id                BIGINT REFERENCES submodel_element(id) ON DELETE CASCADE,
        root_sme_id                  BIGINT,
        position                     INT,
        id_short                     TEXT,
        id_short_path                TEXT NOT NULL,
        category                     TEXT,
        model_type                   TEXT NOT NULL,
        semantic_id                  BIGINT REFERENCES reference(id),
        description_id               BIGINT,
        displayname_id               BIGINT,
        embedded_data_specification  JSONB,
        supplemental_semantic_ids    JSONB,
        extensions                   JSONB,
        UNIQUE (submodel_id, id_short_path)
    )",
    "CREATE INDEX IF NOT EXISTS submodel_element_parent_idx
        ON submodel_element (submodel_id, parent_sme_id)",
    "CREATE INDEX IF NOT EXISTS submodel_element_root_idx
        ON submodel_element (submodel_id, root_sme_id)",
    "CREATE TABLE IF NOT EXISTS submodel_element_qualifier (
        sme_id       BIGINT NOT NULL REFERENCES submodel_element(id) ON DELETE CASCADE,
        qualifier_id BIGINT NOT NULL REFERENCES qualifier(id) ON DELETE CASCADE,
        PRIMARY KEY (sme_id, qualifier_id)
    )",
    // Per-kind side tables. Typed value columns follow the six-slot scheme;
    // private references are inline JSON.
    "CREATE TABLE IF NOT EXISTS property_element (
        id             BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        value_type     TEXT,
        value_text     TEXT,
        value_num      NUMERIC,
        value_bool     BOOLEAN,
        value_time     TIME,
        value_date     DATE,
        value_datetime TEXT,
        value_id       JSONB
    )",
    "CREATE TABLE IF NOT EXISTS multilanguage_property_element (
        id       BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        value_id JSONB
    )",
    // Mutable value data of MultiLanguageProperty, distinct from the
    // metadata langstring tables.
    "CREATE TABLE IF NOT EXISTS multilanguage_property_value (
        mlp_id   BIGINT NOT NULL REFERENCES multilanguage_property_element(id) ON DELETE CASCADE,
        position INT    NOT NULL,
        language TEXT   NOT NULL,
        text     TEXT   NOT NULL,
        PRIMARY KEY (mlp_id, position)
    )",
    "CREATE TABLE IF NOT EXISTS range_element (
        id           BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        value_type   TEXT,
        min_text     TEXT,
        min_num      NUMERIC,
        min_bool     BOOLEAN,
        min_time     TIME,
        min_date     DATE,
        min_datetime TEXT,
        max_text     TEXT,
        max_num      NUMERIC,
        max_bool     BOOLEAN,
        max_time     TIME,
        max_date     DATE,
        max_datetime TEXT
    )",
    "CREATE TABLE IF NOT EXISTS file_element (
        id           BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        content_type TEXT,
        file_name    TEXT,
        value        TEXT
    )",
    "CREATE TABLE IF NOT EXISTS blob_element (
        id           BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        content_type TEXT,
        file_name    TEXT,
        value        TEXT
    )",
    "CREATE TABLE IF NOT EXISTS reference_element (
        id    BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        value JSONB
    )",
    "CREATE TABLE IF NOT EXISTS relationship_element (
        id     BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        first  JSONB,
        second JSONB
    )",
    "CREATE TABLE IF NOT EXISTS annotated_relationship_element (
        id     BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        first  JSONB,
        second JSONB
    )",
    "CREATE TABLE IF NOT EXISTS capability_element (
        id BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS basic_event_element (
        id             BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        observed       JSONB,
        direction      TEXT,
        state          TEXT,
        message_topic  TEXT,
        message_broker JSONB,
        last_update    TEXT,
        min_interval   TEXT,
        max_interval   TEXT
    )",
    "CREATE TABLE IF NOT EXISTS entity_element (
        id                 BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        entity_type        TEXT,
        global_asset_id    TEXT,
        specific_asset_ids JSONB
    )",
    "CREATE TABLE IF NOT EXISTS operation_element (
        id                 BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        input_variables    JSONB,
        output_variables   JSONB,
        inoutput_variables JSONB
    )",
    "CREATE TABLE IF NOT EXISTS submodel_element_collection (
        id BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS submodel_element_list (
        id                       BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        order_relevant           BOOLEAN,
        semantic_id_list_element JSONB,
        type_value_list_element  TEXT,
        value_type_list_element  TEXT
    )",
    // Attachment sidecar: one large object per File/Blob element.
    "CREATE TABLE IF NOT EXISTS file_data (
        id       BIGINT PRIMARY KEY REFERENCES submodel_element(id) ON DELETE CASCADE,
        file_oid BIGINT NOT NULL
    )",
];

/// Create all tables, sequences and indexes if they do not exist.
///
/// # Errors
///
/// [`crate::RepoError::Internal`] on any DDL failure.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in DDL {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::debug!(statements = DDL.len(), "schema ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_is_idempotent_by_construction() {
        for statement in DDL {
            let head = statement.trim_start();
            assert!(
                head.starts_with("CREATE TABLE IF NOT EXISTS")
                    || head.starts_with("CREATE INDEX IF NOT EXISTS")
                    || head.starts_with("CREATE SEQUENCE IF NOT EXISTS"),
                "non-idempotent DDL: {head}"
            );
        }
    }

    #[test]
    fn one_side_table_per_kind() {
        let side_tables = [
            "property_element",
            "multilanguage_property_element",
            "range_element",
            "file_element",
            "blob_element",
            "reference_element",
            "relationship_element",
            "annotated_relationship_element",
            "capability_element",
            "basic_event_element",
            "entity_element",
            "operation_element",
            "submodel_element_collection",
            "submodel_element_list",
        ];
        assert_eq!(side_tables.len(), 14);
        for table in side_tables {
            assert!(
                DDL.iter().any(|s| s.contains(&format!(
                    "CREATE TABLE IF NOT EXISTS {table} "
                )) || s.contains(&format!("CREATE TABLE IF NOT EXISTS {table}\n"))),
                "missing side table {table}"
            );
        }
    }
}
