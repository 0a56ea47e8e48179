// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! The fourteen kind handlers.
//!
//! One module per concern: kinds that share a persistent shape share a
//! module (File/Blob, the two relationship kinds, the two generic
//! containers). Each handler owns its side table and nothing else — header
//! writes live in [`super::header`], tree placement in [`super::batch`].

use sqlx::{Row, postgres::PgRow};

use crate::{error::Result, typed_value::TypedSlots};

pub mod capability;
pub mod collection;
pub mod entity;
pub mod event;
pub mod file;
pub mod multilanguage;
pub mod operation;
pub mod property;
pub mod range;
pub mod reference_element;
pub mod relationship;

/// Read a six-column typed-value group from an aliased row.
///
/// `prefix` selects the column family, e.g. `p_value` reads
/// `p_value_text … p_value_datetime`.
pub(crate) fn slots_from_row(row: &PgRow, prefix: &str) -> Result<TypedSlots> {
    Ok(TypedSlots {
        text: row.try_get(format!("{prefix}_text").as_str())?,
        num: row.try_get(format!("{prefix}_num").as_str())?,
        boolean: row.try_get(format!("{prefix}_bool").as_str())?,
        time: row.try_get(format!("{prefix}_time").as_str())?,
        date: row.try_get(format!("{prefix}_date").as_str())?,
        datetime: row.try_get(format!("{prefix}_datetime").as_str())?
    })
}
