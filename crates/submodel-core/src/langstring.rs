// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Localized string collections.
//!
//! Display names and descriptions are ordered sets of `(language, text)`
//! pairs. Two flavors exist in the metamodel — name-typed (short) and
//! text-typed (long) — which differ only in which table they are stored in;
//! the in-memory shape is shared.

use serde::{Deserialize, Serialize};

/// One `(language, text)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LangString {
    /// BCP 47 language tag, e.g. `en` or `de-CH`.
    pub language: String,

    /// Localized text.
    pub text: String
}

impl LangString {
    /// Construct a pair.
    #[must_use]
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            text:     text.into()
        }
    }
}

/// Which persistent flavor a collection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LangStringKind {
    /// Short, name-like strings (display names).
    Name,

    /// Long, prose strings (descriptions).
    Text
}

/// Normalize an optional collection: empty collapses to `None`.
#[must_use]
pub fn non_empty(strings: Option<Vec<LangString>>) -> Option<Vec<LangString>> {
    strings.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_round_trip() {
        let ls = LangString::new("en", "Temperature");
        let json = serde_json::to_value(&ls).unwrap();
        assert_eq!(json["language"], "en");
        assert_eq!(json["text"], "Temperature");
        let back: LangString = serde_json::from_value(json).unwrap();
        assert_eq!(back, ls);
    }

    #[test]
    fn empty_collection_is_absent() {
        assert_eq!(non_empty(Some(Vec::new())), None);
        let v = vec![LangString::new("en", "x")];
        assert_eq!(non_empty(Some(v.clone())), Some(v));
    }
}
