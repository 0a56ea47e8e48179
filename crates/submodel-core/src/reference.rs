// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! References and keys.
//!
//! A [`Reference`] is a typed head plus an ordered chain of [`Key`] records.
//! It is the universal pointer of the AAS metamodel: semantic ids, relationship
//! endpoints and event brokers are all references.
//!
//! Serialization follows the AAS JSON mapping (`type` + `keys`, camelCase).

use serde::{Deserialize, Serialize};

/// Kind discriminator of a [`Reference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceType {
    /// Points at an element inside an AAS environment.
    ModelReference,

    /// Points at something outside any AAS environment.
    ExternalReference
}

impl ReferenceType {
    /// Canonical string form used in the database `reference.type` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ModelReference => "ModelReference",
            Self::ExternalReference => "ExternalReference"
        }
    }

    /// Parse the canonical string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ModelReference" => Some(Self::ModelReference),
            "ExternalReference" => Some(Self::ExternalReference),
            _ => None
        }
    }
}

/// One step in a reference chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    /// Key kind, e.g. `GlobalReference` or `Submodel`.
    #[serde(rename = "type")]
    pub key_type: String,

    /// Identifier the key points at.
    pub value: String
}

impl Key {
    /// Construct a key.
    #[must_use]
    pub fn new(key_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key_type: key_type.into(),
            value:    value.into()
        }
    }
}

/// A typed head plus an ordered list of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// Whether this is a model- or external reference.
    #[serde(rename = "type")]
    pub reference_type: ReferenceType,

    /// Ordered key chain. The first key names the root, later keys descend.
    pub keys: Vec<Key>
}

impl Reference {
    /// External reference with a single global key.
    #[must_use]
    pub fn external(value: impl Into<String>) -> Self {
        Self {
            reference_type: ReferenceType::ExternalReference,
            keys:           vec![Key::new("GlobalReference", value)]
        }
    }

    /// A reference with no keys carries no information.
    ///
    /// Empty references are normalized to the absent value on both the write
    /// and the read path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Normalize an optional reference: empty collapses to `None`.
#[must_use]
pub fn non_empty(reference: Option<Reference>) -> Option<Reference> {
    reference.filter(|r| !r.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_type_round_trip() {
        for ty in [ReferenceType::ModelReference, ReferenceType::ExternalReference] {
            assert_eq!(ReferenceType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(ReferenceType::parse("Bogus"), None);
    }

    #[test]
    fn external_helper_builds_single_key() {
        let r = Reference::external("urn:example:sem");
        assert_eq!(r.reference_type, ReferenceType::ExternalReference);
        assert_eq!(r.keys.len(), 1);
        assert_eq!(r.keys[0].key_type, "GlobalReference");
        assert_eq!(r.keys[0].value, "urn:example:sem");
    }

    #[test]
    fn empty_reference_is_normalized_away() {
        let empty = Reference {
            reference_type: ReferenceType::ExternalReference,
            keys:           Vec::new()
        };
        assert!(empty.is_empty());
        assert_eq!(non_empty(Some(empty)), None);

        let full = Reference::external("x");
        assert_eq!(non_empty(Some(full.clone())), Some(full));
    }

    #[test]
    fn serde_uses_aas_field_names() {
        let r = Reference::external("urn:x");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "ExternalReference");
        assert_eq!(json["keys"][0]["type"], "GlobalReference");
        assert_eq!(json["keys"][0]["value"], "urn:x");

        let back: Reference = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
