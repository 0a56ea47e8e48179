// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Qualifiers, extensions and embedded data specifications.
//!
//! These are the small structured aggregates that can be attached to any
//! element. Qualifiers are persisted normalized (they are queried on their
//! own); extensions and data specifications are read-mostly and travel as
//! inline JSON.

use serde::{Deserialize, Serialize};

use crate::reference::Reference;

/// Structured constraint attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Qualifier {
    /// Qualifier kind, e.g. `ConceptQualifier`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Type name of the qualifier, unique within the element.
    #[serde(rename = "type")]
    pub qualifier_type: String,

    /// XSD value type of [`Qualifier::value`].
    pub value_type: String,

    /// Qualifier value in lexical form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Reference to the value definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_id: Option<Reference>,

    /// Semantic definition of the qualifier itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<Reference>,

    /// Additional semantic definitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplemental_semantic_ids: Option<Vec<Reference>>
}

/// Extension attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    /// Extension name, unique within the element.
    pub name: String,

    /// XSD value type of [`Extension::value`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    /// Extension value in lexical form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Elements the extension refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refers_to: Option<Vec<Reference>>,

    /// Semantic definition of the extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<Reference>
}

/// Embedded data specification: a reference plus opaque content.
///
/// The content schema is owned by the referenced specification; the repository
/// stores it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedDataSpecification {
    /// Which data specification the content conforms to.
    pub data_specification: Reference,

    /// Specification-defined payload, kept opaque.
    pub data_specification_content: serde_json::Value
}

/// Name/value pair identifying an asset for a specific party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificAssetId {
    /// Name of the asset id, e.g. `serialNumber`.
    pub name: String,

    /// Value of the asset id.
    pub value: String,

    /// Party for which the id is meaningful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_subject_id: Option<Reference>,

    /// Semantic definition of the id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<Reference>
}

/// Administrative metadata of a submodel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrativeInformation {
    /// Version number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Revision within the version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Who created the submodel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<Reference>,

    /// Template the submodel was created from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifier_serde_round_trip() {
        let q = Qualifier {
            kind: None,
            qualifier_type: "Cardinality".into(),
            value_type: "xs:string".into(),
            value: Some("One".into()),
            value_id: None,
            semantic_id: Some(Reference::external("urn:q")),
            supplemental_semantic_ids: None
        };
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["type"], "Cardinality");
        assert_eq!(json["valueType"], "xs:string");
        assert!(json.get("kind").is_none());
        let back: Qualifier = serde_json::from_value(json).unwrap();
        assert_eq!(back, q);
    }

    #[test]
    fn administration_defaults_to_empty() {
        let admin = AdministrativeInformation::default();
        let json = serde_json::to_value(&admin).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
