// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! The submodel aggregate.
//!
//! A [`Submodel`] is identified by a globally unique string and exclusively
//! owns an ordered flat collection of top-level elements, each of which roots
//! its own subtree. Deleting the submodel cascades over the whole tree.

use serde::{Deserialize, Serialize};

use crate::{
    element::SubmodelElement,
    langstring::LangString,
    qualifier::{AdministrativeInformation, EmbeddedDataSpecification, Extension, Qualifier},
    reference::Reference
};

/// Top-level partition of an Asset Administration Shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submodel {
    /// Globally unique identifier.
    pub id: String,

    /// Short name inside the shell.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_short: Option<String>,

    /// Free-form category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// `Instance` or `Template`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Version/revision metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administration: Option<AdministrativeInformation>,

    /// Localized display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<Vec<LangString>>,

    /// Localized description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<LangString>>,

    /// Reference to the semantic definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<Reference>,

    /// Additional semantic definitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplemental_semantic_ids: Option<Vec<Reference>>,

    /// Attached constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifiers: Option<Vec<Qualifier>>,

    /// Extensions, stored verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<Extension>>,

    /// Embedded data specifications, stored verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded_data_specifications: Option<Vec<EmbeddedDataSpecification>>,

    /// Ordered top-level elements. Absent and empty are equivalent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submodel_elements: Option<Vec<SubmodelElement>>
}

impl Submodel {
    /// A submodel with only its identifier set.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            id_short: None,
            category: None,
            kind: None,
            administration: None,
            display_name: None,
            description: None,
            semantic_id: None,
            supplemental_semantic_ids: None,
            qualifiers: None,
            extensions: None,
            embedded_data_specifications: None,
            submodel_elements: None
        }
    }

    /// Top-level elements, empty slice when absent.
    #[must_use]
    pub fn elements(&self) -> &[SubmodelElement] {
        self.submodel_elements.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementMeta, Property};

    #[test]
    fn serde_round_trip_with_elements() {
        let mut sm = Submodel::new("urn:example:sm:1");
        sm.id_short = Some("demo".into());
        sm.kind = Some("Instance".into());
        sm.submodel_elements = Some(vec![SubmodelElement::Property(Property {
            meta: ElementMeta::named("p"),
            value_type: Some("xs:int".into()),
            value: Some("1".into()),
            value_id: None
        })]);

        let json = serde_json::to_value(&sm).unwrap();
        assert_eq!(json["id"], "urn:example:sm:1");
        assert_eq!(json["submodelElements"][0]["modelType"], "Property");

        let back: Submodel = serde_json::from_value(json).unwrap();
        assert_eq!(back, sm);
    }

    #[test]
    fn absent_element_list_is_empty() {
        let sm = Submodel::new("urn:x");
        assert!(sm.elements().is_empty());
        let json = serde_json::to_value(&sm).unwrap();
        assert!(json.get("submodelElements").is_none());
    }
}
