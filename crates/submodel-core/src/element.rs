// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Submodel elements.
//!
//! The element tree is polymorphic over fourteen concrete kinds, expressed as
//! a closed tagged enum — [`SubmodelElement`] — discriminated by the AAS
//! `modelType` tag. Every kind embeds the shared [`ElementMeta`] attributes
//! and adds its own small payload.
//!
//! # Containers
//!
//! Exactly four kinds own children:
//!
//! | Kind | Slot | Ordering |
//! |------|------|----------|
//! | [`SubmodelElementCollection`] | `value` | insertion order, addressed by idShort |
//! | [`SubmodelElementList`] | `value` | positional, addressed by index |
//! | [`Entity`] | `statements` | insertion order, addressed by idShort |
//! | [`AnnotatedRelationshipElement`] | `annotations` | insertion order, addressed by idShort |
//!
//! Ownership is exclusive: a child lives and dies with its container. The
//! in-memory shape is always a tree, never a graph; parent back-edges exist
//! only in the database.

use serde::{Deserialize, Serialize};

use crate::{
    langstring::LangString,
    qualifier::{EmbeddedDataSpecification, Extension, Qualifier, SpecificAssetId},
    reference::Reference
};

/// Discriminator for the fourteen concrete element kinds.
///
/// String forms match the AAS `modelType` values byte for byte; they are also
/// the values of the `model_type` database column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    /// Scalar typed value.
    Property,
    /// Localized string value.
    MultiLanguageProperty,
    /// Min/max pair of typed values.
    Range,
    /// External file by reference, optionally with an uploaded attachment.
    File,
    /// Inline binary value.
    Blob,
    /// Single reference value.
    ReferenceElement,
    /// Directed relationship between two referables.
    RelationshipElement,
    /// Relationship with annotation children.
    AnnotatedRelationshipElement,
    /// Marker element without a value.
    Capability,
    /// Event source description.
    BasicEventElement,
    /// Asset entity with statement children.
    Entity,
    /// Callable with variable lists.
    Operation,
    /// Unordered container addressed by idShort.
    SubmodelElementCollection,
    /// Ordered container addressed by index.
    SubmodelElementList
}

impl ModelType {
    /// All kinds, in registry order.
    pub const ALL: [Self; 14] = [
        Self::Property,
        Self::MultiLanguageProperty,
        Self::Range,
        Self::File,
        Self::Blob,
        Self::ReferenceElement,
        Self::RelationshipElement,
        Self::AnnotatedRelationshipElement,
        Self::Capability,
        Self::BasicEventElement,
        Self::Entity,
        Self::Operation,
        Self::SubmodelElementCollection,
        Self::SubmodelElementList,
    ];

    /// Canonical string form (equals the AAS `modelType` tag).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Property => "Property",
            Self::MultiLanguageProperty => "MultiLanguageProperty",
            Self::Range => "Range",
            Self::File => "File",
            Self::Blob => "Blob",
            Self::ReferenceElement => "ReferenceElement",
            Self::RelationshipElement => "RelationshipElement",
            Self::AnnotatedRelationshipElement => "AnnotatedRelationshipElement",
            Self::Capability => "Capability",
            Self::BasicEventElement => "BasicEventElement",
            Self::Entity => "Entity",
            Self::Operation => "Operation",
            Self::SubmodelElementCollection => "SubmodelElementCollection",
            Self::SubmodelElementList => "SubmodelElementList"
        }
    }

    /// Parse the canonical string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|mt| mt.as_str() == s)
    }

    /// Whether elements of this kind own children.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(
            self,
            Self::SubmodelElementCollection
                | Self::SubmodelElementList
                | Self::Entity
                | Self::AnnotatedRelationshipElement
        )
    }
}

/// Attributes shared by every element kind.
///
/// Serialized flattened into the owning element, so the JSON shape stays the
/// flat AAS form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMeta {
    /// Short identifier, unique among siblings. Optional only for members of
    /// a [`SubmodelElementList`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_short: Option<String>,

    /// Free-form category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

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

    /// Embedded data specifications, stored verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded_data_specifications: Option<Vec<EmbeddedDataSpecification>>,

    /// Extensions, stored verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<Extension>>
}

impl ElementMeta {
    /// Meta with only an idShort set.
    #[must_use]
    pub fn named(id_short: impl Into<String>) -> Self {
        Self {
            id_short: Some(id_short.into()),
            ..Self::default()
        }
    }
}

/// Scalar typed value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// XSD value type tag, e.g. `xs:int`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    /// Value in lexical form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Reference to a coded value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_id: Option<Reference>
}

/// Localized string value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiLanguageProperty {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// Localized values. Mutable value data, distinct from display names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<LangString>>,

    /// Reference to a coded value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_id: Option<Reference>
}

/// Min/max pair in the same typed-column scheme as [`Property`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// XSD value type tag for both bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    /// Lower bound, lexical form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,

    /// Upper bound, lexical form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>
}

/// External file by reference.
///
/// `value` is either a caller-supplied URL/path or, once an attachment has
/// been uploaded, an internal pointer to the stored large object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileElement {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// MIME type of the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Path, URL or attachment pointer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>
}

/// Inline binary value, base64 in lexical form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// MIME type of the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Base64-encoded content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>
}

/// Single reference value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceElement {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// The referenced target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Reference>
}

/// Directed relationship between two referables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipElement {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// Source of the relationship.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<Reference>,

    /// Target of the relationship.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second: Option<Reference>
}

/// Relationship that additionally owns annotation children.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedRelationshipElement {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// Source of the relationship.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<Reference>,

    /// Target of the relationship.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second: Option<Reference>,

    /// Owned annotation elements, addressed by idShort.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<SubmodelElement>>
}

/// Marker element without a value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta
}

/// Event source description.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicEventElement {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// What is observed for changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<Reference>,

    /// `input` or `output`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,

    /// `on` or `off`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Topic events are published under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_topic: Option<String>,

    /// Broker the events are routed through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_broker: Option<Reference>,

    /// Timestamp of the last event, lexical `xs:dateTime`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,

    /// Minimum interval between events, lexical `xs:duration`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_interval: Option<String>,

    /// Maximum silent interval, lexical `xs:duration`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_interval: Option<String>
}

/// Asset entity with statement children.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// Owned statement elements, addressed by idShort.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<Vec<SubmodelElement>>,

    /// `CoManagedEntity` or `SelfManagedEntity`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Global asset identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_asset_id: Option<String>,

    /// Party-specific asset identifiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_asset_ids: Option<Vec<SpecificAssetId>>
}

/// One variable of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationVariable {
    /// The variable's element template.
    pub value: Box<SubmodelElement>
}

/// Callable with input, output and in/out variable lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// Input variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_variables: Option<Vec<OperationVariable>>,

    /// Output variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_variables: Option<Vec<OperationVariable>>,

    /// Variables passed both ways.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inoutput_variables: Option<Vec<OperationVariable>>
}

/// Unordered container addressed by idShort.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmodelElementCollection {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// Owned children, insertion order preserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<SubmodelElement>>
}

/// Ordered container addressed by zero-based index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmodelElementList {
    /// Shared attributes.
    #[serde(flatten)]
    pub meta: ElementMeta,

    /// Whether member order carries meaning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_relevant: Option<bool>,

    /// Semantic id every member is expected to carry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_id_list_element: Option<Reference>,

    /// Model type every member is expected to have.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_value_list_element: Option<String>,

    /// Value type every member is expected to have.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type_list_element: Option<String>,

    /// Owned members in list order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<SubmodelElement>>
}

/// A node of the element tree, closed over the fourteen concrete kinds.
///
/// Serialized in the flat AAS JSON form with `modelType` as the internal tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modelType")]
pub enum SubmodelElement {
    /// See [`Property`].
    Property(Property),
    /// See [`MultiLanguageProperty`].
    MultiLanguageProperty(MultiLanguageProperty),
    /// See [`Range`].
    Range(Range),
    /// See [`FileElement`].
    File(FileElement),
    /// See [`Blob`].
    Blob(Blob),
    /// See [`ReferenceElement`].
    ReferenceElement(ReferenceElement),
    /// See [`RelationshipElement`].
    RelationshipElement(RelationshipElement),
    /// See [`AnnotatedRelationshipElement`].
    AnnotatedRelationshipElement(AnnotatedRelationshipElement),
    /// See [`Capability`].
    Capability(Capability),
    /// See [`BasicEventElement`].
    BasicEventElement(BasicEventElement),
    /// See [`Entity`].
    Entity(Entity),
    /// See [`Operation`].
    Operation(Operation),
    /// See [`SubmodelElementCollection`].
    SubmodelElementCollection(SubmodelElementCollection),
    /// See [`SubmodelElementList`].
    SubmodelElementList(SubmodelElementList)
}

impl SubmodelElement {
    /// Kind discriminator of this node.
    #[must_use]
    pub const fn model_type(&self) -> ModelType {
        match self {
            Self::Property(_) => ModelType::Property,
            Self::MultiLanguageProperty(_) => ModelType::MultiLanguageProperty,
            Self::Range(_) => ModelType::Range,
            Self::File(_) => ModelType::File,
            Self::Blob(_) => ModelType::Blob,
            Self::ReferenceElement(_) => ModelType::ReferenceElement,
            Self::RelationshipElement(_) => ModelType::RelationshipElement,
            Self::AnnotatedRelationshipElement(_) => ModelType::AnnotatedRelationshipElement,
            Self::Capability(_) => ModelType::Capability,
            Self::BasicEventElement(_) => ModelType::BasicEventElement,
            Self::Entity(_) => ModelType::Entity,
            Self::Operation(_) => ModelType::Operation,
            Self::SubmodelElementCollection(_) => ModelType::SubmodelElementCollection,
            Self::SubmodelElementList(_) => ModelType::SubmodelElementList
        }
    }

    /// Shared attributes of this node.
    #[must_use]
    pub const fn meta(&self) -> &ElementMeta {
        match self {
            Self::Property(e) => &e.meta,
            Self::MultiLanguageProperty(e) => &e.meta,
            Self::Range(e) => &e.meta,
            Self::File(e) => &e.meta,
            Self::Blob(e) => &e.meta,
            Self::ReferenceElement(e) => &e.meta,
            Self::RelationshipElement(e) => &e.meta,
            Self::AnnotatedRelationshipElement(e) => &e.meta,
            Self::Capability(e) => &e.meta,
            Self::BasicEventElement(e) => &e.meta,
            Self::Entity(e) => &e.meta,
            Self::Operation(e) => &e.meta,
            Self::SubmodelElementCollection(e) => &e.meta,
            Self::SubmodelElementList(e) => &e.meta
        }
    }

    /// Mutable shared attributes of this node.
    pub const fn meta_mut(&mut self) -> &mut ElementMeta {
        match self {
            Self::Property(e) => &mut e.meta,
            Self::MultiLanguageProperty(e) => &mut e.meta,
            Self::Range(e) => &mut e.meta,
            Self::File(e) => &mut e.meta,
            Self::Blob(e) => &mut e.meta,
            Self::ReferenceElement(e) => &mut e.meta,
            Self::RelationshipElement(e) => &mut e.meta,
            Self::AnnotatedRelationshipElement(e) => &mut e.meta,
            Self::Capability(e) => &mut e.meta,
            Self::BasicEventElement(e) => &mut e.meta,
            Self::Entity(e) => &mut e.meta,
            Self::Operation(e) => &mut e.meta,
            Self::SubmodelElementCollection(e) => &mut e.meta,
            Self::SubmodelElementList(e) => &mut e.meta
        }
    }

    /// Short identifier, if present.
    #[must_use]
    pub fn id_short(&self) -> Option<&str> {
        self.meta().id_short.as_deref()
    }

    /// Whether this node owns children.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        self.model_type().is_container()
    }

    /// Borrow the children of a container node.
    ///
    /// Returns `None` for non-containers and for containers whose child slot
    /// is absent.
    #[must_use]
    pub fn children(&self) -> Option<&[SubmodelElement]> {
        match self {
            Self::SubmodelElementCollection(e) => e.value.as_deref(),
            Self::SubmodelElementList(e) => e.value.as_deref(),
            Self::Entity(e) => e.statements.as_deref(),
            Self::AnnotatedRelationshipElement(e) => e.annotations.as_deref(),
            _ => None
        }
    }

    /// Move the children out of a container node, leaving the slot absent.
    pub fn take_children(&mut self) -> Option<Vec<SubmodelElement>> {
        match self {
            Self::SubmodelElementCollection(e) => e.value.take(),
            Self::SubmodelElementList(e) => e.value.take(),
            Self::Entity(e) => e.statements.take(),
            Self::AnnotatedRelationshipElement(e) => e.annotations.take(),
            _ => None
        }
    }

    /// Store children into the container slot of this node.
    ///
    /// No-op for non-container kinds; an empty vector stores as absent.
    pub fn set_children(&mut self, children: Vec<SubmodelElement>) {
        let slot = Some(children).filter(|c| !c.is_empty());
        match self {
            Self::SubmodelElementCollection(e) => e.value = slot,
            Self::SubmodelElementList(e) => e.value = slot,
            Self::Entity(e) => e.statements = slot,
            Self::AnnotatedRelationshipElement(e) => e.annotations = slot,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(id_short: &str, value: &str) -> SubmodelElement {
        SubmodelElement::Property(Property {
            meta: ElementMeta::named(id_short),
            value_type: Some("xs:string".into()),
            value: Some(value.into()),
            value_id: None
        })
    }

    #[test]
    fn model_type_strings_are_closed() {
        for mt in ModelType::ALL {
            assert_eq!(ModelType::parse(mt.as_str()), Some(mt));
        }
        assert_eq!(ModelType::parse("Submodel"), None);
    }

    #[test]
    fn exactly_four_kinds_are_containers() {
        let containers: Vec<ModelType> = ModelType::ALL
            .into_iter()
            .filter(ModelType::is_container)
            .collect();
        assert_eq!(
            containers,
            vec![
                ModelType::AnnotatedRelationshipElement,
                ModelType::Entity,
                ModelType::SubmodelElementCollection,
                ModelType::SubmodelElementList,
            ]
        );
    }

    #[test]
    fn serde_tags_with_model_type() {
        let elem = property("temp", "21.5");
        let json = serde_json::to_value(&elem).unwrap();
        assert_eq!(json["modelType"], "Property");
        assert_eq!(json["idShort"], "temp");
        assert_eq!(json["valueType"], "xs:string");
        assert_eq!(json["value"], "21.5");

        let back: SubmodelElement = serde_json::from_value(json).unwrap();
        assert_eq!(back, elem);
    }

    #[test]
    fn children_accessors_cover_all_container_slots() {
        let child = property("c", "1");

        let mut coll = SubmodelElement::SubmodelElementCollection(SubmodelElementCollection {
            meta:  ElementMeta::named("coll"),
            value: Some(vec![child.clone()])
        });
        assert_eq!(coll.children().map(<[SubmodelElement]>::len), Some(1));
        assert_eq!(coll.take_children().map(|c| c.len()), Some(1));
        assert!(coll.children().is_none());

        let mut entity = SubmodelElement::Entity(Entity {
            meta: ElementMeta::named("ent"),
            statements: None,
            entity_type: Some("SelfManagedEntity".into()),
            global_asset_id: None,
            specific_asset_ids: None
        });
        entity.set_children(vec![child.clone()]);
        assert_eq!(entity.children().map(<[SubmodelElement]>::len), Some(1));

        let rel = SubmodelElement::AnnotatedRelationshipElement(AnnotatedRelationshipElement {
            meta: ElementMeta::named("rel"),
            first: None,
            second: None,
            annotations: Some(vec![child.clone()])
        });
        assert_eq!(rel.children().map(<[SubmodelElement]>::len), Some(1));

        let mut scalar = property("p", "2");
        assert!(scalar.children().is_none());
        scalar.set_children(vec![child]);
        assert!(scalar.children().is_none());
    }

    #[test]
    fn empty_child_list_stores_as_absent() {
        let mut coll = SubmodelElement::SubmodelElementCollection(SubmodelElementCollection {
            meta:  ElementMeta::named("coll"),
            value: None
        });
        coll.set_children(Vec::new());
        assert!(coll.children().is_none());
        let json = serde_json::to_value(&coll).unwrap();
        assert!(json.get("value").is_none());
    }

    #[test]
    fn nested_tree_round_trips() {
        let tree = SubmodelElement::SubmodelElementList(SubmodelElementList {
            meta: ElementMeta::named("sensors"),
            order_relevant: Some(true),
            semantic_id_list_element: None,
            type_value_list_element: Some("Property".into()),
            value_type_list_element: Some("xs:double".into()),
            value: Some(vec![property("a", "1"), property("b", "2")])
        });
        let json = serde_json::to_string(&tree).unwrap();
        let back: SubmodelElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
