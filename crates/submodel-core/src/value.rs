// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Value-only views of elements and submodels.
//!
//! The value-only format strips all metadata and renders just the payload of
//! each element, keyed by idShort. It backs the `value_only` flags of the GET
//! operations and the value-only update verb, which mutates payload columns
//! while leaving metadata untouched.
//!
//! # Shapes
//!
//! | Kind | Value shape |
//! |------|-------------|
//! | Property | lexical string |
//! | MultiLanguageProperty | array of `{lang: text}` objects |
//! | Range | `{min, max}` |
//! | File / Blob | `{contentType, value}` |
//! | ReferenceElement | a Reference |
//! | RelationshipElement | `{first, second}` |
//! | AnnotatedRelationshipElement | `{first, second, annotations}` |
//! | Entity | `{statements, entityType, globalAssetId}` |
//! | BasicEventElement | `{observed}` |
//! | SubmodelElementCollection | object keyed by idShort |
//! | SubmodelElementList | array in list order |
//! | Capability / Operation | no value representation |

use std::{error::Error as StdError, fmt};

use serde_json::{Map, Value, json};

use crate::{
    element::{ModelType, SubmodelElement},
    langstring::LangString,
    reference::Reference,
    submodel::Submodel
};

/// Error raised when a value-only payload does not fit the element kind.
#[derive(Debug)]
pub struct ValueError(String);

impl ValueError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value-only payload: {}", self.0)
    }
}

impl StdError for ValueError {}

/// Parsed value-only payload, one variant per valued element kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// Lexical scalar.
    Property(String),

    /// Localized values.
    MultiLanguage(Vec<LangString>),

    /// Bounds in lexical form.
    Range {
        /// Lower bound.
        min: Option<String>,
        /// Upper bound.
        max: Option<String>
    },

    /// File payload.
    File {
        /// MIME type.
        content_type: Option<String>,
        /// Path, URL or attachment pointer.
        value: Option<String>
    },

    /// Blob payload.
    Blob {
        /// MIME type.
        content_type: Option<String>,
        /// Base64 content.
        value: Option<String>
    },

    /// Reference payload.
    ReferenceElement(Reference),

    /// Relationship endpoints.
    Relationship {
        /// Source endpoint.
        first: Option<Reference>,
        /// Target endpoint.
        second: Option<Reference>
    },

    /// Relationship endpoints plus annotation values.
    ///
    /// Annotation payloads stay raw: the kind of each annotation is known
    /// only to whoever resolves the child, which re-parses per kind.
    AnnotatedRelationship {
        /// Source endpoint.
        first: Option<Reference>,
        /// Target endpoint.
        second: Option<Reference>,
        /// Raw annotation payloads keyed by idShort.
        annotations: Vec<(String, Value)>
    },

    /// Entity payload.
    Entity {
        /// Raw statement payloads keyed by idShort.
        statements: Vec<(String, Value)>,
        /// Entity kind.
        entity_type: Option<String>,
        /// Global asset identifier.
        global_asset_id: Option<String>
    },

    /// Event payload.
    BasicEvent {
        /// Observed reference.
        observed: Option<Reference>
    },

    /// Raw child payloads keyed by idShort.
    Collection(Vec<(String, Value)>),

    /// Raw member payloads in list order.
    List(Vec<Value>)
}

impl ElementValue {
    /// Parse a value-only JSON payload for the given element kind.
    ///
    /// # Errors
    ///
    /// [`ValueError`] when the payload shape does not match the kind, or the
    /// kind has no value representation (Capability, Operation).
    pub fn from_json(model_type: ModelType, value: &Value) -> Result<Self, ValueError> {
        match model_type {
            ModelType::Property => Ok(Self::Property(scalar_string(value)?)),
            ModelType::MultiLanguageProperty => Ok(Self::MultiLanguage(lang_strings(value)?)),
            ModelType::Range => {
                let obj = object(value)?;
                Ok(Self::Range {
                    min: opt_scalar(obj.get("min"))?,
                    max: opt_scalar(obj.get("max"))?
                })
            }
            ModelType::File => {
                let obj = object(value)?;
                Ok(Self::File {
                    content_type: opt_scalar(obj.get("contentType"))?,
                    value:        opt_scalar(obj.get("value"))?
                })
            }
            ModelType::Blob => {
                let obj = object(value)?;
                Ok(Self::Blob {
                    content_type: opt_scalar(obj.get("contentType"))?,
                    value:        opt_scalar(obj.get("value"))?
                })
            }
            ModelType::ReferenceElement => {
                let reference = serde_json::from_value(value.clone())
                    .map_err(|e| ValueError::new(format!("reference: {e}")))?;
                Ok(Self::ReferenceElement(reference))
            }
            ModelType::RelationshipElement => {
                let obj = object(value)?;
                Ok(Self::Relationship {
                    first:  opt_reference(obj.get("first"))?,
                    second: opt_reference(obj.get("second"))?
                })
            }
            ModelType::AnnotatedRelationshipElement => {
                let obj = object(value)?;
                Ok(Self::AnnotatedRelationship {
                    first:       opt_reference(obj.get("first"))?,
                    second:      opt_reference(obj.get("second"))?,
                    annotations: match obj.get("annotations") {
                        Some(v) => child_map(v)?,
                        None => Vec::new()
                    }
                })
            }
            ModelType::Entity => {
                let obj = object(value)?;
                Ok(Self::Entity {
                    statements: match obj.get("statements") {
                        Some(v) => child_map(v)?,
                        None => Vec::new()
                    },
                    entity_type: opt_scalar(obj.get("entityType"))?,
                    global_asset_id: opt_scalar(obj.get("globalAssetId"))?
                })
            }
            ModelType::BasicEventElement => {
                let obj = object(value)?;
                Ok(Self::BasicEvent {
                    observed: opt_reference(obj.get("observed"))?
                })
            }
            ModelType::SubmodelElementCollection => Ok(Self::Collection(child_map(value)?)),
            ModelType::SubmodelElementList => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| ValueError::new("list value must be an array"))?;
                Ok(Self::List(arr.clone()))
            }
            ModelType::Capability | ModelType::Operation => Err(ValueError::new(format!(
                "{} has no value representation",
                model_type.as_str()
            )))
        }
    }

    /// Render back to the value-only JSON form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Property(v) => Value::String(v.clone()),
            Self::MultiLanguage(strings) => Value::Array(
                strings
                    .iter()
                    .map(|ls| json!({ ls.language.clone(): ls.text.clone() }))
                    .collect()
            ),
            Self::Range {
                min,
                max
            } => {
                let mut obj = Map::new();
                if let Some(min) = min {
                    obj.insert("min".into(), Value::String(min.clone()));
                }
                if let Some(max) = max {
                    obj.insert("max".into(), Value::String(max.clone()));
                }
                Value::Object(obj)
            }
            Self::File {
                content_type,
                value
            }
            | Self::Blob {
                content_type,
                value
            } => {
                let mut obj = Map::new();
                if let Some(ct) = content_type {
                    obj.insert("contentType".into(), Value::String(ct.clone()));
                }
                if let Some(v) = value {
                    obj.insert("value".into(), Value::String(v.clone()));
                }
                Value::Object(obj)
            }
            Self::ReferenceElement(reference) => {
                serde_json::to_value(reference).unwrap_or(Value::Null)
            }
            Self::Relationship {
                first,
                second
            } => {
                let mut obj = Map::new();
                insert_reference(&mut obj, "first", first);
                insert_reference(&mut obj, "second", second);
                Value::Object(obj)
            }
            Self::AnnotatedRelationship {
                first,
                second,
                annotations
            } => {
                let mut obj = Map::new();
                insert_reference(&mut obj, "first", first);
                insert_reference(&mut obj, "second", second);
                if !annotations.is_empty() {
                    obj.insert("annotations".into(), child_map_json(annotations));
                }
                Value::Object(obj)
            }
            Self::Entity {
                statements,
                entity_type,
                global_asset_id
            } => {
                let mut obj = Map::new();
                if !statements.is_empty() {
                    obj.insert("statements".into(), child_map_json(statements));
                }
                if let Some(et) = entity_type {
                    obj.insert("entityType".into(), Value::String(et.clone()));
                }
                if let Some(gid) = global_asset_id {
                    obj.insert("globalAssetId".into(), Value::String(gid.clone()));
                }
                Value::Object(obj)
            }
            Self::BasicEvent {
                observed
            } => {
                let mut obj = Map::new();
                insert_reference(&mut obj, "observed", observed);
                Value::Object(obj)
            }
            Self::Collection(children) => child_map_json(children),
            Self::List(members) => Value::Array(members.clone())
        }
    }
}

/// Extract the value-only view of a full element.
///
/// Returns `None` for kinds without a value representation and for valued
/// kinds whose payload is entirely absent.
#[must_use]
pub fn element_value(element: &SubmodelElement) -> Option<ElementValue> {
    match element {
        SubmodelElement::Property(e) => e.value.clone().map(ElementValue::Property),
        SubmodelElement::MultiLanguageProperty(e) => {
            e.value.clone().map(ElementValue::MultiLanguage)
        }
        SubmodelElement::Range(e) => Some(ElementValue::Range {
            min: e.min.clone(),
            max: e.max.clone()
        }),
        SubmodelElement::File(e) => Some(ElementValue::File {
            content_type: e.content_type.clone(),
            value:        e.value.clone()
        }),
        SubmodelElement::Blob(e) => Some(ElementValue::Blob {
            content_type: e.content_type.clone(),
            value:        e.value.clone()
        }),
        SubmodelElement::ReferenceElement(e) => {
            e.value.clone().map(ElementValue::ReferenceElement)
        }
        SubmodelElement::RelationshipElement(e) => Some(ElementValue::Relationship {
            first:  e.first.clone(),
            second: e.second.clone()
        }),
        SubmodelElement::AnnotatedRelationshipElement(e) => {
            Some(ElementValue::AnnotatedRelationship {
                first:       e.first.clone(),
                second:      e.second.clone(),
                annotations: children_values(e.annotations.as_deref())
            })
        }
        SubmodelElement::Entity(e) => Some(ElementValue::Entity {
            statements: children_values(e.statements.as_deref()),
            entity_type: e.entity_type.clone(),
            global_asset_id: e.global_asset_id.clone()
        }),
        SubmodelElement::BasicEventElement(e) => Some(ElementValue::BasicEvent {
            observed: e.observed.clone()
        }),
        SubmodelElement::SubmodelElementCollection(e) => Some(ElementValue::Collection(
            children_values(e.value.as_deref())
        )),
        SubmodelElement::SubmodelElementList(e) => Some(ElementValue::List(
            e.value
                .as_deref()
                .unwrap_or_default()
                .iter()
                .filter_map(|member| element_value(member).map(|v| v.to_json()))
                .collect()
        )),
        SubmodelElement::Capability(_) | SubmodelElement::Operation(_) => None
    }
}

/// Value-only view of a whole submodel: idShort-keyed top-level values.
#[must_use]
pub fn submodel_value(submodel: &Submodel) -> Value {
    child_map_json(&children_values(Some(submodel.elements())))
}

fn children_values(children: Option<&[SubmodelElement]>) -> Vec<(String, Value)> {
    children
        .unwrap_or_default()
        .iter()
        .filter_map(|child| {
            let id_short = child.id_short()?.to_owned();
            element_value(child).map(|v| (id_short, v.to_json()))
        })
        .collect()
}

fn child_map_json(children: &[(String, Value)]) -> Value {
    let mut obj = Map::new();
    for (id_short, value) in children {
        obj.insert(id_short.clone(), value.clone());
    }
    Value::Object(obj)
}

fn insert_reference(obj: &mut Map<String, Value>, key: &str, reference: &Option<Reference>) {
    if let Some(reference) = reference
        && let Ok(v) = serde_json::to_value(reference)
    {
        obj.insert(key.into(), v);
    }
}

fn object(value: &Value) -> Result<&Map<String, Value>, ValueError> {
    value
        .as_object()
        .ok_or_else(|| ValueError::new("expected a JSON object"))
}

fn scalar_string(value: &Value) -> Result<String, ValueError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ValueError::new("expected a scalar"))
    }
}

fn opt_scalar(value: Option<&Value>) -> Result<Option<String>, ValueError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => scalar_string(v).map(Some)
    }
}

fn opt_reference(value: Option<&Value>) -> Result<Option<Reference>, ValueError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| ValueError::new(format!("reference: {e}")))
    }
}

fn child_map(value: &Value) -> Result<Vec<(String, Value)>, ValueError> {
    let obj = object(value)?;
    Ok(obj
        .iter()
        .map(|(id_short, v)| (id_short.clone(), v.clone()))
        .collect())
}

/// Parse `{lang: text}` objects, either a single object or an array of them.
fn lang_strings(value: &Value) -> Result<Vec<LangString>, ValueError> {
    let pairs_of = |obj: &Map<String, Value>| -> Result<Vec<LangString>, ValueError> {
        obj.iter()
            .map(|(lang, text)| {
                let text = text
                    .as_str()
                    .ok_or_else(|| ValueError::new("language text must be a string"))?;
                Ok(LangString::new(lang.clone(), text))
            })
            .collect()
    };

    match value {
        Value::Object(obj) => pairs_of(obj),
        Value::Array(entries) => {
            let mut out = Vec::new();
            for entry in entries {
                out.extend(pairs_of(object(entry)?)?);
            }
            Ok(out)
        }
        _ => Err(ValueError::new(
            "multi-language value must be an object or array"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementMeta, Property, SubmodelElementCollection};

    fn property(id_short: &str, value: &str) -> SubmodelElement {
        SubmodelElement::Property(Property {
            meta: ElementMeta::named(id_short),
            value_type: Some("xs:string".into()),
            value: Some(value.into()),
            value_id: None
        })
    }

    #[test]
    fn property_value_accepts_scalars() {
        for (input, expect) in [
            (json!("7"), "7"),
            (json!(7), "7"),
            (json!(true), "true"),
        ] {
            let v = ElementValue::from_json(ModelType::Property, &input).unwrap();
            assert_eq!(v, ElementValue::Property(expect.into()));
        }
        assert!(ElementValue::from_json(ModelType::Property, &json!({"x": 1})).is_err());
    }

    #[test]
    fn multilanguage_value_accepts_both_forms() {
        let array = json!([{"en": "hi"}, {"de": "hallo"}]);
        let object = json!({"en": "hi", "de": "hallo"});
        let from_array = ElementValue::from_json(ModelType::MultiLanguageProperty, &array).unwrap();
        let from_object =
            ElementValue::from_json(ModelType::MultiLanguageProperty, &object).unwrap();
        let expect = ElementValue::MultiLanguage(vec![
            LangString::new("de", "hallo"),
            LangString::new("en", "hi"),
        ]);
        // Object iteration is sorted by key; the array form preserves input order.
        assert_eq!(from_object, expect);
        assert_eq!(
            from_array,
            ElementValue::MultiLanguage(vec![
                LangString::new("en", "hi"),
                LangString::new("de", "hallo"),
            ])
        );
    }

    #[test]
    fn capability_and_operation_have_no_value() {
        for mt in [ModelType::Capability, ModelType::Operation] {
            assert!(ElementValue::from_json(mt, &json!({})).is_err());
        }
    }

    #[test]
    fn range_round_trips() {
        let input = json!({"min": "0", "max": "100"});
        let v = ElementValue::from_json(ModelType::Range, &input).unwrap();
        assert_eq!(v.to_json(), input);
    }

    #[test]
    fn collection_value_keys_by_id_short() {
        let coll = SubmodelElement::SubmodelElementCollection(SubmodelElementCollection {
            meta:  ElementMeta::named("env"),
            value: Some(vec![property("temp", "21"), property("hum", "40")])
        });
        let value = element_value(&coll).unwrap();
        assert_eq!(value.to_json(), json!({"temp": "21", "hum": "40"}));
    }

    #[test]
    fn submodel_value_skips_valueless_kinds() {
        let mut sm = crate::submodel::Submodel::new("urn:x");
        sm.submodel_elements = Some(vec![
            property("p", "1"),
            SubmodelElement::Capability(crate::element::Capability {
                meta: ElementMeta::named("cap")
            }),
        ]);
        assert_eq!(submodel_value(&sm), json!({"p": "1"}));
    }
}
