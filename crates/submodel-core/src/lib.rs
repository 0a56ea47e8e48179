// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Data model of the Asset Administration Shell Submodel Repository.
//!
//! This crate defines the in-memory shape of submodels and their element
//! trees, the small aggregates they carry (references, localized strings,
//! qualifiers), and the value-only views. Serialization follows the AAS JSON
//! mapping. There is no persistence here; see `submodel-store` for the
//! PostgreSQL engine.
//!
//! # Overview
//!
//! - [`Submodel`] — the aggregate root
//! - [`SubmodelElement`] — closed tagged enum over the fourteen element kinds
//! - [`Reference`] / [`Key`] — typed pointer chains
//! - [`LangString`] — localized string pairs
//! - [`Qualifier`] / [`Extension`] — attached aggregates
//! - [`value`] — value-only views and payload parsing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod element;
pub mod langstring;
pub mod qualifier;
pub mod reference;
pub mod submodel;
pub mod value;

pub use element::{
    AnnotatedRelationshipElement, BasicEventElement, Blob, Capability, ElementMeta, Entity,
    FileElement, ModelType, MultiLanguageProperty, Operation, OperationVariable, Property, Range,
    ReferenceElement, RelationshipElement, SubmodelElement, SubmodelElementCollection,
    SubmodelElementList
};
pub use langstring::{LangString, LangStringKind};
pub use qualifier::{
    AdministrativeInformation, EmbeddedDataSpecification, Extension, Qualifier, SpecificAssetId
};
pub use reference::{Key, Reference, ReferenceType};
pub use submodel::Submodel;
pub use value::{ElementValue, ValueError, element_value, submodel_value};
