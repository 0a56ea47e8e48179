// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! PostgreSQL persistence engine for AAS submodel repositories.
//!
//! The engine maps the polymorphic, recursive, ordered tree of submodel
//! elements onto a normalized relational schema and reconstructs it from flat
//! row sets. Six components cooperate, leaves first:
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | RefStore | [`refstore`] | normalized references, langstrings, qualifiers, bulk lookup |
//! | TypedValueMapper | [`typed_value`] | XSD tags onto typed columns |
//! | PathEngine | [`path`] | idShortPath grammar, subtree predicate, list renumbering |
//! | ElementStore | [`element`] | per-kind handlers, PUT/PATCH/value-only, batch fast path |
//! | TreeAssembler | [`tree`] | flat rows back into ordered, hydrated trees |
//! | Coordinator | [`coordinator`] | public API and transaction boundaries |
//!
//! Plus the ambient pieces: [`schema`] (DDL bootstrap), [`error`] (the flat
//! taxonomy), [`attachment`] (large-object streaming), [`query`] (filter
//! lowering) and [`config`] (pool caps).
//!
//! # Usage
//!
//! ```rust,ignore
//! use submodel_store::{StoreConfig, SubmodelRepository, connect, ensure_schema};
//!
//! let pool = connect(&StoreConfig::new("postgres://localhost/aas")).await?;
//! ensure_schema(&pool).await?;
//! let repo = SubmodelRepository::new(pool);
//!
//! let submodel = repo.get_submodel("urn:example:sm:1").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attachment;
pub mod config;
pub mod coordinator;
pub mod element;
pub mod error;
pub mod path;
pub mod query;
pub mod refstore;
pub mod schema;
pub mod tree;
pub mod typed_value;

pub use attachment::AttachmentInfo;
pub use config::{StoreConfig, connect};
pub use coordinator::{Download, ElementPage, SubmodelPage, SubmodelRepository};
pub use error::{RepoError, Result};
pub use query::{CompareOp, FieldMatch, Lowered, QueryExpr, QueryField};
pub use schema::ensure_schema;
