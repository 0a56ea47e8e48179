// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Error taxonomy of the persistence engine.
//!
//! Flat and exhaustive: every operation returns one of five kinds. Handlers
//! return the typed error to their immediate caller; transactions roll back
//! on any error via scoped drop. Nothing is retried inside the engine.
//!
//! | Kind | Meaning |
//! |------|---------|
//! | [`RepoError::NotFound`] | named submodel/element/attachment does not exist |
//! | [`RepoError::Conflict`] | a uniqueness invariant would be violated |
//! | [`RepoError::BadRequest`] | caller input violates a contract of this layer |
//! | [`RepoError::Internal`] | anything else; cause kept for the operator, message sanitized |
//! | [`RepoError::Cancelled`] | the caller's context was cancelled |

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T, E = RepoError> = std::result::Result<T, E>;

/// Typed error returned by every engine operation.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The named submodel, element, attachment or reference does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness invariant would be violated.
    #[error("{0}")]
    Conflict(String),

    /// Caller input violates a contract at this layer.
    #[error("{0}")]
    BadRequest(String),

    /// Any other failure. The display form is sanitized for the caller; the
    /// source chain carries the root cause for the operator.
    #[error("internal error")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The caller's context was cancelled or deadlined.
    #[error("operation cancelled")]
    Cancelled
}

impl RepoError {
    /// Not-found with a formatted message.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Conflict with a formatted message.
    #[must_use]
    pub fn conflict(what: impl Into<String>) -> Self {
        Self::Conflict(what.into())
    }

    /// Bad-request with a formatted message.
    #[must_use]
    pub fn bad_request(what: impl Into<String>) -> Self {
        Self::BadRequest(what.into())
    }

    /// Internal error wrapping a root cause.
    #[must_use]
    pub fn internal(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal(Box::new(source))
    }

    /// Check if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a conflict error.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check if this is a bad-request error.
    #[must_use]
    pub const fn is_bad_request(&self) -> bool {
        matches!(self, Self::BadRequest(_))
    }

    /// Check if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// PostgreSQL SQLSTATE for unique-constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL SQLSTATE for foreign-key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".into()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    Self::Conflict(format!("uniqueness violated: {}", db.message()))
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    Self::NotFound(format!("referenced row missing: {}", db.message()))
                }
                _ => Self::Internal(Box::new(err))
            },
            _ => Self::Internal(Box::new(err))
        }
    }
}

impl From<submodel_core::ValueError> for RepoError {
    fn from(err: submodel_core::ValueError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_predicates() {
        assert!(RepoError::not_found("x").is_not_found());
        assert!(RepoError::conflict("x").is_conflict());
        assert!(RepoError::bad_request("x").is_bad_request());
        assert!(RepoError::internal(std::io::Error::other("x")).is_internal());
        assert!(RepoError::Cancelled.is_cancelled());
    }

    #[test]
    fn internal_display_is_sanitized() {
        let err = RepoError::internal(std::io::Error::other("password=hunter2"));
        assert_eq!(err.to_string(), "internal error");

        // Root cause stays reachable for the operator.
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("hunter2"));
    }

    #[test]
    fn row_not_found_lowers_to_not_found() {
        let err: RepoError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn value_error_lowers_to_bad_request() {
        let err = submodel_core::ElementValue::from_json(
            submodel_core::ModelType::Property,
            &serde_json::json!([1, 2])
        )
        .unwrap_err();
        let repo: RepoError = err.into();
        assert!(repo.is_bad_request());
    }
}
