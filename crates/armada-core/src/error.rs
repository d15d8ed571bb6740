// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types shared by the armada domain services and reconcilers.
//!
//! Every fallible domain operation returns a [`ServiceError`] carrying an
//! [`ErrorKind`]. The excluded HTTP layer maps kinds to response statuses via
//! [`ServiceError::http_status_code`]; reconcilers aggregate them per batch.

use thiserror::Error;

/// Result type using ServiceError.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Classification of a service error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Bad input or an illegal state transition.
    Validation,
    /// The referenced record does not exist (or is soft-deleted).
    NotFound,
    /// The operation conflicts with concurrent state (e.g. duplicate insert).
    Conflict,
    /// Caller is not allowed to perform the operation (capacity exceeded).
    Forbidden,
    /// Caller identity could not be established.
    Unauthenticated,
    /// Unexpected database or I/O failure.
    General,
}

impl ErrorKind {
    /// Stable machine-readable code for this kind.
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Forbidden => "FORBIDDEN",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::General => "GENERAL_ERROR",
        }
    }

    /// HTTP response status the excluded handler layer uses for this kind.
    pub fn http_status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Forbidden => 403,
            Self::Unauthenticated => 401,
            Self::General => 500,
        }
    }
}

/// A typed service error: an [`ErrorKind`] plus a human-readable message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServiceError {
    kind: ErrorKind,
    message: String,
}

impl ServiceError {
    /// Create an error with an explicit kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Bad input or illegal transition.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Missing record.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Concurrent-state conflict.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Disallowed operation (e.g. capacity exceeded).
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Unexpected internal failure.
    pub fn general(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::General, message)
    }

    /// The error's classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// True if this error is a not-found.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// HTTP status the handler layer translates this error to.
    pub fn http_status_code(&self) -> u16 {
        self.kind.http_status_code()
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::not_found("record not found"),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::conflict(format!("duplicate record: {}", db))
            }
            _ => Self::general(format!("database error: {}", err)),
        }
    }
}
