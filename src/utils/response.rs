//! REST error envelope (spec §7): every failure reply is `{error, details?}`,
//! where `error` is one of the seven closed error tags and `details` is a
//! human string. Domain components return typed results or `thiserror`
//! enums; only the handler boundary converts them into this shape, via a
//! `From` impl per domain error enum — handlers never build `AppError`
//! variants by inspecting strings.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;

/// The closed error-kind set from spec §7, each bound to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    ChainRejected,
    ChainUnavailable,
    OracleFailure,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::BAD_REQUEST,
            ErrorKind::ChainRejected => StatusCode::BAD_REQUEST,
            ErrorKind::ChainUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::OracleFailure => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::ChainRejected => "chain_rejected",
            ErrorKind::ChainUnavailable => "chain_unavailable",
            ErrorKind::OracleFailure => "oracle_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// The REST boundary's sole error type. Domain errors convert into this via
/// `From` impls declared alongside each domain `thiserror` enum, never by
/// constructing HTTP status codes inline in a handler.
#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    pub details: Option<String>,
}

impl AppError {
    pub fn new(kind: ErrorKind, details: impl Into<String>) -> Self {
        Self { kind, details: Some(details.into()) }
    }

    pub fn validation(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, details)
    }

    pub fn not_found(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, details)
    }

    pub fn conflict(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, details)
    }

    pub fn chain_rejected(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::ChainRejected, details)
    }

    pub fn chain_unavailable(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::ChainUnavailable, details)
    }

    pub fn oracle_failure(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::OracleFailure, details)
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, details)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.tag(), self.details.as_deref().unwrap_or(""))
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody { error: self.kind.tag(), details: self.details };
        (self.kind.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400_with_validation_tag() {
        let err = AppError::validation("quantity must be greater than zero");
        assert_eq!(err.kind.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.kind.tag(), "validation");
    }

    #[test]
    fn chain_unavailable_maps_to_500() {
        let err = AppError::chain_unavailable("rpc timeout");
        assert_eq!(err.kind.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind.tag(), "chain_unavailable");
    }
}
