use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::Json,
};
use log::error;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, IdentifierError, PatchError};

/// Uniform error body for every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub message: String,
    pub errors: Vec<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

impl ErrorResponse {
    pub fn new(status: StatusCode, message: &str, errors: Vec<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.to_string(),
            errors,
        }
    }
}

pub fn api_error(status: StatusCode, message: &str, errors: Vec<String>) -> ApiError {
    (status, Json(ErrorResponse::new(status, message, errors)))
}

fn internal(message: &str, cause: &dyn std::fmt::Display) -> ApiError {
    error!("{}: {}", message, cause);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        message,
        vec!["error occurred".to_string()],
    )
}

/// Maps a domain error to its status and envelope. Server-side causes are
/// logged and never echoed.
pub fn error_response(err: CatalogError) -> ApiError {
    match err {
        CatalogError::Validation(errors) => {
            api_error(StatusCode::BAD_REQUEST, "Validation failed for request", errors)
        }
        CatalogError::InvalidIdentifier(_) => api_error(
            StatusCode::BAD_REQUEST,
            &err.to_string(),
            vec!["Invalid uuid".to_string()],
        ),
        CatalogError::NotFound { .. } => api_error(
            StatusCode::NOT_FOUND,
            &err.to_string(),
            vec!["Entity not found".to_string()],
        ),
        CatalogError::Patch(PatchError::Malformed(ref detail))
        | CatalogError::Patch(PatchError::Application(ref detail)) => api_error(
            StatusCode::BAD_REQUEST,
            &err.to_string(),
            vec![detail.clone()],
        ),
        CatalogError::Patch(ref inner @ PatchError::Rehydrate(_)) => {
            internal("Patched entity could not be processed", inner)
        }
        CatalogError::Identifier(ref inner @ IdentifierError::EntropyUnavailable(_)) => {
            internal("Identifier could not be generated", inner)
        }
        CatalogError::Identifier(ref inner) => internal("Identifier registry failure", inner),
        CatalogError::Unauthorized(ref reason) => api_error(
            StatusCode::UNAUTHORIZED,
            "Full authentication is required to access this resource",
            vec![reason.clone()],
        ),
        CatalogError::Forbidden(ref reason) => api_error(
            StatusCode::FORBIDDEN,
            "Access is denied",
            vec![reason.clone()],
        ),
        CatalogError::Store(ref cause) => internal("Internal server error", &format!("{:#}", cause)),
    }
}

pub fn json_rejection(rejection: JsonRejection) -> ApiError {
    api_error(
        StatusCode::BAD_REQUEST,
        "Malformed JSON request",
        vec![rejection.body_text()],
    )
}

pub fn query_rejection(rejection: QueryRejection) -> ApiError {
    api_error(
        StatusCode::BAD_REQUEST,
        "Invalid query parameters",
        vec![rejection.body_text()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CatalogError::validation("url: must not be null"), StatusCode::BAD_REQUEST),
            (CatalogError::InvalidIdentifier("42".to_string()), StatusCode::BAD_REQUEST),
            (
                CatalogError::NotFound {
                    entity: "organization",
                    id: "org-x".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                CatalogError::Patch(PatchError::Malformed("x".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                CatalogError::Patch(PatchError::Application("x".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                CatalogError::Patch(PatchError::Rehydrate("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CatalogError::from(IdentifierError::UnknownKind("img".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CatalogError::from(IdentifierError::EntropyUnavailable("x".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (CatalogError::Unauthorized("x".to_string()), StatusCode::UNAUTHORIZED),
            (CatalogError::Forbidden("x".to_string()), StatusCode::FORBIDDEN),
        ];
        for (err, expected) in cases {
            let (status, Json(body)) = error_response(err);
            assert_eq!(status, expected);
            assert_eq!(body.status, expected.as_u16());
            assert!(!body.errors.is_empty());
        }
    }

    #[test]
    fn test_store_failures_are_not_echoed() {
        let err = CatalogError::Store(anyhow::anyhow!("connection refused to 10.0.0.7"));
        let (status, Json(body)) = error_response(err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.errors, vec!["error occurred"]);
        assert!(!body.message.contains("10.0.0.7"));
    }

    #[test]
    fn test_invalid_identifier_envelope() {
        let (_, Json(body)) = error_response(CatalogError::from(IdentifierError::Invalid(
            "org-42".to_string(),
        )));
        assert_eq!(body.message, "org-42 is an invalid uuid");
        assert_eq!(body.errors, vec!["Invalid uuid"]);
    }
}
