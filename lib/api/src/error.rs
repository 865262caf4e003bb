use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use countrysim_core::{Error, ValidationError};
use serde_json::json;
use tracing::error;

/// Service error as seen by HTTP clients
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError(Error::Validation(ValidationError::new(field, message)))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError(Error::NotFound(what.into()))
    }

    /// Short machine-readable label carried in the `error` field
    pub fn kind(&self) -> &'static str {
        match &self.0 {
            Error::Validation(_) => "validation_error",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::UpstreamUnavailable(_) => "upstream_unavailable",
            Error::UndefinedSimilarity => "undefined_similarity",
            Error::EmptyCandidateSet => "empty_candidate_set",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Storage(_) | Error::Io(_) | Error::Serialization(_) => "internal_error",
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError(Error::Validation(e))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) | Error::DimensionMismatch { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::UndefinedSimilarity | Error::EmptyCandidateSet => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Storage(_) | Error::Io(_) | Error::Serialization(_) | Error::InvalidConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        HttpResponse::build(status).json(json!({
            "success": false,
            "error": self.kind(),
            "message": self.0.to_string(),
        }))
    }
}
