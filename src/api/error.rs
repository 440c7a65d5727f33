//! Mapping of domain failures onto HTTP responses
//!
//! Internal detail is logged here and never sent to the client.

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::analytics::{AggregationError, ReportError};
use crate::storage::StorageError;
use crate::validation::{ValidationError, ValidationErrorKind, ValidationErrors};

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationErrors),
    Aggregation(AggregationError),
    Report(ReportError),
    Storage(StorageError),
    NotFound(&'static str),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationError>>,
}

impl ErrorResponse {
    fn plain(message: &str) -> Self {
        Self {
            error: message.to_string(),
            details: None,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation(err)
    }
}

/// A query string serde could not decode, e.g. a repeated parameter.
impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(ValidationErrors::single(
            "query",
            ValidationErrorKind::MalformedRequest,
            rejection.body_text(),
        ))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(ValidationErrors::single(
            "id",
            ValidationErrorKind::MalformedNumber,
            rejection.body_text(),
        ))
    }
}

impl From<AggregationError> for ApiError {
    fn from(err: AggregationError) -> Self {
        ApiError::Aggregation(err)
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError::Report(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err)
    }
}

fn aggregation_failure(err: &AggregationError) -> (StatusCode, ErrorResponse) {
    match err {
        AggregationError::Timeout(limit) => {
            error!(?limit, "analytics query timed out");
            (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse::plain("Analytics query timed out"),
            )
        }
        AggregationError::SourceUnavailable(source) => {
            error!(error = %source, "analytics query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::plain("Failed to fetch analytics data"),
            )
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation failed".to_string(),
                    details: Some(errors.errors().to_vec()),
                },
            ),
            ApiError::Aggregation(err) => aggregation_failure(&err),
            ApiError::Report(ReportError::Aggregation(err)) => aggregation_failure(&err),
            ApiError::Report(ReportError::Persistence(err)) => {
                error!(error = %err, "report persistence failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::plain("Failed to generate report"),
                )
            }
            ApiError::Storage(err) => {
                error!(error = %err, "report store read failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::plain("Failed to fetch reports"),
                )
            }
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, ErrorResponse::plain(what)),
        };

        (status, Json(body)).into_response()
    }
}
