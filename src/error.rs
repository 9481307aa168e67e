//! Error types for the application

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request {request_id} is not accepting bids (status: {status})")]
    NotAcceptingBids { request_id: Uuid, status: String },

    #[error("Invalid transition from {current} to {attempted}")]
    InvalidTransition { current: String, attempted: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_transition(current: impl ToString, attempted: impl ToString) -> Self {
        AppError::InvalidTransition {
            current: current.to_string(),
            attempted: attempted.to_string(),
        }
    }

    /// Stable machine-readable kind reported to API clients
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::NotAcceptingBids { .. } => "not_accepting_bids",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Unauthorized(_) | AppError::Forbidden(_) => "authentication_error",
            AppError::Delivery(_) => "delivery_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

/// JSON body returned for every failed API call
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, e.clone()),
            AppError::NotFound(e) => (StatusCode::NOT_FOUND, e.clone()),
            AppError::NotAcceptingBids { .. } | AppError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::Unauthorized(e) => (StatusCode::UNAUTHORIZED, e.clone()),
            AppError::Forbidden(e) => (StatusCode::FORBIDDEN, e.clone()),
            AppError::Delivery(e) => {
                tracing::warn!("Delivery error: {}", e);
                (StatusCode::BAD_GATEWAY, format!("Delivery error: {}", e))
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let body = ErrorResponse {
            error: self.kind(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

macro_rules! rejection_into_validation {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    AppError::Validation(rejection.body_text())
                }
            }
        )*
    };
}

rejection_into_validation!(JsonRejection, QueryRejection, PathRejection);

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Request abc".to_string());
        assert_eq!(format!("{}", err), "Not found: Request abc");

        let err = AppError::Validation("title is required".to_string());
        assert_eq!(format!("{}", err), "Validation error: title is required");

        let err = AppError::invalid_transition("COMPLETED", "CANCELLED");
        assert_eq!(
            format!("{}", err),
            "Invalid transition from COMPLETED to CANCELLED"
        );

        let err = AppError::Internal("something broke".to_string());
        assert_eq!(format!("{}", err), "Internal error: something broke");
    }

    #[test]
    fn test_not_accepting_bids_names_status() {
        let id = Uuid::new_v4();
        let err = AppError::NotAcceptingBids {
            request_id: id,
            status: "CANCELLED".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("CANCELLED"));
    }

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(AppError::Validation("x".into()).kind(), "validation_error");
        assert_eq!(AppError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(
            AppError::invalid_transition("A", "B").kind(),
            "invalid_transition"
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).kind(),
            "authentication_error"
        );
        assert_eq!(AppError::Forbidden("x".into()).kind(), "authentication_error");
        assert_eq!(AppError::Delivery("x".into()).kind(), "delivery_error");
    }

    #[test]
    fn test_not_found_into_response() {
        let err = AppError::NotFound("resource".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_into_response() {
        let err = AppError::Validation("bad data".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_state_machine_errors_into_conflict() {
        let response = AppError::invalid_transition("COMPLETED", "PENDING").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::NotAcceptingBids {
            request_id: Uuid::new_v4(),
            status: "BID_ACCEPTED".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_authentication_into_response() {
        let response = AppError::Unauthorized("missing key".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AppError::Forbidden("inactive".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_database_error_from_sqlx() {
        let sqlx_err = sqlx::Error::Configuration("test".into());
        let app_err: AppError = sqlx_err.into();
        assert!(matches!(app_err, AppError::Database(_)));
    }

    #[test]
    fn test_database_into_response() {
        let sqlx_err = sqlx::Error::Configuration("test".into());
        let err: AppError = sqlx_err.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
