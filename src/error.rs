//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure is resolved into one of four outward kinds before it reaches the
//! transport boundary: validation (400), authentication (401), not found (404) and
//! server errors (500).
//!
//! `AppError` implements `actix_web::error::ResponseError` so handlers can return it
//! directly. Server-side failures are logged with their detail and answered with an
//! opaque body; the detail never leaves the process.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::store::StoreError;

/// Message used for every rejected protected request, whatever step failed.
pub const UNAUTHENTICATED: &str = "Please authenticate.";

/// Message used for every failed login, whatever condition caused it.
pub const LOGIN_FAILED: &str = "Unable to login";

/// A single violated field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field as submitted by the client.
    pub field: String,
    /// Human-readable description of the violated rule.
    pub message: String,
}

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Input failed one or more field rules (HTTP 400).
    /// Carries every violated field so the client can fix them all at once.
    Validation(Vec<FieldError>),
    /// An update named fields outside the permitted set (HTTP 400).
    /// The whole update is rejected; nothing is applied.
    InvalidUpdate(Vec<String>),
    /// Malformed request that is not tied to a single field (HTTP 400).
    BadRequest(String),
    /// Bad credentials or a missing, invalid or revoked token (HTTP 401).
    Unauthorized(String),
    /// Resource absent or not owned by the caller (HTTP 404).
    NotFound(String),
    /// Represents an unexpected server-side error (HTTP 500).
    InternalServerError(String),
    /// Represents an error originating from the storage layer (HTTP 500).
    DatabaseError(String),
}

impl AppError {
    /// Shorthand for a validation failure on a single field.
    pub fn validation(field: &str, message: &str) -> Self {
        AppError::Validation(vec![FieldError {
            field: field.to_string(),
            message: message.to_string(),
        }])
    }

    /// The uniform rejection returned by the access guard.
    pub fn unauthenticated() -> Self {
        AppError::Unauthorized(UNAUTHENTICATED.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Validation(fields) => {
                let names: Vec<&str> = fields.iter().map(|e| e.field.as_str()).collect();
                write!(f, "Validation Error: {}", names.join(", "))
            }
            AppError::InvalidUpdate(fields) => write!(f, "Invalid Update: {}", fields.join(", ")),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidUpdate(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(fields) => json!({
                "error": "Validation failed",
                "fields": fields
            }),
            AppError::InvalidUpdate(fields) => json!({
                "error": "Invalid updates!",
                "fields": fields
            }),
            AppError::BadRequest(msg) | AppError::Unauthorized(msg) | AppError::NotFound(msg) => {
                json!({ "error": msg })
            }
            // Server-side detail is logged here and replaced with an opaque message.
            AppError::InternalServerError(msg) | AppError::DatabaseError(msg) => {
                log::error!("{}: {}", self.status_code(), msg);
                json!({ "error": "Internal server error" })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Converts `validator::ValidationErrors` into `AppError::Validation`,
/// one `FieldError` per violated rule, ordered by field name.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

/// Encoding failures are ours; undecodable uploads are mapped at the call site.
impl From<image::ImageError> for AppError {
    fn from(error: image::ImageError) -> AppError {
        AppError::InternalServerError(format!("image processing failed: {}", error))
    }
}

/// Converts storage failures. A duplicate email is a client mistake; anything
/// else is an opaque server error.
impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::DuplicateEmail => AppError::validation("email", "Email is already registered"),
            StoreError::Backend(msg) => AppError::DatabaseError(msg),
        }
    }
}
