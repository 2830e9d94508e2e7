use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use log::error;

use crate::db::StoreError;
use crate::services::auth::AuthError;
use crate::services::ingest::IngestError;
use crate::services::records::RecordError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Validation { error: String, details: Vec<String> },
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    InternalServerError(String),
    DatabaseError(String),
    BatchFailed { attempted: usize, message: String },
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempted: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<usize>,
}

impl ErrorResponse {
    fn message(error: &str) -> Self {
        ErrorResponse { error: error.to_string(), details: None, attempted: None, applied: None }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::Validation { error, details } => {
                write!(f, "Bad Request: {} ({})", error, details.join("; "))
            }
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::BatchFailed { attempted, message } => {
                write!(f, "Batch Failed: {} rows attempted, none applied: {}", attempted, message)
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalServerError(_)
            | AppError::DatabaseError(_)
            | AppError::BatchFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Conflict(msg)
            | AppError::InternalServerError(msg) => ErrorResponse::message(msg),
            // Logged in the From impl; never echoed to the client.
            AppError::DatabaseError(_) => ErrorResponse::message("Database error"),
            AppError::Validation { error, details } => ErrorResponse {
                error: error.clone(),
                details: Some(details.clone()),
                attempted: None,
                applied: None,
            },
            AppError::BatchFailed { attempted, .. } => ErrorResponse {
                error: "Failed to insert staff records".to_string(),
                details: None,
                attempted: Some(*attempted),
                applied: Some(0),
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        error!("Store failure: {}", err);
        AppError::DatabaseError(err.to_string())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::Store(err) => err.into(),
            AuthError::Token(msg) => {
                error!("Session token error: {}", msg);
                AppError::InternalServerError("Token generation error".to_string())
            }
        }
    }
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::MissingFields => AppError::BadRequest(err.to_string()),
            RecordError::DuplicateKey(_) => AppError::Conflict(err.to_string()),
            RecordError::NotFound => AppError::NotFound(err.to_string()),
            RecordError::AlreadySubmitted => AppError::Conflict(err.to_string()),
            RecordError::NoTaxIds => AppError::BadRequest(err.to_string()),
            RecordError::Store(err) => err.into(),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedFormat | IngestError::EmptyInput => {
                AppError::BadRequest(err.to_string())
            }
            IngestError::Parse(details) => AppError::Validation {
                error: "CSV parsing failed".to_string(),
                details,
            },
            IngestError::MissingColumns(missing) => AppError::Validation {
                error: "Missing required columns".to_string(),
                details: missing,
            },
            IngestError::ValidationFailed(details) => AppError::Validation {
                error: "Validation failed".to_string(),
                details,
            },
            IngestError::Store { attempted, source } => {
                error!("Staff batch of {} rows rejected by store: {}", attempted, source);
                AppError::BatchFailed { attempted, message: source.to_string() }
            }
        }
    }
}
