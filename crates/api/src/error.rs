use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use groundwork_core::error::{field_errors, CoreError};
use serde_json::{json, Value};

/// Whether 500 responses carry the underlying error text. Off until the
/// binary enables it for non-production environments.
static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

const GENERIC_INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Toggle internal error detail in responses.
pub fn set_expose_internal_errors(expose: bool) {
    EXPOSE_INTERNAL_ERRORS.store(expose, Ordering::Relaxed);
}

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses
/// of the form `{ "message", "code", "errors"? }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `groundwork_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request body failed schema validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Shorthand for a missing row.
    pub fn not_found(entity: &'static str, id: groundwork_core::types::DbId) -> Self {
        Self::Core(CoreError::NotFound { entity, id })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, errors): (StatusCode, &str, String, Option<Value>) =
            match &self {
                // --- CoreError variants ---
                AppError::Core(core) => match core {
                    CoreError::NotFound { entity, id } => (
                        StatusCode::NOT_FOUND,
                        "NOT_FOUND",
                        format!("{entity} with id {id} not found"),
                        None,
                    ),
                    CoreError::Validation(msg) => {
                        tracing::debug!(reason = %msg, "Business rule rejected request");
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
                    }
                    CoreError::ImportRows(rows) => {
                        tracing::debug!(rejected = rows.len(), "CSV import rejected");
                        (
                            StatusCode::BAD_REQUEST,
                            "IMPORT_FAILED",
                            core.to_string(),
                            Some(json!(rows)),
                        )
                    }
                    CoreError::Conflict(msg) => {
                        (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None)
                    }
                    CoreError::Internal(msg) => {
                        tracing::error!(error = %msg, "Internal core error");
                        internal(msg)
                    }
                },

                // --- Database errors ---
                AppError::Database(err) => classify_sqlx_error(err),

                // --- HTTP-specific errors ---
                AppError::Validation(errs) => {
                    let fields = field_errors(errs);
                    tracing::debug!(fields = fields.len(), "Request body failed validation");
                    (
                        StatusCode::BAD_REQUEST,
                        "VALIDATION_ERROR",
                        "Request validation failed".to_string(),
                        Some(json!(fields)),
                    )
                }
                AppError::BadRequest(msg) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
                }
                AppError::InternalError(msg) => {
                    tracing::error!(error = %msg, "Internal error");
                    internal(msg)
                }
            };

        let mut body = json!({
            "message": message,
            "code": code,
        });
        if let Some(errors) = errors {
            body["errors"] = errors;
        }

        (status, axum::Json(body)).into_response()
    }
}

fn internal(detail: &str) -> (StatusCode, &'static str, String, Option<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        internal_message(detail, EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed)),
        None,
    )
}

fn internal_message(detail: &str, expose: bool) -> String {
    if expose {
        detail.to_string()
    } else {
        GENERIC_INTERNAL_MESSAGE.to_string()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Foreign key, check constraint and numeric range violations map to 400.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String, Option<Value>) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
            None,
        ),
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            match db_err.code().as_deref() {
                // PostgreSQL unique constraint violation
                Some("23505") if constraint.starts_with("uq_") => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Duplicate value violates unique constraint: {constraint}"),
                    None,
                ),
                // foreign_key_violation
                Some("23503") => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Referenced row does not exist ({constraint})"),
                    None,
                ),
                // numeric_value_out_of_range, e.g. actual cost outgrowing its column
                Some("22003") => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    "Numeric value is out of range".to_string(),
                    None,
                ),
                // check_violation
                Some("23514") => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Value violates check constraint: {constraint}"),
                    None,
                ),
                _ => {
                    tracing::error!(error = %db_err, "Database error");
                    internal(&db_err.to_string())
                }
            }
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal(&other.to_string())
        }
    }
}
