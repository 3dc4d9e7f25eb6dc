use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Errors raised while ingesting workbooks and maintaining the operations database
#[derive(Debug, Clone, PartialEq)]
pub enum BusinessError {
    /// The uploaded bytes are not a workbook the codec can open (422 Unprocessable Entity)
    UnreadableWorkbook { file: String, message: String },
    /// A cell reference in a layout table does not parse (500 Internal Server Error)
    InvalidReference { reference: String },
    /// The document store rejected the write or could not be reached (502 Bad Gateway)
    PersistenceUnavailable { message: String },
    /// Resource not found (404 Not Found)
    NotFound { resource: String, id: String },
    /// Validation errors for user input (400 Bad Request)
    ValidationError { field: String, message: String },
    /// Duplicate resource (409 Conflict)
    Duplicate { resource: String, field: String },
    /// Generic application error (500 Internal Server Error)
    InternalError { message: String },
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::UnreadableWorkbook { file, message } => {
                write!(f, "Workbook '{file}' could not be read: {message}")
            }
            BusinessError::InvalidReference { reference } => {
                write!(f, "Invalid cell reference '{reference}'")
            }
            BusinessError::PersistenceUnavailable { message } => {
                write!(f, "Persistence unavailable: {message}")
            }
            BusinessError::NotFound { resource, id } => {
                write!(f, "{resource} with id '{id}' not found")
            }
            BusinessError::ValidationError { field, message } => {
                write!(f, "Validation error in field '{field}': {message}")
            }
            BusinessError::Duplicate { resource, field } => {
                write!(f, "{resource} with this {field} already exists")
            }
            BusinessError::InternalError { message } => {
                write!(f, "Internal error: {message}")
            }
        }
    }
}

impl std::error::Error for BusinessError {}

impl BusinessError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            BusinessError::UnreadableWorkbook { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNREADABLE_WORKBOOK")
            }
            BusinessError::InvalidReference { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INVALID_REFERENCE")
            }
            BusinessError::PersistenceUnavailable { .. } => {
                (StatusCode::BAD_GATEWAY, "PERSISTENCE_UNAVAILABLE")
            }
            BusinessError::NotFound { .. } => (StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND"),
            BusinessError::ValidationError { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            BusinessError::Duplicate { .. } => (StatusCode::CONFLICT, "DUPLICATE_RESOURCE"),
            BusinessError::InternalError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

/// Convert `BusinessError` to HTTP responses
impl IntoResponse for BusinessError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code = error_code, "{message}");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "type": format!("{:?}", self).split(' ').next().unwrap_or("Unknown")
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience macros for creating business errors
#[macro_export]
macro_rules! validation_error {
    ($field:expr, $message:expr) => {
        $crate::common::errors::BusinessError::ValidationError {
            field: $field.to_string(),
            message: $message.to_string(),
        }
    };
}

#[macro_export]
macro_rules! not_found {
    ($resource:expr, $id:expr) => {
        $crate::common::errors::BusinessError::NotFound {
            resource: $resource.to_string(),
            id: $id.to_string(),
        }
    };
}

#[macro_export]
macro_rules! duplicate_resource {
    ($resource:expr, $field:expr) => {
        $crate::common::errors::BusinessError::Duplicate {
            resource: $resource.to_string(),
            field: $field.to_string(),
        }
    };
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;
