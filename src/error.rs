//! Typed errors and HTTP mapping.

use crate::sql::Dialect;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Startup-time failures: route and model declarations that can never serve.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("route method not defined for handler '{0}'")]
    MissingMethod(String),
    #[error("route path not defined for handler '{0}'")]
    MissingPath(String),
    #[error("unsupported route method '{0}'")]
    UnsupportedMethod(String),
    #[error("no handler attached to route {method} {path}")]
    MissingHandler { method: String, path: String },
    #[error("invalid path template '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute { method: String, path: String },
    #[error("primary key not found for table '{0}'")]
    MissingPrimaryKey(String),
    #[error("duplicate primary key for field: {field} (table '{table}')")]
    DuplicatePrimaryKey { table: String, field: String },
    #[error("duplicate field '{field}' in table '{table}'")]
    DuplicateField { table: String, field: String },
    #[error("request parameter must be the last named parameter in function: {handler}{signature}")]
    RequestParamPlacement { handler: String, signature: String },
    #[error("duplicate parameter '{param}' in function: {handler}")]
    DuplicateParam { handler: String, param: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid database url: {0}")]
    DatabaseUrl(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Handler-raised domain error. The dispatcher turns it into a `{error, data, message}`
/// mapping instead of failing the call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{error}: {message}")]
pub struct ApiError {
    pub error: String,
    pub data: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, data: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError {
            error: error.into(),
            data: data.into(),
            message: message.into(),
        }
    }

    /// Input value is missing or malformed. `data` names the offending field.
    pub fn value_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("value:invalid", field, message)
    }

    pub fn resource_not_found(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new("value:notfound", resource, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new("permission:forbidden", "permission", message)
    }

    pub fn to_mapping(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("error".into(), Value::String(self.error.clone()));
        m.insert("data".into(), Value::String(self.data.clone()));
        m.insert("message".into(), Value::String(self.message.clone()));
        m
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("unknown field '{field}' on model '{table}'")]
    UnknownField { table: String, field: String },
    #[error("model '{table}' was built for {model} but the database is {database}")]
    DialectMismatch { table: String, model: Dialect, database: Dialect },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{op} on '{table}' affected {actual} rows, expected 1")]
    AffectedRows { op: &'static str, table: String, actual: u64 },
    #[error("template: {0}")]
    Template(#[from] minijinja::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    BadRequest(String),
    #[error("request body too large")]
    PayloadTooLarge,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Api(e) = &self {
            return (StatusCode::BAD_REQUEST, Json(e.to_mapping())).into_response();
        }
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::Registration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "registration_error"),
            AppError::Api(_) => (StatusCode::BAD_REQUEST, "api_error"),
            AppError::UnknownField { .. } | AppError::DialectMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "model_error")
            }
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::AffectedRows { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Template(_) => (StatusCode::INTERNAL_SERVER_ERROR, "template_error"),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_mapping_has_three_keys() {
        let e = ApiError::value_error("email", "invalid email");
        let m = e.to_mapping();
        assert_eq!(m.get("error"), Some(&Value::String("value:invalid".into())));
        assert_eq!(m.get("data"), Some(&Value::String("email".into())));
        assert_eq!(m.get("message"), Some(&Value::String("invalid email".into())));
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn bad_request_maps_to_400() {
        let resp = AppError::BadRequest("Missing argument: name".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn dialect_mismatch_maps_to_500() {
        let e = AppError::DialectMismatch {
            table: "users".into(),
            model: Dialect::MySql,
            database: Dialect::Postgres,
        };
        assert!(e.to_string().starts_with("model 'users' was built for"));
        assert_eq!(e.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn affected_rows_maps_to_500() {
        let resp = AppError::AffectedRows {
            op: "insert",
            table: "users".into(),
            actual: 0,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
