//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unknown field '{field}' for {model}")]
    UnknownField { field: String, model: &'static str },
    #[error("unsupported selector '{0}': expected a direct field access such as |m: Model| m.field")]
    UnsupportedSelector(String),
    #[error("load target is not a {expected}")]
    TypeMismatch { expected: &'static str },
    #[error("shared data: {0}")]
    SharedData(#[source] BoxError),
    #[error("loading '{field}': {source}")]
    Loader {
        field: String,
        #[source]
        source: BoxError,
    },
    #[error(transparent)]
    Other(#[from] BoxError),
}

impl LoadError {
    /// Failure inside the loader for `field`.
    pub fn loader(field: impl Into<String>, source: impl Into<BoxError>) -> Self {
        LoadError::Loader {
            field: field.into(),
            source: source.into(),
        }
    }

    /// Failure fetching the request-scoped shared payload.
    pub fn shared_data(source: impl Into<BoxError>) -> Self {
        LoadError::SharedData(source.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            LoadError::UnknownField { .. } => "unknown_field",
            LoadError::UnsupportedSelector(_) => "config_error",
            LoadError::TypeMismatch { .. } => "internal_error",
            LoadError::SharedData(_) => "shared_data_error",
            LoadError::Loader { .. } | LoadError::Other(_) => "loader_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LoadError::UnknownField { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
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
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for LoadError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "field loading failed");
        }
        let details = match &self {
            LoadError::UnknownField { field, .. } | LoadError::Loader { field, .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
