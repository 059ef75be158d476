use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Invalid or unreadable configuration. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid<S: Into<String>>(var: &'static str, reason: S) -> Self {
        Self::Invalid { var, reason: reason.into() }
    }
}

/// Route registration failures, raised while the app is assembled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("invalid prefix `{prefix}` for group `{group}`: {reason}")]
    InvalidPrefix {
        group: String,
        prefix: String,
        reason: &'static str,
    },
    #[error("invalid path `{path}` in group `{group}`: {reason}")]
    InvalidPath {
        group: String,
        path: String,
        reason: &'static str,
    },
    #[error("route group `{0}` is already mounted")]
    DuplicateGroup(String),
    #[error("route group `{0}` has no routes")]
    EmptyGroup(String),
    #[error("route `{path}` of group `{incoming}` collides with group `{existing}`")]
    RouteConflict {
        path: String,
        existing: String,
        incoming: String,
    },
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("assembly: {0}")]
    Assembly(#[from] AssemblyError),
    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-time errors. Rendered as JSON with a stable code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(msg) = &self {
            tracing::error!(error = %msg, "request failed");
        }
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
