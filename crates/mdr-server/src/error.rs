//! Error types for the HTTP server.

use std::path::PathBuf;

use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::filter::FilterError;
use crate::render::RenderError;
use crate::resolve::ResolveError;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// File not found at the given path.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Path names something that cannot be served, e.g. a directory.
    #[error("Access forbidden: {}", .0.display())]
    Forbidden(PathBuf),

    /// Method the static responder does not serve.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(Method),

    /// Malformed request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request path could not be mapped to a file.
    #[error("Path resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Markdown conversion failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// An output filter failed.
    #[error("Output filter error: {0}")]
    Filter(#[from] FilterError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Status code the error is answered with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::Resolve(ResolveError::Traversal(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Resolve(_) | Self::Render(_) | Self::Filter(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = format!(
            "{} {}\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        );

        let mut response = (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))],
            body,
        )
            .into_response();
        if let Self::MethodNotAllowed(_) = self {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServerError::NotFound(PathBuf::from("x")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::Resolve(ResolveError::Traversal("/..".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServerError::Resolve(ResolveError::NulByte).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServerError::BadRequest("body".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let response = ServerError::MethodNotAllowed(Method::POST).into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
    }
}
