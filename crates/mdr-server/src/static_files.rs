//! Static file serving.
//!
//! The default responder: maps the request path below the site root and answers
//! with the file as a single file-backed buffer, leaving the bytes on disk until
//! the body is streamed.

use std::io::ErrorKind;
use std::sync::Arc;

use axum::http::request::Parts;
use axum::http::{Method, StatusCode};

use crate::chain::{Buffer, BufferChain, FileRegion};
use crate::error::ServerError;
use crate::resolve::PathResolver;
use crate::response::{HostResponse, ResponseMetadata};

/// Serves files below the site root.
#[derive(Clone)]
pub struct StaticResponder {
    resolver: Arc<dyn PathResolver>,
}

impl StaticResponder {
    #[must_use]
    pub fn new(resolver: Arc<dyn PathResolver>) -> Self {
        Self { resolver }
    }

    /// Answer `request` for the normalized `path`, keeping a content type already
    /// set on `meta`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] for unsupported methods, paths that cannot be
    /// resolved, missing files and directories.
    pub async fn respond(
        &self,
        request: &Parts,
        path: &str,
        mut meta: ResponseMetadata,
    ) -> Result<HostResponse, ServerError> {
        if request.method != Method::GET && request.method != Method::HEAD {
            return Err(ServerError::MethodNotAllowed(request.method.clone()));
        }

        let path = self.resolver.resolve(path)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ServerError::NotFound(path)),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(ServerError::Forbidden(path));
            }
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(ServerError::Forbidden(path));
        }

        if meta.content_type.is_none() {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            meta.set_content_type(mime.as_ref());
        }
        meta.status = StatusCode::OK;
        meta.content_length = Some(metadata.len());
        meta.accept_ranges = true;
        meta.last_modified = metadata.modified().ok();

        if request.method == Method::HEAD {
            return Ok(HostResponse::header_only(meta));
        }

        let region = FileRegion::new(
            Arc::new(file.into_std().await),
            path,
            0,
            metadata.len(),
        );
        let body = BufferChain::single(Buffer::file(region).terminal());
        Ok(HostResponse::new(meta, vec![body]))
    }
}
