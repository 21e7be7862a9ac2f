//! Markdown content handler.
//!
//! Serves handler routes in place of the static responder. In `raw` mode it only
//! presets the plain text content type and lets the static responder send the
//! file. In `html` mode it renders the document itself and answers with an exact
//! `Content-Length`, so no output filter has to touch the body.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{Method, StatusCode};
use mdr_config::{OutputMode, RouteConfig};
use mdr_renderer::{Converter, RenderFlags};
use tokio::io::AsyncReadExt;

use crate::chain::{Buffer, BufferChain};
use crate::error::ServerError;
use crate::render::render;
use crate::resolve::PathResolver;
use crate::response::{HostResponse, ResponseMetadata, content_type_for};

/// Largest request body read and thrown away before answering.
const DISCARD_LIMIT: usize = 64 * 1024;

/// Result of running the handler.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// The request is left to the static responder.
    Declined,
    /// The handler produced the response.
    Respond(HostResponse),
}

/// Renders markdown files for handler routes.
#[derive(Clone)]
pub struct MarkdownHandler {
    resolver: Arc<dyn PathResolver>,
    converter: Arc<dyn Converter>,
    flags: RenderFlags,
}

/// Source file of a request being rendered.
struct RenderContext {
    path: PathBuf,
    file: tokio::fs::File,
}

impl RenderContext {
    async fn open(path: PathBuf) -> Result<Self, ServerError> {
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Self { path, file }),
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "Cannot open markdown source"
                );
                Err(ServerError::NotFound(path))
            }
        }
    }

    /// Read the whole source, closing the file.
    async fn load(mut self) -> Result<Vec<u8>, ServerError> {
        let mut source = Vec::new();
        match self.file.read_to_end(&mut source).await {
            Ok(_) => Ok(source),
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "Cannot read markdown source"
                );
                Err(ServerError::NotFound(self.path))
            }
        }
    }
}

impl MarkdownHandler {
    #[must_use]
    pub fn new(
        resolver: Arc<dyn PathResolver>,
        converter: Arc<dyn Converter>,
        flags: RenderFlags,
    ) -> Self {
        Self {
            resolver,
            converter,
            flags,
        }
    }

    /// Handle a request on a handler route.
    ///
    /// `path` is the normalized request path. `meta` is the pending response of
    /// the request; a declined request keeps whatever the handler set on it.
    ///
    /// # Errors
    ///
    /// - [`ServerError::BadRequest`] if the request body cannot be read
    /// - [`ServerError::Resolve`] if the path cannot be mapped
    /// - [`ServerError::NotFound`] if the source cannot be opened or read
    /// - [`ServerError::Render`] if conversion fails
    pub async fn handle(
        &self,
        route: &RouteConfig,
        request: &Parts,
        path: &str,
        body: Body,
        meta: &mut ResponseMetadata,
    ) -> Result<HandlerOutcome, ServerError> {
        if request.method != Method::GET && request.method != Method::HEAD {
            return Ok(HandlerOutcome::Declined);
        }

        axum::body::to_bytes(body, DISCARD_LIMIT)
            .await
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;

        meta.set_content_type(content_type_for(route.output_mode, route.use_utf8));
        if route.output_mode == OutputMode::Raw {
            return Ok(HandlerOutcome::Declined);
        }

        let file = self.resolver.resolve(path)?;
        let source = RenderContext::open(file).await?.load().await?;
        let rendered = render(Arc::clone(&self.converter), source, self.flags).await?;

        meta.status = StatusCode::OK;
        meta.content_length = Some(rendered.len() as u64);
        tracing::debug!(
            path,
            len = rendered.len(),
            "Markdown handler sending headers"
        );

        let meta = std::mem::take(meta);
        if request.method == Method::HEAD {
            return Ok(HandlerOutcome::Respond(HostResponse::header_only(meta)));
        }
        let body = BufferChain::single(Buffer::memory(rendered.into_bytes()).terminal());
        Ok(HandlerOutcome::Respond(HostResponse::new(meta, vec![body])))
    }
}
