//! Output filters.
//!
//! Every response leaves the server through an [`OutputPipeline`]: an ordered
//! list of [`OutputFilter`]s built once by the application. For each response the
//! pipeline calls every filter's header stage once, in order, and then every
//! filter's body stage once per body batch. A filter can only see and change what
//! the filters before it produced.
//!
//! ```text
//! responder ──► markdown ──► range ──► client
//!                (headers, then each batch)
//! ```
//!
//! Body stages return errors instead of writing partial output; the pipeline
//! buffers nothing to the client until every batch went through every filter, so
//! a failed response can still be replaced by a 500.

mod markdown;
mod range;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;
use axum::http::{Extensions, Method};
use axum::response::Response;
use mdr_config::RouteConfig;

pub use markdown::MarkdownFilter;
pub use range::RangeFilter;

use crate::chain::BufferChain;
use crate::render::RenderError;
use crate::response::{HostResponse, ResponseMetadata};

/// Body stage failure.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// What a filter knows about the request it is processing.
pub struct FilterContext<'a> {
    /// Markdown configuration of the matched route.
    pub route: &'a RouteConfig,
    /// Request line and headers.
    pub request: &'a Parts,
    /// Per-request filter state, shared between the header and body stages.
    pub state: &'a mut Extensions,
}

/// A response filter with a header stage and a body stage.
#[async_trait]
pub trait OutputFilter: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Adjust the response metadata. Called once per response, before any body.
    fn filter_headers(&self, ctx: &mut FilterContext<'_>, meta: &mut ResponseMetadata);

    /// Transform one batch of the body. Called once per batch.
    async fn filter_body(
        &self,
        ctx: &mut FilterContext<'_>,
        chain: BufferChain,
    ) -> Result<BufferChain, FilterError> {
        let _ = ctx;
        Ok(chain)
    }
}

/// Ordered output filters.
#[derive(Clone, Default)]
pub struct OutputPipeline {
    filters: Vec<Arc<dyn OutputFilter>>,
}

impl OutputPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `filter` downstream of the filters already added.
    #[must_use]
    pub fn with_filter(mut self, filter: impl OutputFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Filter names, upstream first.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.iter().map(|f| f.name())
    }

    /// Run every header stage.
    pub fn run_headers(&self, ctx: &mut FilterContext<'_>, meta: &mut ResponseMetadata) {
        for filter in &self.filters {
            filter.filter_headers(ctx, meta);
        }
    }

    /// Run every body stage over one batch.
    ///
    /// # Errors
    ///
    /// Returns the first body stage failure.
    pub async fn run_body(
        &self,
        ctx: &mut FilterContext<'_>,
        mut chain: BufferChain,
    ) -> Result<BufferChain, FilterError> {
        for filter in &self.filters {
            chain = filter.filter_body(ctx, chain).await?;
        }
        Ok(chain)
    }

    /// Run a response through the pipeline and build what is sent to the client.
    ///
    /// # Errors
    ///
    /// Returns the first body stage failure; nothing of the response is kept.
    pub async fn send(
        &self,
        ctx: &mut FilterContext<'_>,
        response: HostResponse,
    ) -> Result<Response, FilterError> {
        let HostResponse {
            mut meta,
            batches,
            header_only,
        } = response;

        self.run_headers(ctx, &mut meta);
        if header_only || ctx.request.method == Method::HEAD {
            // An empty chain has no exact size, so no `Content-Length: 0` is
            // derived for a body whose length is unknown.
            return Ok(meta.into_response(BufferChain::new().into_body()));
        }

        let mut body = BufferChain::new();
        for batch in batches {
            body.append(self.run_body(ctx, batch).await?);
        }
        tracing::debug!(buffers = body.len(), "Response body ready");
        Ok(meta.into_response(body.into_body()))
    }
}

impl std::fmt::Debug for OutputPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chain::Buffer;
    use axum::body::HttpBody;
    use axum::http::Request;
    use pretty_assertions::assert_eq;

    pub(crate) fn parts(method: Method, uri: &str) -> Parts {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    struct Tag(&'static str);

    #[async_trait]
    impl OutputFilter for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn filter_headers(&self, _ctx: &mut FilterContext<'_>, meta: &mut ResponseMetadata) {
            let previous = meta.content_type.take().unwrap_or_default();
            meta.set_content_type(format!("{previous}{}", self.0));
        }

        async fn filter_body(
            &self,
            _ctx: &mut FilterContext<'_>,
            mut chain: BufferChain,
        ) -> Result<BufferChain, FilterError> {
            chain.push(Buffer::memory(self.0));
            Ok(chain)
        }
    }

    #[test]
    fn test_names_in_order() {
        let pipeline = OutputPipeline::new().with_filter(Tag("a")).with_filter(Tag("b"));
        assert_eq!(pipeline.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(format!("{pipeline:?}"), r#"["a", "b"]"#);
    }

    #[tokio::test]
    async fn test_send_runs_stages_in_order() {
        let pipeline = OutputPipeline::new().with_filter(Tag("a")).with_filter(Tag("b"));
        let route = RouteConfig::default();
        let request = parts(Method::GET, "/x");
        let mut state = Extensions::new();
        let mut ctx = FilterContext {
            route: &route,
            request: &request,
            state: &mut state,
        };

        let response = HostResponse::new(
            ResponseMetadata::default(),
            vec![
                BufferChain::single(Buffer::memory("1")),
                BufferChain::single(Buffer::memory("2").terminal()),
            ],
        );
        let response = pipeline.send(&mut ctx, response).await.unwrap();
        assert_eq!(response.headers()["content-type"], "ab");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.as_ref(), b"1ab2ab");
    }

    #[tokio::test]
    async fn test_send_head_skips_body_stages() {
        let pipeline = OutputPipeline::new().with_filter(Tag("a"));
        let route = RouteConfig::default();
        let request = parts(Method::HEAD, "/x");
        let mut state = Extensions::new();
        let mut ctx = FilterContext {
            route: &route,
            request: &request,
            state: &mut state,
        };

        let response = HostResponse::new(
            ResponseMetadata::default(),
            vec![BufferChain::single(Buffer::memory("body").terminal())],
        );
        let response = pipeline.send(&mut ctx, response).await.unwrap();
        assert!(response.body().size_hint().exact().is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }
}
