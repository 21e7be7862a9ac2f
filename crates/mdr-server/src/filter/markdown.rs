//! Markdown output filter.

use std::sync::Arc;

use async_trait::async_trait;
use mdr_config::OutputMode;
use mdr_renderer::{Converter, RenderFlags};

use super::{FilterContext, FilterError, OutputFilter};
use crate::chain::{Buffer, BufferChain, BufferData};
use crate::render::render;
use crate::response::{ResponseMetadata, content_type_for};

/// Rewrites responses on filter routes into markdown responses.
///
/// The header stage advertises the markdown content type and drops the length
/// and range support of the file. In `html` mode the body stage swaps
/// the file-backed buffer that ends the body for the rendered document.
#[derive(Clone)]
pub struct MarkdownFilter {
    converter: Arc<dyn Converter>,
    flags: RenderFlags,
}

impl MarkdownFilter {
    #[must_use]
    pub fn new(converter: Arc<dyn Converter>, flags: RenderFlags) -> Self {
        Self { converter, flags }
    }
}

#[async_trait]
impl OutputFilter for MarkdownFilter {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn filter_headers(&self, ctx: &mut FilterContext<'_>, meta: &mut ResponseMetadata) {
        let route = ctx.route;
        if !route.filter_enabled() {
            return;
        }

        tracing::debug!(path = %ctx.request.uri.path(), "Markdown header filter");
        meta.set_content_type(content_type_for(route.output_mode, route.use_utf8));
        meta.clear_content_length();
        meta.clear_accept_ranges();
    }

    async fn filter_body(
        &self,
        ctx: &mut FilterContext<'_>,
        mut chain: BufferChain,
    ) -> Result<BufferChain, FilterError> {
        let route = ctx.route;
        if !route.filter_enabled() || route.output_mode == OutputMode::Raw {
            return Ok(chain);
        }

        let Some(index) = chain.terminal_index() else {
            return Ok(chain);
        };
        let BufferData::File(region) = &chain.buffers()[index].data else {
            tracing::debug!(
                path = %ctx.request.uri.path(),
                "Terminal buffer is in memory, passing through"
            );
            return Ok(chain);
        };
        tracing::debug!(path = %region.path().display(), "Found terminal file buffer");

        let source = region
            .read_file()
            .await
            .map_err(|source| FilterError::Read {
                path: region.path().display().to_string(),
                source,
            })?;
        let rendered = render(Arc::clone(&self.converter), source, self.flags).await?;

        tracing::debug!(len = rendered.len(), "Replacing terminal buffer");
        chain.replace(index, Buffer::memory(rendered.into_bytes()).terminal());
        Ok(chain)
    }
}
