//! Conversion off the async executor.

use std::sync::Arc;

use mdr_renderer::{ConvertError, Converter, RenderFlags, Rendered};

/// Conversion failure as seen by the server.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convert `source` on the blocking thread pool.
pub(crate) async fn render(
    converter: Arc<dyn Converter>,
    source: Vec<u8>,
    flags: RenderFlags,
) -> Result<Rendered, RenderError> {
    let rendered =
        tokio::task::spawn_blocking(move || converter.convert(&source, flags)).await??;
    Ok(rendered)
}
