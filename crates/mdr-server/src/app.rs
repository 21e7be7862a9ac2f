//! Router construction.
//!
//! Builds the axum router, the output pipeline and the shared state.

use std::sync::Arc;

use axum::Router;
use mdr_renderer::{Converter, RenderFlags};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::ServerConfig;
use crate::filter::{MarkdownFilter, OutputPipeline, RangeFilter};
use crate::handler::MarkdownHandler;
use crate::host;
use crate::resolve::{PathResolver, RootResolver};
use crate::state::AppState;
use crate::static_files::StaticResponder;

/// Build the output pipeline: markdown first, ranges downstream.
pub(crate) fn build_pipeline(converter: Arc<dyn Converter>, flags: RenderFlags) -> OutputPipeline {
    OutputPipeline::new()
        .with_filter(MarkdownFilter::new(converter, flags))
        .with_filter(RangeFilter)
}

/// Build the application state for `config`.
pub(crate) fn build_state(config: &ServerConfig, converter: Arc<dyn Converter>) -> AppState {
    let resolver: Arc<dyn PathResolver> = Arc::new(RootResolver::new(config.root.clone()));

    AppState {
        routes: config.routes.clone(),
        pipeline: build_pipeline(Arc::clone(&converter), config.render_flags),
        handler: MarkdownHandler::new(Arc::clone(&resolver), converter, config.render_flags),
        static_files: StaticResponder::new(resolver),
    }
}

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(host::serve)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
