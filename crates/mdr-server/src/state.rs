//! Application state.
//!
//! Shared state for all request handlers.

use mdr_config::RouteTable;

use crate::filter::OutputPipeline;
use crate::handler::MarkdownHandler;
use crate::static_files::StaticResponder;

/// Application state shared across all requests.
pub(crate) struct AppState {
    /// Resolved markdown configuration per location.
    pub(crate) routes: RouteTable,
    /// Filters every response passes through.
    pub(crate) pipeline: OutputPipeline,
    /// Content handler for handler routes.
    pub(crate) handler: MarkdownHandler,
    /// Default responder.
    pub(crate) static_files: StaticResponder,
}
