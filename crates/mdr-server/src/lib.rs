//! HTTP server with a markdown response pipeline.
//!
//! Serves a directory of static files with axum. Requests below configured
//! locations can be turned into markdown responses in one of two ways:
//!
//! - **filter** routes: the static responder answers as usual and the
//!   [`MarkdownFilter`] rewrites the response on its way out, replacing the file
//!   body with the rendered document. The length of the rendered body is not
//!   known when headers are produced, so these responses carry no
//!   `Content-Length`.
//! - **handler** routes: the [`MarkdownHandler`] replaces the static responder,
//!   renders the document itself and answers with an exact `Content-Length`.
//!
//! Both support `raw` output (markdown source served as `text/plain`) and `html`
//! output.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use mdr_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         root: PathBuf::from("public"),
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! request ──► RouteTable (longest prefix)
//!                 │
//!                 ├─► MarkdownHandler (handler routes) ──┐
//!                 │        │ declined                   │
//!                 │        ▼                            │
//!                 └─► StaticResponder ──────────────────┤
//!                                                       ▼
//!                            OutputPipeline: MarkdownFilter ──► RangeFilter ──► client
//! ```

mod app;
mod chain;
mod error;
mod filter;
mod handler;
mod host;
mod render;
mod resolve;
mod response;
mod state;
mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use mdr_config::RouteTable;
use mdr_renderer::{Converter, MarkdownConverter, RenderFlags};

pub use chain::{Buffer, BufferChain, BufferData, FileRegion, find_terminal};
pub use error::ServerError;
pub use filter::{
    FilterContext, FilterError, MarkdownFilter, OutputFilter, OutputPipeline, RangeFilter,
};
pub use handler::{HandlerOutcome, MarkdownHandler};
pub use render::RenderError;
pub use resolve::{PathResolver, ResolveError, RootResolver, normalize_path};
pub use response::{
    HostResponse, ResponseMetadata, TEXT_HTML, TEXT_HTML_UTF8, TEXT_PLAIN, TEXT_PLAIN_UTF8,
    content_type_for,
};
pub use static_files::StaticResponder;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Directory served as the site root.
    pub root: PathBuf,
    /// Markdown configuration per location.
    pub routes: RouteTable,
    /// Markdown extensions used when rendering.
    pub render_flags: RenderFlags,
    /// Enable verbose output.
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7979,
            root: PathBuf::from("public"),
            routes: RouteTable::default(),
            render_flags: RenderFlags::default(),
            verbose: false,
        }
    }
}

/// Build the application router without binding a socket.
#[must_use]
pub fn build_router(config: &ServerConfig) -> Router {
    build_router_with_converter(config, Arc::new(MarkdownConverter))
}

/// Build the application router with a custom markdown converter.
#[must_use]
pub fn build_router_with_converter(config: &ServerConfig, converter: Arc<dyn Converter>) -> Router {
    app::create_router(Arc::new(app::build_state(config, converter)))
}

/// Run the server.
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(&config);

    if config.verbose {
        for route in config.routes.iter() {
            tracing::info!(
                prefix = %route.prefix,
                enabled = route.config.enabled,
                output = ?route.config.output_mode,
                engine = ?route.config.engine,
                "Markdown location"
            );
        }
    }

    // Bind and run server
    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, root = %config.root.display(), "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from MDR config.
///
/// # Arguments
///
/// * `config` - MDR configuration
/// * `verbose` - Enable verbose output
#[must_use]
pub fn server_config_from_mdr_config(config: &mdr_config::Config, verbose: bool) -> ServerConfig {
    let render = config.render;
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        root: config.site_resolved.root.clone(),
        routes: config.routes.clone(),
        render_flags: RenderFlags {
            toc: render.toc,
            autolink: render.autolink,
            tab_stop: render.tab_stop,
            footnotes: render.footnotes,
        },
        verbose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_server_config_from_mdr_config() {
        let mut config = mdr_config::Config::default();
        config.render.footnotes = false;
        let server = server_config_from_mdr_config(&config, true);

        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 7979);
        assert!(server.root.ends_with("public"));
        assert!(!server.render_flags.footnotes);
        assert!(server.render_flags.toc);
        assert!(server.verbose);
    }

    #[test]
    fn test_pipeline_order() {
        let pipeline = app::build_pipeline(
            Arc::new(MarkdownConverter),
            RenderFlags::default(),
        );
        assert_eq!(pipeline.names().collect::<Vec<_>>(), vec!["markdown", "range"]);
    }
}
