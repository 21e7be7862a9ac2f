//! Request dispatch.
//!
//! Every request is matched to a route, answered by the markdown handler or the
//! static responder, and sent through the output pipeline.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::Extensions;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::error::ServerError;
use crate::filter::FilterContext;
use crate::handler::HandlerOutcome;
use crate::resolve::normalize_path;
use crate::response::ResponseMetadata;
use crate::state::AppState;

/// Fallback handler serving every path.
pub(crate) async fn serve(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    match dispatch(&state, &parts, body).await {
        Ok(response) => response,
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                tracing::error!(path = %parts.uri.path(), error = %e, "Request failed");
            } else {
                tracing::debug!(
                    path = %parts.uri.path(),
                    status = %status,
                    error = %e,
                    "Request rejected"
                );
            }
            e.into_response()
        }
    }
}

async fn dispatch(state: &AppState, request: &Parts, body: Body) -> Result<Response, ServerError> {
    // Routes and files are both looked up on the normalized path.
    let path = normalize_path(request.uri.path())?;
    let route = Arc::clone(&state.routes.lookup(&path).config);

    let mut meta = ResponseMetadata::default();
    let response = if route.handler_enabled() {
        match state.handler.handle(&route, request, &path, body, &mut meta).await? {
            HandlerOutcome::Respond(response) => response,
            HandlerOutcome::Declined => state.static_files.respond(request, &path, meta).await?,
        }
    } else {
        state.static_files.respond(request, &path, meta).await?
    };

    let mut filter_state = Extensions::new();
    let mut ctx = FilterContext {
        route: &route,
        request,
        state: &mut filter_state,
    };
    Ok(state.pipeline.send(&mut ctx, response).await?)
}
