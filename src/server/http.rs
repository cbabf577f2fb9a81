//! HTTP surface
//!
//! - `GET /ws` upgrades to the client websocket
//! - `GET /debug` dumps simulator, client, variable and record state as text
//! - `GET /simvars` lists pooled variables as text

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::sim::SimSource;
use crate::transport::session::run_ws_session;
use crate::transport::ChannelTransport;

use super::context::HubContext;

struct HttpState<S: SimSource> {
    ctx: Arc<HubContext<S, ChannelTransport>>,
    shutdown: CancellationToken,
    sessions: TaskTracker,
}

impl<S: SimSource> Clone for HttpState<S> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            shutdown: self.shutdown.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

/// Build the router
///
/// Every websocket session is registered with `sessions` so shutdown can
/// wait for their queues to flush.
pub fn routes<S: SimSource>(
    ctx: Arc<HubContext<S, ChannelTransport>>,
    shutdown: CancellationToken,
    sessions: TaskTracker,
) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade::<S>))
        .route("/debug", get(debug::<S>))
        .route("/simvars", get(simvars::<S>))
        .with_state(HttpState {
            ctx,
            shutdown,
            sessions,
        })
}

/// Serve HTTP until shutdown is requested
pub async fn serve<S: SimSource>(
    listener: TcpListener,
    ctx: Arc<HubContext<S, ChannelTransport>>,
    shutdown: CancellationToken,
    sessions: TaskTracker,
) {
    let app = routes(ctx, shutdown.clone(), sessions);
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }
    tracing::info!("HTTP server stopped");
}

async fn ws_upgrade<S: SimSource>(
    ws: WebSocketUpgrade,
    State(state): State<HttpState<S>>,
) -> Response {
    let transport = Arc::clone(&state.ctx.transport);
    let shutdown = state.shutdown.clone();
    let grace = state.ctx.config.shutdown_grace;
    let session = state.sessions.token();

    ws.on_upgrade(move |socket| async move {
        run_ws_session(transport, socket, shutdown, grace).await;
        drop(session);
    })
}

async fn debug<S: SimSource>(State(state): State<HttpState<S>>) -> Response {
    let stats = state.ctx.stats().await;
    plain_text(stats.render_debug())
}

async fn simvars<S: SimSource>(State(state): State<HttpState<S>>) -> Response {
    let stats = state.ctx.stats().await;
    plain_text(stats.render_simvars())
}

fn plain_text(body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body,
    )
        .into_response()
}
