//! HTTP and WebSocket front end.
//!
//! - `GET /socket` upgrades to a WebSocket session on the board's hub.
//! - Every other path is served from the configured static directory.
//! - Every request is logged with the caller's device class.

mod access;
mod socket;

pub use access::{classify_device, DeviceClass};

use crate::board::Board;
use axum::{middleware, routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

/// Path of the WebSocket endpoint.
pub const SOCKET_PATH: &str = "/socket";

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<Board>,
}

/// Build the application router for `board`.
pub fn router(board: Arc<Board>) -> Router {
    let static_files = ServeDir::new(&board.config().static_dir);
    let state = AppState { board };

    Router::new()
        .route(SOCKET_PATH, get(socket::socket_handler))
        .fallback_service(static_files)
        .layer(middleware::from_fn(access::log_request))
        .with_state(state)
}

/// Serve `board` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, board: Arc<Board>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(board);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
