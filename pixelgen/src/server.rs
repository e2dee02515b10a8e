//! HTTP surface over the gallery.
//!
//! - `GET /ping` → fixed liveness string
//! - `GET /api/animations` → JSON array of artifact ids, newest first
//!   (`500` with `[]` when the directory can't be read)
//! - `GET /gen/{id}` → script text of one artifact

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use pixelgen_core::{Gallery, StoreError};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{error, info};

pub fn router(gallery: Gallery) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/api/animations", get(list_animations))
        .route("/gen/:id", get(artifact))
        .with_state(gallery)
}

/// Serve the gallery on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, gallery: Gallery, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "gallery listening");
    axum::serve(listener, router(gallery))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn ping(State(gallery): State<Gallery>) -> &'static str {
    gallery.health()
}

async fn list_animations(State(gallery): State<Gallery>) -> Response {
    let listing = gallery.list_available().await;
    let status =
        StatusCode::from_u16(listing.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        listing.to_json(),
    )
        .into_response()
}

async fn artifact(State(gallery): State<Gallery>, Path(id): Path<String>) -> Response {
    match gallery.artifact(&id).await {
        Ok(script) => (
            [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
            script,
        )
            .into_response(),
        Err(StoreError::InvalidId(_)) => StatusCode::BAD_REQUEST.into_response(),
        Err(StoreError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!(id = %id, error = %e, "failed to read artifact");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
