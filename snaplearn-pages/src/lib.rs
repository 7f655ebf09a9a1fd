//! The interactive page: one form, the latest answer, and the history table.

mod error;
mod form;
mod health;
mod index;
mod view;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use snaplearn_core::Data;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use error::PageError;

/// Build the application router.
pub fn router(data: Data, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index::show).post(index::submit))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(data)
}
