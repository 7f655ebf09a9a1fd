use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

/// Failures that prevent the page from being rendered at all.
///
/// Turn failures are not here: they are rendered into the page as messages.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("invalid form upload: {0}")]
    Upload(#[from] MultipartError),
    #[error("template error: {0}")]
    Render(#[from] minijinja::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            Self::Upload(err) => {
                warn!(error = %err, "rejected form upload");
                (err.status(), err.body_text()).into_response()
            }
            Self::Render(err) => {
                error!(error = %err, "page template failed to render");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            Self::Internal(message) => {
                error!(%message, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    }
}
