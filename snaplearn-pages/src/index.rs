use axum::extract::{Multipart, State};
use axum::response::Html;
use snaplearn_core::{Data, SessionState, run_turn};
use snaplearn_ledger::History;

use crate::error::PageError;
use crate::form::read_submit_form;
use crate::view::render_page;

/// `GET /`
pub async fn show(State(data): State<Data>) -> Result<Html<String>, PageError> {
    let history = load_history(&data).await?;
    Ok(Html(render_page("", &SessionState::AwaitingInput, &history)?))
}

/// `POST /`
pub async fn submit(
    State(data): State<Data>,
    multipart: Multipart,
) -> Result<Html<String>, PageError> {
    let form = read_submit_form(multipart).await?;
    let state = SessionState::from_outcome(run_turn(&data, &form.input, form.image).await);

    let history = load_history(&data).await?;
    Ok(Html(render_page(&form.input, &state, &history)?))
}

async fn load_history(data: &Data) -> Result<History, PageError> {
    let ledger = data.ledger.clone();
    tokio::task::spawn_blocking(move || ledger.load_all())
        .await
        .map_err(|err| PageError::Internal(format!("history load task failed: {err}")))
}
