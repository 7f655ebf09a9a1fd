use minijinja::{Environment, context};
use serde::Serialize;
use snaplearn_core::SessionState;
use snaplearn_ledger::History;
use snaplearn_utils::ACCEPTED_IMAGE_EXTENSIONS;

use crate::form::{IMAGE_FIELD, INPUT_FIELD};

const PAGE_TEMPLATE: &str = include_str!("../templates/index.html");

#[derive(Debug, Serialize)]
struct AnswerView<'a> {
    text: &'a str,
    image_preview: &'a str,
    saved: bool,
}

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    datetime: String,
    user_input: &'a str,
    bot_response: &'a str,
}

/// Render the full page for the given session state and history.
pub fn render_page(
    prompt: &str,
    state: &SessionState,
    history: &History,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("index.html", PAGE_TEMPLATE)?;

    let (answer, warning, error) = match state {
        SessionState::AwaitingInput => (None, None, None),
        SessionState::Displayed(completed) => (
            Some(AnswerView {
                text: completed.turn.bot_response(),
                image_preview: &completed.image_preview,
                saved: completed.saved,
            }),
            None,
            None,
        ),
        SessionState::Warning(message) => (None, Some(*message), None),
        SessionState::ErrorShown(message) => (None, None, Some(*message)),
    };

    let rows: Vec<HistoryRow<'_>> = history
        .turns()
        .iter()
        .map(|turn| HistoryRow {
            datetime: turn.formatted_timestamp(),
            user_input: turn.user_input(),
            bot_response: turn.bot_response(),
        })
        .collect();

    let accept = ACCEPTED_IMAGE_EXTENSIONS
        .iter()
        .map(|extension| format!(".{extension}"))
        .collect::<Vec<_>>()
        .join(",");

    let template = env.get_template("index.html")?;
    template.render(context! {
        prompt => prompt,
        accept => accept,
        input_field => INPUT_FIELD,
        image_field => IMAGE_FIELD,
        answer => answer,
        warning => warning,
        error => error,
        history_exists => history.file_exists(),
        history_empty => history.shows_empty_notice(),
        rows => rows,
    })
}
