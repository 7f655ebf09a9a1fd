use tracing::{error, info};

use crate::turn::{CompletedTurn, TurnError};

/// What the page shows after an interaction.
///
/// A new page load is always `AwaitingInput`; a submission ends in one of the
/// other states and the next interaction starts over. There is no retry state.
#[derive(Clone, Debug)]
pub enum SessionState {
    AwaitingInput,
    Displayed(CompletedTurn),
    /// Input problem the user can fix (no image, wrong file type).
    Warning(&'static str),
    ErrorShown(&'static str),
}

impl SessionState {
    pub fn from_outcome(outcome: Result<CompletedTurn, TurnError>) -> Self {
        match outcome {
            Ok(completed) => Self::Displayed(completed),
            Err(err) if err.is_warning() => {
                info!(%err, "Submission rejected.");
                Self::Warning(err.user_message())
            }
            Err(err) => {
                error!(%err, "Turn failed.");
                Self::ErrorShown(err.user_message())
            }
        }
    }
}
