use chrono::NaiveDateTime;
use snaplearn_utils::time::{format_ledger_timestamp, now_local_seconds};

/// One completed exchange: what the user asked and what the model answered.
///
/// Turns are created once per successful submission and never change afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    timestamp: NaiveDateTime,
    user_input: String,
    bot_response: String,
}

impl ChatTurn {
    pub fn new(
        timestamp: NaiveDateTime,
        user_input: impl Into<String>,
        bot_response: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            user_input: user_input.into(),
            bot_response: bot_response.into(),
        }
    }

    /// Create a turn stamped with the current local time.
    pub fn now(user_input: impl Into<String>, bot_response: impl Into<String>) -> Self {
        Self::new(now_local_seconds(), user_input, bot_response)
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Timestamp as written to the `Datetime` column.
    pub fn formatted_timestamp(&self) -> String {
        format_ledger_timestamp(&self.timestamp)
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn bot_response(&self) -> &str {
        &self.bot_response
    }
}
