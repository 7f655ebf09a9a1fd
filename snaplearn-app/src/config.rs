use std::path::PathBuf;
use std::time::Duration;

use snaplearn_utils::env::{env_non_empty, parse_or};

/// Settings read once at startup. The Gemini connection has its own
/// `GeminiConfig`.
#[derive(Clone, Debug)]
pub struct AppSettings {
    pub bind_address: String,
    pub ledger_path: PathBuf,
    pub prompt_file: PathBuf,
    pub reveal_delay: Duration,
    pub max_upload_bytes: usize,
}

impl AppSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(env_non_empty)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Self {
            bind_address: or("SNAPLEARN_BIND", "127.0.0.1:8501"),
            ledger_path: PathBuf::from(or("SNAPLEARN_LEDGER_PATH", "chat_history.csv")),
            prompt_file: PathBuf::from(or("SNAPLEARN_PROMPT_FILE", "INSTRUCTION_PROMPT.md")),
            reveal_delay: Duration::from_millis(parse_or(
                lookup("SNAPLEARN_REVEAL_DELAY_MS"),
                2000,
            )),
            max_upload_bytes: parse_or::<usize>(lookup("SNAPLEARN_MAX_UPLOAD_MB"), 200)
                .saturating_mul(1024 * 1024),
        }
    }
}
