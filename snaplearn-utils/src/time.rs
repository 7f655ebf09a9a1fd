use chrono::{Local, NaiveDateTime, Timelike};

/// `Datetime` column format of the history ledger.
pub const LEDGER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local wall-clock time, truncated to whole seconds.
pub fn now_local_seconds() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

pub fn format_ledger_timestamp(value: &NaiveDateTime) -> String {
    value.format(LEDGER_TIMESTAMP_FORMAT).to_string()
}

pub fn parse_ledger_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), LEDGER_TIMESTAMP_FORMAT).ok()
}
