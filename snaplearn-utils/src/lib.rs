/// Environment variable parsing helpers.
pub mod env;
/// Shared formatting helpers (MIME lookup, data URLs, log excerpts).
pub mod formatting;
/// Ledger timestamp helpers.
pub mod time;

/// File extensions the image upload control accepts.
pub const ACCEPTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
