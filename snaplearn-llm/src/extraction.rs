//! Best-effort extraction of the answer text from a model reply.
//!
//! The reply is expected to look like `label: "quoted text"`. That shape is
//! observed model behaviour, not a documented wire format, so every deviation
//! is reported as a [`NormalizeError`] instead of being patched over.

use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

use crate::vision::RawResponse;

/// Markers removed from the decoded answer, in this order.
const STRIPPED_MARKERS: [&str; 3] = ["```html", "\\", "```"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("the reply contained no content")]
    NoContent,
    #[error("the reply has no `label: value` separator")]
    MissingColon,
    #[error("the reply value is not a quoted string literal: {0}")]
    InvalidLiteral(String),
}

/// Extract the answer from the first content segment of a reply.
pub fn normalize_response(raw: &RawResponse) -> Result<String, NormalizeError> {
    let segment = raw.first_segment_text().ok_or(NormalizeError::NoContent)?;
    extract_answer(&segment)
}

/// Extract the answer from a segment already rendered as text.
///
/// Asterisks are dropped first, the text after the first colon is decoded as
/// a quoted literal, then the code-fence markers and any backslashes are removed.
pub fn extract_answer(segment: &str) -> Result<String, NormalizeError> {
    let without_emphasis = segment.replace('*', "");
    let (_, literal) = without_emphasis
        .split_once(':')
        .ok_or(NormalizeError::MissingColon)?;

    let mut answer = parse_quoted_literal(literal.trim())?;
    for marker in STRIPPED_MARKERS {
        answer = answer.replace(marker, "");
    }

    Ok(answer)
}

/// Decode exactly one single- or double-quoted string literal.
pub fn parse_quoted_literal(raw: &str) -> Result<String, NormalizeError> {
    let mut chars = raw.chars().peekable();
    let quote = match chars.next() {
        Some(quote @ ('"' | '\'')) => quote,
        Some(other) => return Err(invalid(format!("expected a quote, found `{}`", other))),
        None => return Err(invalid("empty value")),
    };

    let mut out = String::new();
    loop {
        match chars.next() {
            Some(ch) if ch == quote => break,
            Some('\n') => return Err(invalid("line break inside literal")),
            Some('\\') => decode_escape(&mut chars, &mut out)?,
            Some(ch) => out.push(ch),
            None => return Err(invalid("missing closing quote")),
        }
    }

    if chars.next().is_some() {
        return Err(invalid("text after closing quote"));
    }

    Ok(out)
}

/// Quote text so that [`parse_quoted_literal`] returns it unchanged.
pub(crate) fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn decode_escape(chars: &mut Peekable<Chars<'_>>, out: &mut String) -> Result<(), NormalizeError> {
    let Some(code) = chars.next() else {
        return Err(invalid("missing closing quote"));
    };

    match code {
        // Line continuation.
        '\n' => {}
        '\\' | '\'' | '"' => out.push(code),
        'n' => out.push('\n'),
        'r' => out.push('\r'),
        't' => out.push('\t'),
        'a' => out.push('\u{07}'),
        'b' => out.push('\u{08}'),
        'f' => out.push('\u{0c}'),
        'v' => out.push('\u{0b}'),
        'x' => out.push(code_point(read_hex(chars, 2)?)?),
        'u' => out.push(code_point(read_hex(chars, 4)?)?),
        'U' => out.push(code_point(read_hex(chars, 8)?)?),
        '0'..='7' => {
            let mut value = code.to_digit(8).unwrap_or_default();
            for _ in 0..2 {
                match chars.peek().and_then(|next| next.to_digit(8)) {
                    Some(digit) => {
                        value = value * 8 + digit;
                        chars.next();
                    }
                    None => break,
                }
            }
            out.push(code_point(value)?);
        }
        other => {
            out.push('\\');
            out.push(other);
        }
    }

    Ok(())
}

fn read_hex(chars: &mut Peekable<Chars<'_>>, digits: usize) -> Result<u32, NormalizeError> {
    let mut value = 0_u32;
    for _ in 0..digits {
        let Some(digit) = chars.next().and_then(|ch| ch.to_digit(16)) else {
            return Err(invalid(format!("truncated {}-digit hex escape", digits)));
        };
        value = value * 16 + digit;
    }
    Ok(value)
}

fn code_point(value: u32) -> Result<char, NormalizeError> {
    char::from_u32(value).ok_or_else(|| invalid(format!("invalid code point {:#x}", value)))
}

fn invalid(reason: impl Into<String>) -> NormalizeError {
    NormalizeError::InvalidLiteral(reason.into())
}
