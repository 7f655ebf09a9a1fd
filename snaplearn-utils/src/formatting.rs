use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::ACCEPTED_IMAGE_EXTENSIONS;

/// Map an image file name to its MIME type, for accepted extensions only.
pub fn mime_for_file_name(file_name: &str) -> Option<&'static str> {
    let (_, extension) = file_name.trim().rsplit_once('.')?;
    let extension = extension.to_ascii_lowercase();
    if !ACCEPTED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return None;
    }

    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// Normalize a declared content type (`image/jpg` -> `image/jpeg`, parameters dropped).
pub fn normalize_mime(raw: &str) -> String {
    let essence = raw
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_owned(),
        _ => essence,
    }
}

/// Build an inline `data:` URL for previewing an uploaded image.
pub fn image_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

/// Shorten text for log lines, on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let flattened = text.replace(['\n', '\r'], " ");
    let mut chars = flattened.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::{excerpt, image_data_url, mime_for_file_name, normalize_mime};

    #[test]
    fn maps_accepted_extensions_only() {
        assert_eq!(mime_for_file_name("cat.JPG"), Some("image/jpeg"));
        assert_eq!(mime_for_file_name("cat.jpeg"), Some("image/jpeg"));
        assert_eq!(mime_for_file_name("diagram.png"), Some("image/png"));
        assert_eq!(mime_for_file_name("anim.gif"), None);
        assert_eq!(mime_for_file_name("noextension"), None);
    }

    #[test]
    fn normalizes_declared_mime_types() {
        assert_eq!(normalize_mime("image/JPG"), "image/jpeg");
        assert_eq!(normalize_mime("image/png; charset=binary"), "image/png");
        assert_eq!(normalize_mime(""), "");
    }

    #[test]
    fn builds_data_urls() {
        assert_eq!(image_data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn excerpts_are_flattened_and_truncated() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("line one\nline two", 8), "line one...");
        assert_eq!(excerpt("héllo", 2), "hé...");
    }
}
