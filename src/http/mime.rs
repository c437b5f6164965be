use std::collections::HashMap;
use std::path::Path;

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";
pub const APPLICATION_X_WWW_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const IMAGE_GIF: &str = "image/gif";
pub const IMAGE_JPEG: &str = "image/jpeg";
pub const IMAGE_PNG: &str = "image/png";
pub const IMAGE_SVG_XML: &str = "image/svg+xml";
pub const IMAGE_WEBP: &str = "image/webp";
pub const IMAGE_X_ICON: &str = "image/x-icon";
pub const TEXT_CSS: &str = "text/css";
pub const TEXT_HTML: &str = "text/html";
pub const TEXT_JAVASCRIPT: &str = "text/javascript";
pub const TEXT_PLAIN: &str = "text/plain";

pub const UTF_8: &str = "utf-8";

/// Guesses a media type from the file extension.
pub fn mime_for_path<P: AsRef<Path>>(path: P) -> &'static str {
    let ext = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") => TEXT_HTML,
        Some("js") => TEXT_JAVASCRIPT,
        Some("css") => TEXT_CSS,
        Some("json") => APPLICATION_JSON,
        Some("png") => IMAGE_PNG,
        Some("jpg") | Some("jpeg") => IMAGE_JPEG,
        Some("gif") => IMAGE_GIF,
        Some("svg") => IMAGE_SVG_XML,
        Some("webp") => IMAGE_WEBP,
        Some("ico") => IMAGE_X_ICON,
        _ => APPLICATION_OCTET_STREAM,
    }
}

pub fn with_charset(content_type: &str, charset: &str) -> String {
    format!("{}; charset={}", content_type, charset)
}

/// Splits a Content-Type value into its lowercased essence and parameters.
pub fn parse_media_type(value: Option<&str>) -> (String, HashMap<String, String>) {
    let mut params = HashMap::new();
    let Some(value) = value else {
        return (String::new(), params);
    };

    let mut parts = value.split(';');
    let essence = parts.next().unwrap_or("").trim().to_ascii_lowercase();
    for param in parts {
        if let Some((k, v)) = param.split_once('=') {
            let k = k.trim();
            if k.is_empty() {
                continue;
            }
            params.insert(k.to_ascii_lowercase(), v.trim().trim_matches('"').to_string());
        }
    }
    (essence, params)
}

pub fn has_media_type(value: Option<&str>, expected: &str) -> bool {
    parse_media_type(value).0 == expected.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_by_extension() {
        assert_eq!(mime_for_path("/srv/app.JS"), TEXT_JAVASCRIPT);
        assert_eq!(mime_for_path("photo.jpeg"), IMAGE_JPEG);
        assert_eq!(mime_for_path("archive.tar.gz"), APPLICATION_OCTET_STREAM);
        assert_eq!(mime_for_path("Makefile"), APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn media_type_parameters() {
        let (essence, params) = parse_media_type(Some("Application/JSON; Charset=\"UTF-8\""));
        assert_eq!(essence, "application/json");
        assert_eq!(params.get("charset").map(String::as_str), Some("UTF-8"));
        assert!(has_media_type(Some("application/json; charset=utf-8"), APPLICATION_JSON));
        assert!(!has_media_type(None, APPLICATION_JSON));
    }
}
