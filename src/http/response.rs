//! The per-request response buffer.
//!
//! A [`Response`] accumulates status, headers and body while the router walks
//! its layers. Once it is committed (by `send`, `json`, `end`, `send_file`,
//! ...) every further mutation is ignored, and the router turns it into wire
//! bytes with [`Response::finalize`].

use crate::error::ServerResult;
use crate::http::mime::{self, APPLICATION_JSON, APPLICATION_OCTET_STREAM, IMAGE_SVG_XML, TEXT_PLAIN, UTF_8};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// A body handed to [`Response::send`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    Json(Value),
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Bytes(b)
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Payload::Bytes(b.to_vec())
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Json(v)
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Empty
    }
}

#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    committed: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Response {
        Response {
            status: 200,
            headers: Vec::new(),
            body: Vec::new(),
            committed: false,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let key = normalize_header_name(name);
        self.headers
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn status(&mut self, status: u16) -> &mut Self {
        if !self.committed {
            self.status = status;
        }
        self
    }

    pub fn set<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        if !self.committed {
            self.put_header(name.as_ref(), value.as_ref().to_string());
        }
        self
    }

    /// Adds a value to a header, comma-joining it with any existing value.
    pub fn append<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        if self.committed {
            return self;
        }
        let value = match self.get(name.as_ref()) {
            Some(existing) => format!("{}, {}", existing, value.as_ref()),
            None => value.as_ref().to_string(),
        };
        self.put_header(name.as_ref(), value);
        self
    }

    /// Sets Content-Type, adding a utf-8 charset to textual and JSON types.
    pub fn content_type(&mut self, content_type: &str) -> &mut Self {
        if self.committed {
            return self;
        }
        let lowered = content_type.to_ascii_lowercase();
        let textual = lowered.starts_with("text/") || lowered == APPLICATION_JSON;
        if textual && !lowered.contains("charset=") {
            let value = mime::with_charset(content_type, UTF_8);
            self.set("Content-Type", value)
        } else {
            self.set("Content-Type", content_type)
        }
    }

    pub fn location(&mut self, url: &str) -> &mut Self {
        self.set("Location", url)
    }

    /// Commits an empty-bodied redirect; `status` defaults to 302.
    pub fn redirect(&mut self, status: Option<u16>, url: &str) -> &mut Self {
        if self.committed {
            return self;
        }
        self.status(status.unwrap_or(302))
            .location(url)
            .send(Payload::Empty)
    }

    pub fn attachment(&mut self, filename: Option<&str>) -> &mut Self {
        match filename {
            Some(name) => self.set("Content-Disposition", format!("attachment; filename=\"{}\"", name)),
            None => self.set("Content-Disposition", "attachment"),
        }
    }

    /// Appends to the body. Returns `false` once the response is committed.
    pub fn write<B: AsRef<[u8]>>(&mut self, chunk: B) -> bool {
        if self.committed {
            return false;
        }
        self.body.extend_from_slice(chunk.as_ref());
        true
    }

    pub fn end<B: AsRef<[u8]>>(&mut self, chunk: Option<B>) -> &mut Self {
        if self.committed {
            return self;
        }
        if let Some(chunk) = chunk {
            self.write(chunk);
        }
        self.committed = true;
        self
    }

    pub fn send<P: Into<Payload>>(&mut self, payload: P) -> &mut Self {
        if self.committed {
            return self;
        }
        match payload.into() {
            Payload::Json(value) => {
                self.commit_json(value.to_string().into_bytes());
                return self;
            }
            Payload::Bytes(bytes) => {
                if self.get("Content-Type").is_none() {
                    self.set("Content-Type", APPLICATION_OCTET_STREAM);
                }
                self.body = bytes;
            }
            Payload::Text(text) => {
                self.default_text_type(&text);
                self.body = text.into_bytes();
            }
            Payload::Empty => {
                self.default_text_type("");
                self.body = Vec::new();
            }
        }
        self.committed = true;
        self
    }

    pub fn json<T: Serialize>(&mut self, value: &T) -> ServerResult<&mut Self> {
        if self.committed {
            return Ok(self);
        }
        let bytes = serde_json::to_vec(value)?;
        self.commit_json(bytes);
        Ok(self)
    }

    /// Reads a file and commits it with a type guessed from its extension.
    pub async fn send_file<P: AsRef<Path>>(&mut self, path: P) -> ServerResult<&mut Self> {
        if self.committed {
            return Ok(self);
        }
        let contents = tokio::fs::read(path.as_ref()).await?;
        self.content_type(mime::mime_for_path(path.as_ref()));
        self.set("Content-Length", contents.len().to_string());
        self.body = contents;
        self.committed = true;
        Ok(self)
    }

    pub async fn download<P: AsRef<Path>>(&mut self, path: P, filename: Option<&str>) -> ServerResult<&mut Self> {
        if filename.is_some() {
            self.attachment(filename);
        }
        self.send_file(path).await
    }

    /// Produces the wire bytes. Content-Length is filled in from the body
    /// when no handler set one.
    pub fn finalize(mut self) -> Vec<u8> {
        if self.get("Content-Length").is_none() {
            let length = self.body.len().to_string();
            self.put_header("Content-Length", length);
        }
        build_response(self.status, &self.headers, &self.body)
    }

    fn commit_json(&mut self, bytes: Vec<u8>) {
        self.set("Content-Type", mime::with_charset(APPLICATION_JSON, UTF_8));
        self.set("Content-Length", bytes.len().to_string());
        self.body = bytes;
        self.committed = true;
    }

    fn default_text_type(&mut self, text: &str) {
        if self.get("Content-Type").is_some() {
            return;
        }
        let essence = if text.trim_start().starts_with("<svg") {
            IMAGE_SVG_XML
        } else {
            TEXT_PLAIN
        };
        self.set("Content-Type", mime::with_charset(essence, UTF_8));
    }

    // Bypasses the commit guard; finalize needs it after commit.
    fn put_header(&mut self, name: &str, value: String) {
        let key = normalize_header_name(name);
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
    }
}

/// Canonicalizes the few header names the router itself reads; every other
/// name is kept exactly as given.
pub fn normalize_header_name(name: &str) -> String {
    match name.to_ascii_lowercase().as_str() {
        "content-type" => "Content-Type".to_string(),
        "content-length" => "Content-Length".to_string(),
        "connection" => "Connection".to_string(),
        "location" => "Location".to_string(),
        _ => name.to_string(),
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "OK",
    }
}

/// Status line, CRLF-terminated headers, blank line, body.
pub fn build_response(status: u16, headers: &[(String, String)], body: &[u8]) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));
    for (name, value) in headers {
        head += &format!("{}: {}\r\n", name, value);
    }
    head += "\r\n";

    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(res: Response) -> String {
        String::from_utf8(res.finalize()).unwrap()
    }

    #[test]
    fn defaults_to_200_and_empty_body() {
        let res = Response::new();
        assert_eq!(res.status_code(), 200);
        assert!(res.body().is_empty());
        assert!(!res.is_committed());
    }

    #[test]
    fn mutations_after_commit_are_ignored() {
        let mut res = Response::new();
        res.status(201).send("done");

        res.status(500).set("X-Late", "1").append("Content-Type", "x");
        assert!(!res.write("more"));
        res.send("again");
        res.end(Some("tail"));

        assert_eq!(res.status_code(), 201);
        assert_eq!(res.get("X-Late"), None);
        assert_eq!(res.get("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(res.body(), b"done");
    }

    #[test]
    fn normalizes_known_header_names_only() {
        let mut res = Response::new();
        res.set("content-type", "text/html").set("x-custom", "a");
        assert_eq!(res.get("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(res.get("x-custom"), Some("a"));
        assert_eq!(res.get("X-Custom"), None);
    }

    #[test]
    fn append_joins_with_comma() {
        let mut res = Response::new();
        res.append("Vary", "Origin").append("Vary", "Accept");
        assert_eq!(res.get("Vary"), Some("Origin, Accept"));
    }

    #[test]
    fn json_sets_type_and_length() {
        let mut res = Response::new();
        res.json(&json!({"ok": true})).unwrap();
        assert!(res.is_committed());
        assert_eq!(res.get("Content-Type"), Some("application/json; charset=utf-8"));
        assert_eq!(res.get("Content-Length"), Some("11"));
        assert_eq!(res.body(), br#"{"ok":true}"#);
    }

    #[test]
    fn send_guesses_svg_for_inline_markup() {
        let mut res = Response::new();
        res.send("  <svg xmlns=\"http://www.w3.org/2000/svg\"></svg>");
        assert_eq!(res.get("Content-Type"), Some("image/svg+xml; charset=utf-8"));
    }

    #[test]
    fn send_keeps_explicit_type() {
        let mut res = Response::new();
        res.content_type("text/html").send("<p>hi</p>");
        assert_eq!(res.get("Content-Type"), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn send_bytes_defaults_to_octet_stream() {
        let mut res = Response::new();
        res.send(vec![0xffu8, 0xd8]);
        assert_eq!(res.get("Content-Type"), Some(APPLICATION_OCTET_STREAM));
    }

    #[test]
    fn content_type_keeps_existing_charset() {
        let mut res = Response::new();
        res.content_type("text/plain; charset=latin1");
        assert_eq!(res.get("Content-Type"), Some("text/plain; charset=latin1"));
        res.content_type("image/png");
        assert_eq!(res.get("Content-Type"), Some("image/png"));
    }

    #[test]
    fn redirect_commits_with_location() {
        let mut res = Response::new();
        res.redirect(None, "/login");
        assert!(res.is_committed());
        assert_eq!(res.status_code(), 302);
        assert_eq!(res.get("location"), Some("/login"));
    }

    #[test]
    fn finalize_adds_content_length() {
        let mut res = Response::new();
        res.write("hello ");
        res.end(Some("world"));
        let text = wire(res);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.ends_with("\r\n\r\nhello world"));
    }

    #[test]
    fn finalize_keeps_explicit_content_length() {
        let mut res = Response::new();
        res.set("Content-Length", "42").send("");
        assert!(wire(res).contains("Content-Length: 42\r\n"));
    }

    #[test]
    fn unknown_status_uses_ok_reason() {
        let bytes = build_response(299, &[], b"");
        assert_eq!(bytes, b"HTTP/1.1 299 OK\r\n\r\n");
    }
}
