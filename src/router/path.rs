//! Route pattern compilation.
//!
//! Patterns are `/`-separated segments. A segment starting with `:` captures
//! the matching input segment, `*` as the last segment matches any remaining
//! segments, and everything else must match exactly. Matching is strictly
//! left to right and stops at the first mismatch.

use std::collections::HashMap;

/// Forces a leading `/` and strips a trailing one (except for the root).
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let mut path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<String>,
    wildcard: bool,
    has_params: bool,
}

impl PathPattern {
    pub fn compile(pattern: &str) -> Self {
        let source = normalize_path(pattern);
        let mut segments: Vec<String> = source.split('/').map(str::to_string).collect();
        let wildcard = segments.last().map(|s| s == "*").unwrap_or(false);
        if wildcard {
            segments.pop();
        }
        let has_params = segments.iter().any(|s| s.starts_with(':'));

        Self {
            source,
            segments,
            wildcard,
            has_params,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn has_params(&self) -> bool {
        self.has_params
    }

    /// Returns the captured parameters on a hit, `None` on a miss.
    pub fn matches(&self, input: &str) -> Option<HashMap<String, String>> {
        let input = normalize_path(input);
        let parts: Vec<&str> = input.split('/').collect();

        if !self.wildcard && parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (index, segment) in self.segments.iter().enumerate() {
            if segment == "*" {
                break;
            }
            let part = parts.get(index)?;
            if let Some(name) = segment.strip_prefix(':') {
                params.insert(name.to_string(), decode_segment(part));
            } else if segment != part {
                return None;
            }
        }

        Some(params)
    }
}

fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    }
}
