use crate::error::ServerResult;
use crate::handler::{Flow, Handler, HandlerResult};
use crate::http::mime::{self, TEXT_PLAIN};
use crate::http::{reason_phrase, Method, Request, Response};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Serves files below a root directory for GET and HEAD requests.
///
/// Paths that would escape the root are answered with `403 Forbidden`.
/// Missing files fall through to the next layer, unless SPA fallback is
/// enabled, in which case `index.html` is served instead.
#[derive(Clone, Debug)]
pub struct StaticFiles {
    root: PathBuf,
    skip_prefix: Option<String>,
    spa_fallback: bool,
}

pub fn serve_static<P: Into<PathBuf>>(root: P) -> StaticFiles {
    StaticFiles::new(root)
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            skip_prefix: None,
            spa_fallback: false,
        }
    }

    /// Requests under this prefix are left to later layers.
    pub fn skip_prefix(mut self, prefix: &str) -> Self {
        self.skip_prefix = Some(prefix.to_string());
        self
    }

    pub fn spa_fallback(mut self, enabled: bool) -> Self {
        self.spa_fallback = enabled;
        self
    }

    async fn serve(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        if req.method != Method::GET && req.method != Method::HEAD {
            return Ok(Flow::Next);
        }

        let raw = req.path.split('?').next().unwrap_or("/");
        let decoded = match urlencoding::decode(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => return Ok(reject(res, 400)),
        };

        if let Some(prefix) = &self.skip_prefix {
            if decoded.starts_with(prefix.as_str()) {
                return Ok(Flow::Next);
            }
        }
        if decoded.contains('\0') {
            return Ok(reject(res, 400));
        }

        let decoded = decoded.replace('\\', "/");
        let Some(relative) = normalize_relative(decoded.trim_start_matches('/')) else {
            debug!(path = %req.path, "rejected path escaping the static root");
            return Ok(reject(res, 403));
        };
        let relative = if relative.is_empty() {
            "index.html".to_string()
        } else {
            relative
        };
        let target = self.root.join(&relative);

        if !self.is_inside_root(&target).await {
            return Ok(reject(res, 403));
        }

        if req.method == Method::HEAD {
            return match tokio::fs::metadata(&target).await {
                Ok(meta) if meta.is_file() => {
                    res.content_type(mime::mime_for_path(&target))
                        .set("Content-Length", meta.len().to_string())
                        .send("");
                    Ok(Flow::Halt)
                }
                _ => Ok(Flow::Next),
            };
        }

        if send_with_validators(res, &target).await.is_ok() {
            return Ok(Flow::Halt);
        }
        if self.spa_fallback && send_with_validators(res, &self.root.join("index.html")).await.is_ok() {
            return Ok(Flow::Halt);
        }
        Ok(Flow::Next)
    }

    // Symlinks may still point outside even after lexical normalization.
    async fn is_inside_root(&self, target: &Path) -> bool {
        let (Ok(root), Ok(resolved)) = (
            tokio::fs::canonicalize(&self.root).await,
            tokio::fs::canonicalize(target).await,
        ) else {
            return true;
        };
        resolved.starts_with(root)
    }
}

impl Handler for StaticFiles {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.serve(req, res))
    }
}

fn reject(res: &mut Response, status: u16) -> Flow {
    res.status(status)
        .content_type(TEXT_PLAIN)
        .send(reason_phrase(status));
    Flow::Halt
}

async fn send_with_validators(res: &mut Response, path: &Path) -> ServerResult<()> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "not a file").into());
    }

    if let Ok(modified) = meta.modified() {
        res.set("Last-Modified", httpdate::fmt_http_date(modified));
        let secs = modified
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        res.set("ETag", format!("\"{}-{}\"", meta.len(), secs));
    }

    res.send_file(path).await?;
    Ok(())
}

/// POSIX-style lexical normalization of a relative path. Returns `None` when
/// the path climbs above its starting point.
fn normalize_relative(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return None;
                }
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}
