//! HTTP/1.1 transport: accepts connections, parses one request per
//! connection, hands it to a [`Service`] and writes the bytes back.

use crate::adapter::Service;
use crate::config::{ServerConfig, TlsConfig};
use crate::error::{ServerError, ServerResult};
use crate::http::mime::{with_charset, TEXT_PLAIN, UTF_8};
use crate::http::{build_response, reason_phrase, Method, Request};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

const MAX_HEAD_LINE: usize = 8 * 1024;
const MAX_HEADERS: usize = 100;

/// Outcome of reading a request head and body off the wire.
#[derive(Debug)]
pub(crate) enum Incoming {
    Request(Request),
    /// The request could not be accepted; answer with this status.
    Reject(u16),
    /// The peer closed the connection before sending anything.
    Closed,
}

pub struct Server<S: Service> {
    service: Arc<S>,
    config: ServerConfig,
    tls: Option<TlsConfig>,
}

impl<S: Service> Server<S> {
    pub fn new(service: S, config: ServerConfig) -> Self {
        Self {
            service: Arc::new(service),
            config,
            tls: None,
        }
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Accepts connections until Ctrl-C. In-flight connections are left to
    /// finish on their own.
    pub async fn run(self) -> ServerResult<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address).await?;
        let acceptor = self.tls_acceptor()?;
        let permits = Arc::new(Semaphore::new(self.config.max_connections.max(1)));

        info!(
            address = %address,
            tls = acceptor.is_some(),
            max_connections = self.config.max_connections,
            "server listening"
        );

        loop {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            };

            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let service = Arc::clone(&self.service);
            let acceptor = acceptor.clone();
            let body_limit = self.config.body_limit;

            tokio::spawn(async move {
                let result = match acceptor {
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(tls_stream) => handle_connection(tls_stream, service.as_ref(), body_limit).await,
                        Err(e) => {
                            warn!(peer = %peer, error = %e, "TLS handshake failed");
                            Ok(())
                        }
                    },
                    None => handle_connection(stream, service.as_ref(), body_limit).await,
                };

                if let Err(e) = result {
                    debug!(peer = %peer, error = %e, "connection error");
                }
                drop(permit);
            });
        }

        Ok(())
    }

    fn tls_acceptor(&self) -> ServerResult<Option<TlsAcceptor>> {
        let Some(tls) = &self.tls else {
            return Ok(None);
        };
        let certs = tls.load_certs()?;
        let key = tls.load_key()?;
        let config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| ServerError::ConfigError(format!("invalid TLS certificate or key: {}", e)))?;
        Ok(Some(TlsAcceptor::from(Arc::new(config))))
    }
}

pub(crate) async fn handle_connection<T, S>(stream: T, service: &S, body_limit: usize) -> ServerResult<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: Service + ?Sized,
{
    let mut reader = BufReader::new(stream);

    let bytes = match read_request(&mut reader, body_limit).await? {
        Incoming::Closed => return Ok(()),
        Incoming::Reject(status) => {
            debug!(status, "rejected request");
            plain_status(status)
        }
        Incoming::Request(req) => {
            debug!(method = %req.method, path = %req.path, "request");
            service.serve(req).await
        }
    };

    let stream = reader.get_mut();
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(())
}

pub(crate) async fn read_request<R>(reader: &mut R, body_limit: usize) -> ServerResult<Incoming>
where
    R: AsyncBufRead + Unpin,
{
    let request_line = match read_line(reader).await? {
        Line::Text(line) if !line.is_empty() => line,
        Line::Text(_) | Line::Eof => return Ok(Incoming::Closed),
        Line::Invalid => return Ok(Incoming::Reject(400)),
    };

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Ok(Incoming::Reject(400));
    };
    let Some(version) = version.strip_prefix("HTTP/") else {
        return Ok(Incoming::Reject(400));
    };
    let Some(method) = Method::from_string(method) else {
        return Ok(Incoming::Reject(501));
    };

    let mut headers = HashMap::new();
    loop {
        let Line::Text(line) = read_line(reader).await? else {
            return Ok(Incoming::Reject(400));
        };
        if line.is_empty() {
            break;
        }
        if headers.len() >= MAX_HEADERS {
            return Ok(Incoming::Reject(400));
        }
        let Some((name, value)) = line.split_once(':') else {
            return Ok(Incoming::Reject(400));
        };
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    let length = match headers.get("content-length") {
        Some(value) => match value.parse::<usize>() {
            Ok(length) => length,
            Err(_) => return Ok(Incoming::Reject(400)),
        },
        None => 0,
    };
    if length > body_limit {
        return Ok(Incoming::Reject(413));
    }

    let mut body = Vec::with_capacity(length);
    reader.take(length as u64).read_to_end(&mut body).await?;
    if body.len() < length {
        return Ok(Incoming::Reject(400));
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (target, HashMap::new()),
    };

    let mut req = Request::new(method, path).with_body(body);
    req.http_version = version.to_string();
    req.query = query;
    req.headers = headers;
    Ok(Incoming::Request(req))
}

enum Line {
    Text(String),
    Eof,
    Invalid,
}

/// One CRLF- or LF-terminated line without its terminator.
async fn read_line<R>(reader: &mut R) -> ServerResult<Line>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = reader
        .take(MAX_HEAD_LINE as u64 + 2)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Ok(Line::Eof);
    }
    // Too long, or the peer hung up mid-line.
    if line.last() != Some(&b'\n') {
        return Ok(Line::Invalid);
    }
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }
    Ok(String::from_utf8(line).map_or(Line::Invalid, Line::Text))
}

/// Decodes `a=1&b=two+words`. Undecodable components are kept verbatim;
/// a repeated key keeps its last value.
pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn plain_status(status: u16) -> Vec<u8> {
    let body = reason_phrase(status).as_bytes();
    let headers = vec![
        ("Content-Type".to_string(), with_charset(TEXT_PLAIN, UTF_8)),
        ("Content-Length".to_string(), body.len().to_string()),
        ("Connection".to_string(), "close".to_string()),
    ];
    build_response(status, &headers, body)
}
