use crate::error::{ServerError, ServerResult};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest request body accepted, in bytes.
    pub body_limit: usize,
    pub static_root: PathBuf,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            body_limit: 1024 * 1024,
            static_root: PathBuf::from("public"),
            max_connections: 256,
        }
    }
}

impl ServerConfig {
    /// Reads `HOST_SERVER`, `PORT_SERVER`, `LIMIT_BODY_REQUEST`,
    /// `PATH_STATIC` and `MAX_CONNECTIONS`, keeping defaults for unset ones.
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup("HOST_SERVER") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT_SERVER") {
            config.port = parse_var("PORT_SERVER", &port)?;
        }
        if let Some(limit) = lookup("LIMIT_BODY_REQUEST") {
            config.body_limit = parse_var("LIMIT_BODY_REQUEST", &limit)?;
        }
        if let Some(root) = lookup("PATH_STATIC") {
            config.static_root = PathBuf::from(root);
        }
        if let Some(max) = lookup("MAX_CONNECTIONS") {
            config.max_connections = parse_var("MAX_CONNECTIONS", &max)?;
        }
        Ok(config)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn static_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.static_root = root.into();
        self
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> ServerResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ServerError::ConfigError(format!("{} has an invalid value: {}", key, value)))
}

/// TLS configuration for HTTPS support
#[derive(Clone, Debug)]
pub struct TlsConfig {
    cert_file: PathBuf,
    key_file: PathBuf,
}

impl TlsConfig {
    pub fn new<P: AsRef<Path>>(cert_file: P, key_file: P) -> Self {
        Self {
            cert_file: cert_file.as_ref().to_path_buf(),
            key_file: key_file.as_ref().to_path_buf(),
        }
    }

    pub(crate) fn load_certs(&self) -> ServerResult<Vec<CertificateDer<'static>>> {
        let mut reader = BufReader::new(File::open(&self.cert_file)?);
        let certs = rustls_pemfile::certs(&mut reader)
            .filter_map(|result| result.ok())
            .collect::<Vec<_>>();
        if certs.is_empty() {
            return Err(ServerError::ConfigError(format!(
                "no certificates found in {}",
                self.cert_file.display()
            )));
        }
        Ok(certs)
    }

    pub(crate) fn load_key(&self) -> ServerResult<PrivateKeyDer<'static>> {
        let mut reader = BufReader::new(File::open(&self.key_file)?);
        rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| {
            ServerError::ConfigError(format!("no private key found in {}", self.key_file.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.address(), "127.0.0.1:3000");
        assert_eq!(config.body_limit, 1024 * 1024);
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST_SERVER", "0.0.0.0"),
            ("PORT_SERVER", "8080"),
            ("LIMIT_BODY_REQUEST", "2048"),
            ("PATH_STATIC", "/srv/www"),
        ]))
        .unwrap();
        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(config.body_limit, 2048);
        assert_eq!(config.static_root, PathBuf::from("/srv/www"));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT_SERVER", "eighty")])).unwrap_err();
        assert!(matches!(err, ServerError::ConfigError(_)));
    }

    #[test]
    fn missing_key_file_is_an_io_error() {
        let tls = TlsConfig::new("/nonexistent/cert.pem", "/nonexistent/key.pem");
        assert!(matches!(tls.load_key(), Err(ServerError::IoError(_))));
    }
}
