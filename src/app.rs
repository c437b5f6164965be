//! Application is the main entry point for a strand server.
//!
//! It owns the top-level [`RouterBuilder`], the [`ServerConfig`] and an
//! optional TLS setup. [`Application::build`] freezes the routes into an
//! [`Adapter`]; [`Application::listen`] does the same and serves it.
//!
//! # Examples
//!
//! ```rust
//! use strand::app::Application;
//! use strand::handler::Flow;
//! use strand::json;
//!
//! let mut app = Application::new();
//! app.get("/", |_req, res| Box::pin(async move {
//!     res.send(json!({ "message": "Hello!" }));
//!     Ok(Flow::Halt)
//! }));
//! let adapter = app.build();
//! ```

use crate::adapter::{Adapter, ErrorReporter, TracingReporter};
use crate::config::{ServerConfig, TlsConfig};
use crate::error::ServerResult;
use crate::handler::{verb_methods, BoxedHandler, ErrorHandler, Handler};
use crate::http::Method;
use crate::router::{MethodFilter, Router, RouterBuilder};
use crate::server::Server;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

pub struct Application {
    router: RouterBuilder,
    config: ServerConfig,
    reporter: Arc<dyn ErrorReporter>,
    tls_config: Option<TlsConfig>,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            router: RouterBuilder::new(),
            config,
            reporter: Arc::new(TracingReporter),
            tls_config: None,
        }
    }

    /// Configuration read from the environment, see [`ServerConfig::from_env`].
    pub fn from_env() -> ServerResult<Self> {
        Ok(Self::with_config(ServerConfig::from_env()?))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ServerConfig {
        &mut self.config
    }

    /// Replaces the sink for errors that no error layer handled.
    pub fn reporter<R: ErrorReporter>(&mut self, reporter: R) -> &mut Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Configure TLS for HTTPS support
    pub fn with_tls<P: AsRef<Path>>(&mut self, cert_file: P, key_file: P) -> &mut Self {
        self.tls_config = Some(TlsConfig::new(cert_file, key_file));
        self
    }

    verb_methods! {
        get => Method::GET;
        post => Method::POST;
        put => Method::PUT;
        patch => Method::PATCH;
        delete => Method::DELETE;
        head => Method::HEAD;
        options => Method::OPTIONS;
        /// Any method, exact path.
        all => MethodFilter::All;
    }

    pub fn route<M: Into<MethodFilter>>(&mut self, method: M, path: &str, chain: Vec<BoxedHandler>) -> &mut Self {
        self.router.route(method, path, chain);
        self
    }

    pub fn use_handler<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.router.use_handler(handler);
        self
    }

    pub fn use_at<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.router.use_at(path, handler);
        self
    }

    pub fn use_error<E: ErrorHandler>(&mut self, handler: E) -> &mut Self {
        self.router.use_error(handler);
        self
    }

    pub fn use_error_at<E: ErrorHandler>(&mut self, path: &str, handler: E) -> &mut Self {
        self.router.use_error_at(path, handler);
        self
    }

    /// Mounts a router at a specific path
    pub fn mount(&mut self, path: &str, router: Router) -> &mut Self {
        self.router.mount(path, router);
        self
    }

    /// Freezes the routes into an [`Adapter`] that can be driven directly,
    /// without a socket.
    pub fn build(self) -> Adapter {
        Adapter::new(self.router.build()).with_shared_reporter(self.reporter)
    }

    /// Serves the application inside the current tokio runtime.
    pub async fn serve(self) -> ServerResult<()> {
        let config = self.config.clone();
        let tls = self.tls_config.clone();
        let mut server = Server::new(self.build(), config);
        if let Some(tls) = tls {
            server = server.with_tls(tls);
        }
        server.run().await
    }

    /// Starts the HTTP server on its own runtime and blocks until Ctrl-C.
    pub fn listen(self) -> ServerResult<()> {
        let runtime = Runtime::new()?;
        runtime.block_on(self.serve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{error_fn, handler_fn, Flow};
    use crate::http::Request;

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn routes_through_the_built_adapter() {
        let mut app = Application::new();
        app.use_handler(handler_fn(|_req, res| Box::pin(async move {
            res.set("X-Powered-By", "strand");
            Ok(Flow::Next)
        })))
        .get("/users/:id", |req, res| Box::pin(async move {
            let id = req.param("id").unwrap_or_default().to_string();
            res.send(id);
            Ok(Flow::Halt)
        }));
        let adapter = app.build();

        let wire = text(adapter.handle(Request::new(Method::GET, "/users/7")).await);
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.contains("X-Powered-By: strand\r\n"));
        assert!(wire.ends_with("\r\n\r\n7"));
    }

    #[tokio::test]
    async fn error_layers_answer_before_the_adapter() {
        let mut app = Application::new();
        app.get("/fail", |_req, _res| Box::pin(async move {
            Err(crate::error::ServerError::BadRequest("missing name".to_string()))
        }))
        .use_error(error_fn(|err, _req, res| Box::pin(async move {
            res.status(err.status_code()).send(err.message());
            Ok(Flow::Halt)
        })));

        let wire = text(app.build().handle(Request::new(Method::GET, "/fail")).await);
        assert!(wire.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(wire.ends_with("missing name"));
    }

    #[test]
    fn config_is_adjustable() {
        let mut app = Application::with_config(ServerConfig::default().port(8081));
        app.config_mut().body_limit = 10;
        assert_eq!(app.config().address(), "127.0.0.1:8081");
        assert_eq!(app.config().body_limit, 10);
    }
}
