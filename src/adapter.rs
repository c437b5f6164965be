//! The outermost entry point: runs the router and never fails.
//!
//! Whatever escapes dispatch (an unhandled error or a panic) is reported
//! through the injected [`ErrorReporter`] and answered with a generic
//! `500` JSON payload of the shape `{"error": <message>, "ok": false}`.

use crate::error::ServerError;
use crate::handler::panic_message;
use crate::http::{Request, Response};
use crate::router::Router;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Receives failures that escaped the router.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, error: &ServerError);
}

/// Logs escaped failures with `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &ServerError) {
        tracing::error!(event = "handle_error", error = %error.message(), status = error.status_code(), "request failed");
    }
}

/// Anything that turns a request into response bytes. The transport only
/// talks to this trait.
pub trait Service: Send + Sync + 'static {
    fn serve(&self, req: Request) -> BoxFuture<'_, Vec<u8>>;
}

#[derive(Clone)]
pub struct Adapter {
    router: Router,
    reporter: Arc<dyn ErrorReporter>,
}

impl Adapter {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_reporter<R: ErrorReporter>(self, reporter: R) -> Self {
        self.with_shared_reporter(Arc::new(reporter))
    }

    pub fn with_shared_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn handle(&self, req: Request) -> Vec<u8> {
        let outcome = AssertUnwindSafe(self.router.handle(req)).catch_unwind().await;
        let error = match outcome {
            Ok(Ok(bytes)) => return bytes,
            Ok(Err(err)) => err,
            Err(panic) => ServerError::PanicError(panic_message(panic)),
        };

        self.reporter.report(&error);
        error_response(&error)
    }
}

impl Service for Adapter {
    fn serve(&self, req: Request) -> BoxFuture<'_, Vec<u8>> {
        Box::pin(self.handle(req))
    }
}

/// Only the message text reaches the client.
fn error_response(error: &ServerError) -> Vec<u8> {
    let mut res = Response::new();
    res.status(500).send(json!({
        "error": error.message(),
        "ok": false
    }));
    res.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Flow;
    use crate::http::Method;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl ErrorReporter for Recorder {
        fn report(&self, error: &ServerError) {
            self.0.lock().unwrap().push(error.message());
        }
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    fn kaboom() -> crate::handler::HandlerResult {
        panic!("kaboom")
    }

    #[tokio::test]
    async fn passes_successful_responses_through() {
        let mut builder = Router::builder();
        builder.get("/", |_req, res| Box::pin(async move {
            res.send("hi");
            Ok(Flow::Halt)
        }));
        let recorder = Recorder::default();
        let adapter = Adapter::new(builder.build()).with_reporter(recorder.clone());

        let wire = text(adapter.handle(Request::new(Method::GET, "/")).await);
        assert!(wire.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(wire.ends_with("\r\n\r\nhi"));
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unhandled_errors_become_500_json() {
        let mut builder = Router::builder();
        builder.get("/boom", |_req, _res| Box::pin(async move { Err(ServerError::internal("boom")) }));
        let recorder = Recorder::default();
        let adapter = Adapter::new(builder.build()).with_reporter(recorder.clone());

        let wire = text(adapter.handle(Request::new(Method::GET, "/boom")).await);
        assert!(wire.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(wire.contains("Content-Type: application/json; charset=utf-8\r\n"));
        assert!(wire.ends_with(r#"{"error":"boom","ok":false}"#));
        assert_eq!(*recorder.0.lock().unwrap(), vec!["boom".to_string()]);
    }

    #[tokio::test]
    async fn panics_are_contained() {
        let mut builder = Router::builder();
        builder.get("/panic", |_req, _res| Box::pin(async move { kaboom() }));
        let adapter = Adapter::new(builder.build()).with_reporter(Recorder::default());

        let wire = text(adapter.handle(Request::new(Method::GET, "/panic")).await);
        assert!(wire.starts_with("HTTP/1.1 500"));
        assert!(wire.contains(r#""error":"kaboom""#));
    }
}
