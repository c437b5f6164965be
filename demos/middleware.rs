//! Middleware example for strand
//!
//! This example demonstrates:
//! - A request logger implemented as a `Handler`
//! - An auth check guarding a mounted router
//! - An error layer that turns failures into JSON
//! - Static files and CORS

use futures::future::BoxFuture;
use strand::middleware::{cors, serve_static};
use strand::{
    error_fn, handler_fn, json, Application, Flow, Handler, HandlerResult, Request, Response, Router, ServerError,
    ServerResult,
};
use tracing_subscriber::EnvFilter;

// Logs the method and path of every request before passing it on
struct Logger;

impl Handler for Logger {
    fn call<'a>(&'a self, req: &'a mut Request, _res: &'a mut Response) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            tracing::info!(method = %req.method, path = %req.path, "incoming request");
            Ok(Flow::Next)
        })
    }
}

fn main() -> ServerResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut app = Application::from_env()?;
    let static_root = app.config().static_root.clone();

    app.use_handler(Logger)
        .use_handler(cors())
        .use_handler(serve_static(static_root).skip_prefix("/api"));

    app.get("/public", |_req, res| Box::pin(async move {
        res.send("This is a public endpoint");
        Ok(Flow::Halt)
    }));

    let mut protected = Router::builder();
    protected.use_handler(handler_fn(|req, _res| Box::pin(async move {
        match req.header("authorization") {
            Some(token) if token.starts_with("Bearer ") => Ok(Flow::Next),
            _ => Err(ServerError::Forbidden("Authentication required".to_string())),
        }
    })));
    protected.get("/profile", |_req, res| Box::pin(async move {
        res.send(json!({
            "name": "User",
            "email": "user@example.com"
        }));
        Ok(Flow::Halt)
    }));
    app.mount("/api", protected.build());

    app.use_error(error_fn(|err, _req, res| Box::pin(async move {
        res.status(err.status_code())
            .send(json!({ "ok": false, "error": err.message() }));
        Ok(Flow::Halt)
    })));

    app.listen()
}
