//! A minimal "Hello, World!" server using strand
//!
//! Every GET to "/" is answered with plain text; `/echo` reflects the method
//! as JSON.

use strand::{json, Application, Flow, ServerResult};
use tracing_subscriber::EnvFilter;

fn main() -> ServerResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut app = Application::from_env()?;

    app.get("/", |_req, res| Box::pin(async move {
        res.send("Hello, World!");
        Ok(Flow::Halt)
    }));

    app.all("/echo", |req, res| Box::pin(async move {
        res.send(json!({ "method": req.method.as_str(), "ok": true }));
        Ok(Flow::Halt)
    }));

    app.listen()
}
