//! Routing example for strand
//!
//! This example demonstrates:
//! - Path parameters
//! - Query parameters
//! - JSON bodies
//! - A mounted sub-router under `/api`

use serde::{Deserialize, Serialize};
use strand::middleware::json;
use strand::{json, Application, Flow, Router, ServerError, ServerResult};
use tracing_subscriber::EnvFilter;

#[derive(Serialize, Deserialize)]
struct User {
    name: String,
    role: String,
}

fn main() -> ServerResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut app = Application::from_env()?;
    app.use_handler(json());

    app.get("/", |_req, res| Box::pin(async move {
        res.send("Welcome to the strand API server!");
        Ok(Flow::Halt)
    }));

    app.get("/users/:id", |req, res| Box::pin(async move {
        let id = req.param("id").unwrap_or_default().to_string();
        res.send(format!("User ID: {}", id));
        Ok(Flow::Halt)
    }));

    app.get("/search", |req, res| Box::pin(async move {
        let term = req.query.get("q").cloned().unwrap_or_default();
        res.send(json!({ "query": term, "results": [] }));
        Ok(Flow::Halt)
    }));

    app.post("/users", |req, res| Box::pin(async move {
        match req.json::<User>() {
            Some(user) => res.status(201).json(&user).map(|_| Flow::Halt),
            None => Err(ServerError::BadRequest("Invalid JSON body".to_string())),
        }
    }));

    let mut api = Router::builder();
    api.get("/status", |_req, res| Box::pin(async move {
        res.send(json!({
            "status": "operational",
            "version": "1.0.0"
        }));
        Ok(Flow::Halt)
    }));
    app.mount("/api", api.build());

    app.listen()
}
