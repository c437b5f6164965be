//! # Strand
//!
//! An Express-style, middleware-chained HTTP router for Rust.
//!
//! ## Features
//!
//! - Ordered layers: route handlers, middleware and error middleware share
//!   one list and run in registration order
//! - Path patterns with `:name` parameters and `*` wildcards
//! - Mountable sub-routers that fall through to the parent
//! - Error routing: a failing handler skips ahead to the next error layer
//! - Body parsers, static files and CORS as ordinary middleware
//! - An adapter that never fails: escaped errors become a generic 500 JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use strand::app::Application;
//! use strand::handler::Flow;
//! use strand::json;
//!
//! fn main() {
//!     let mut app = Application::new();
//!
//!     // Add routes
//!     app.get("/", |_req, res| Box::pin(async move {
//!         res.send(json!({ "message": "Hello, World!" }));
//!         Ok(Flow::Halt)
//!     }));
//!
//!     // Start server
//!     app.listen().unwrap();
//! }
//! ```
//!
//! ## Middleware Usage
//!
//! ```rust
//! use strand::app::Application;
//! use strand::middleware::{cors, json};
//!
//! let mut app = Application::new();
//! app.use_handler(cors()).use_handler(json());
//! ```

pub mod adapter;
pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;
pub extern crate serde_json;

pub use adapter::{Adapter, ErrorReporter, Service, TracingReporter};
pub use app::Application;
pub use config::{ServerConfig, TlsConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{error_fn, handler_fn, ErrorHandler, Flow, Handler, HandlerResult};
pub use http::{Method, Payload, Request, Response};
pub use router::{MethodFilter, Router, RouterBuilder};
pub use server::Server;

// Reexport serde_json
pub use serde_json::{json, Value};
