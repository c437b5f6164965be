//! Stock handlers that plug into the router like any other middleware.

mod cors;
mod parsers;
mod static_files;

pub use cors::{cors, Cors, CorsConfig};
pub use parsers::{json, urlencoded, JsonBody, UrlEncodedBody};
pub use static_files::{serve_static, StaticFiles};
