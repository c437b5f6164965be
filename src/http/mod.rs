pub mod mime;
pub(crate) mod request;
pub(crate) mod response;

pub use request::{Method, Request};
pub use response::{build_response, normalize_header_name, reason_phrase, Payload, Response};
