use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ServerError {
    IoError(io::Error),
    ParseError(String),
    BadRequest(String),
    Forbidden(String),
    NotFound,
    InternalError(String),
    PanicError(String),
    ConfigError(String),
}

impl ServerError {
    /// Shorthand for the error most handlers raise.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        ServerError::InternalError(message.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::BadRequest(_) => 400,
            ServerError::Forbidden(_) => 403,
            ServerError::NotFound => 404,
            ServerError::ParseError(_) => 400,
            ServerError::IoError(_)
            | ServerError::InternalError(_)
            | ServerError::PanicError(_)
            | ServerError::ConfigError(_) => 500,
        }
    }

    /// The bare message text, without the variant prefix `Display` adds.
    pub fn message(&self) -> String {
        match self {
            ServerError::IoError(err) => err.to_string(),
            ServerError::NotFound => "Not Found".to_string(),
            ServerError::ParseError(msg)
            | ServerError::BadRequest(msg)
            | ServerError::Forbidden(msg)
            | ServerError::InternalError(msg)
            | ServerError::PanicError(msg)
            | ServerError::ConfigError(msg) => {
                if msg.is_empty() {
                    "Internal Error".to_string()
                } else {
                    msg.clone()
                }
            }
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::IoError(err) => write!(f, "IO error: {}", err),
            ServerError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ServerError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ServerError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ServerError::NotFound => write!(f, "Not found"),
            ServerError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ServerError::PanicError(msg) => write!(f, "Panic: {}", msg),
            ServerError::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        ServerError::IoError(err)
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::ParseError(err.to_string())
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_drops_variant_prefix() {
        let err = ServerError::internal("boom");
        assert_eq!(err.to_string(), "Internal error: boom");
        assert_eq!(err.message(), "boom");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn empty_message_falls_back() {
        assert_eq!(ServerError::internal("").message(), "Internal Error");
    }

    #[test]
    fn json_errors_become_parse_errors() {
        let err: ServerError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, ServerError::ParseError(_)));
        assert_eq!(err.status_code(), 400);
    }
}
