use crate::handler::{Flow, Handler, HandlerResult};
use crate::http::{Method, Request, Response};
use futures::future::BoxFuture;

#[derive(Clone, Debug)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age: Option<u32>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PUT".to_string(),
                "PATCH".to_string(),
                "DELETE".to_string(),
                "OPTIONS".to_string(),
            ],
            allow_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            allow_credentials: false,
            max_age: Some(86400),
        }
    }
}

impl CorsConfig {
    fn allows(&self, origin: &str) -> bool {
        self.allow_origins.iter().any(|o| o == "*" || o == origin)
    }
}

/// Answers preflight requests and decorates everything else with the
/// allowed origin before passing it on.
#[derive(Clone, Debug)]
pub struct Cors {
    config: CorsConfig,
}

pub fn cors() -> Cors {
    Cors::new(CorsConfig::default())
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    fn decorate(&self, req: &Request, res: &mut Response) {
        if let Some(origin) = req.header("origin") {
            if self.config.allows(origin) {
                res.set("Access-Control-Allow-Origin", origin);
                res.append("Vary", "Origin");
            }
        }
        if self.config.allow_credentials {
            res.set("Access-Control-Allow-Credentials", "true");
        }
    }

    async fn handle(&self, req: &mut Request, res: &mut Response) -> HandlerResult {
        self.decorate(req, res);

        if req.method != Method::OPTIONS {
            return Ok(Flow::Next);
        }

        res.status(204)
            .set("Access-Control-Allow-Methods", self.config.allow_methods.join(", "))
            .set("Access-Control-Allow-Headers", self.config.allow_headers.join(", "));
        if let Some(max_age) = self.config.max_age {
            res.set("Access-Control-Max-Age", max_age.to_string());
        }
        res.end(None::<&[u8]>);
        Ok(Flow::Halt)
    }
}

impl Handler for Cors {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.handle(req, res))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preflight_is_answered() {
        let mut req = Request::new(Method::OPTIONS, "/api/echo").with_header("Origin", "https://app.example");
        let mut res = Response::new();
        let flow = cors().call(&mut req, &mut res).await.unwrap();

        assert_eq!(flow, Flow::Halt);
        assert!(res.is_committed());
        assert_eq!(res.status_code(), 204);
        assert_eq!(res.get("Access-Control-Allow-Origin"), Some("https://app.example"));
        assert_eq!(res.get("Access-Control-Max-Age"), Some("86400"));
        assert!(res.body().is_empty());
    }

    #[tokio::test]
    async fn simple_requests_continue_with_headers() {
        let mut req = Request::new(Method::GET, "/").with_header("origin", "https://app.example");
        let mut res = Response::new();
        let flow = cors().call(&mut req, &mut res).await.unwrap();

        assert_eq!(flow, Flow::Next);
        assert!(!res.is_committed());
        assert_eq!(res.get("Access-Control-Allow-Origin"), Some("https://app.example"));
    }

    #[tokio::test]
    async fn unknown_origins_get_nothing() {
        let config = CorsConfig {
            allow_origins: vec!["https://trusted.example".to_string()],
            ..CorsConfig::default()
        };
        let mut req = Request::new(Method::GET, "/").with_header("Origin", "https://evil.example");
        let mut res = Response::new();
        Cors::new(config).call(&mut req, &mut res).await.unwrap();
        assert_eq!(res.get("Access-Control-Allow-Origin"), None);
    }
}
