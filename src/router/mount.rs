use crate::handler::{Handler, HandlerResult};
use crate::http::{Request, Response};
use crate::router::path::normalize_path;
use crate::router::Router;
use futures::future::BoxFuture;

/// Runs a nested router in fallthrough mode under a path prefix.
pub(crate) struct Mount {
    base: String,
    router: Router,
}

impl Mount {
    pub(crate) fn new(base: String, router: Router) -> Self {
        Self { base, router }
    }
}

impl Handler for Mount {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let incoming = normalize_path(&req.path);
            let inner = strip_mount_prefix(&self.base, &incoming);

            // The nested walk sees its own path and params; the outer ones
            // come back once it returns.
            let outer_path = std::mem::replace(&mut req.path, inner);
            let outer_params = req.params.clone();
            let outcome = self.router.dispatch(req, res, true).await;
            req.path = outer_path;
            req.params = outer_params;

            outcome
        })
    }
}

fn strip_mount_prefix(base: &str, incoming: &str) -> String {
    match incoming.strip_prefix(base) {
        Some(rest) => normalize_path(rest),
        None => incoming.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::handler::{error_fn, Flow};
    use crate::http::Method;

    #[test]
    fn strips_prefix() {
        assert_eq!(strip_mount_prefix("/api", "/api/echo"), "/echo");
        assert_eq!(strip_mount_prefix("/api", "/api"), "/");
        assert_eq!(strip_mount_prefix("/", "/echo"), "/echo");
    }

    fn api() -> Router {
        let mut api = Router::builder();
        api.get("/echo", |req, res| {
            let path = req.path.clone();
            Box::pin(async move {
                res.send(format!("inner {}", path));
                Ok(Flow::Halt)
            })
        })
        .get("/fail", |_req, _res| Box::pin(async move { Err(ServerError::internal("inner failure")) }))
        .get("/strict/:n", |req, res| {
            let n: u32 = req.param("n").unwrap_or_default().parse().expect("numeric n");
            Box::pin(async move {
                res.send(n.to_string());
                Ok(Flow::Halt)
            })
        })
        .get("/items/:id", |req, res| {
            let id = req.param("id").unwrap_or_default().to_string();
            Box::pin(async move {
                res.send(id);
                Ok(Flow::Halt)
            })
        });
        api.build()
    }

    async fn run(router: &Router, path: &str) -> (Response, Request) {
        let mut req = Request::new(Method::GET, path);
        let mut res = Response::new();
        router.dispatch(&mut req, &mut res, false).await.unwrap();
        (res, req)
    }

    #[tokio::test]
    async fn delegates_with_stripped_path() {
        let mut app = Router::builder();
        app.mount("/api", api());
        let (res, req) = run(&app.build(), "/api/echo").await;
        assert_eq!(res.body(), b"inner /echo");
        assert_eq!(req.path, "/api/echo");
    }

    #[tokio::test]
    async fn inner_miss_falls_through_to_outer_layers() {
        let mut app = Router::builder();
        app.mount("/api", api()).get("/api/other", |req, res| {
            let path = req.path.clone();
            Box::pin(async move {
                res.send(format!("outer {}", path));
                Ok(Flow::Halt)
            })
        });
        let router = app.build();

        let (res, _) = run(&router, "/api/other").await;
        assert_eq!(res.body(), b"outer /api/other");

        let (res, _) = run(&router, "/api/nothing").await;
        assert_eq!(res.status_code(), 404);
    }

    #[tokio::test]
    async fn inner_errors_reach_outer_error_layers() {
        let mut app = Router::builder();
        app.mount("/api", api()).use_error(error_fn(|err, _req, res| {
            let message = err.message();
            Box::pin(async move {
                res.status(502).send(message);
                Ok(Flow::Halt)
            })
        }));
        let (res, _) = run(&app.build(), "/api/fail").await;
        assert_eq!(res.status_code(), 502);
        assert_eq!(res.body(), b"inner failure");
    }

    #[tokio::test]
    async fn inner_panics_reach_outer_error_layers() {
        let mut app = Router::builder();
        app.mount("/api", api()).use_error(error_fn(|err, req, res| {
            let caught = matches!(err, ServerError::PanicError(_));
            let path = req.path.clone();
            Box::pin(async move {
                res.status(400).send(format!("{} {}", caught, path));
                Ok(Flow::Halt)
            })
        }));
        let (res, req) = run(&app.build(), "/api/strict/abc").await;
        assert_eq!(res.status_code(), 400);
        assert_eq!(res.body(), b"true /api/strict/abc");
        assert!(req.params.is_empty());
    }

    #[tokio::test]
    async fn inner_params_do_not_leak_out() {
        let mut app = Router::builder();
        app.mount("/api", api());
        let (res, req) = run(&app.build(), "/api/items/9").await;
        assert_eq!(res.body(), b"9");
        assert!(req.params.is_empty());
    }

    #[tokio::test]
    async fn nested_mounts_strip_each_prefix() {
        let mut v1 = Router::builder();
        v1.mount("/v1", api());
        let mut app = Router::builder();
        app.mount("/api", v1.build());
        let (res, _) = run(&app.build(), "/api/v1/echo").await;
        assert_eq!(res.body(), b"inner /echo");
    }
}
