//! Layer registration and dispatch.
//!
//! Routes are registered on a [`RouterBuilder`]; [`RouterBuilder::build`]
//! freezes them into a [`Router`], an immutable, cheaply clonable list of
//! layers that any number of requests may walk at the same time.
//!
//! Dispatch walks the layers in registration order. A layer runs when its
//! method filter admits the request, its pattern matches the path, and its
//! kind agrees with the error state: normal layers run while no error is
//! pending, error layers only while one is. The walk stops as soon as the
//! response is committed, a handler returns [`Flow::Halt`], or the layers
//! run out.

mod layer;
mod mount;
mod path;

pub use layer::MethodFilter;
pub use path::{normalize_path, PathPattern};

use crate::error::{ServerError, ServerResult};
use crate::handler::{boxed, guarded, verb_methods, BoxedHandler, ErrorHandler, Flow, Handler, HandlerResult};
use crate::http::mime::TEXT_PLAIN;
use crate::http::{reason_phrase, Method, Request, Response};
use layer::{Layer, LayerKind};
use mount::Mount;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Default)]
pub struct RouterBuilder {
    layers: Vec<Layer>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    verb_methods! {
        get => Method::GET;
        post => Method::POST;
        put => Method::PUT;
        patch => Method::PATCH;
        delete => Method::DELETE;
        head => Method::HEAD;
        options => Method::OPTIONS;
        /// Any method, exact path.
        all => MethodFilter::All;
    }

    /// Registers a handler chain; build one with [`chain!`](crate::chain).
    pub fn route<M: Into<MethodFilter>>(&mut self, method: M, path: &str, chain: Vec<BoxedHandler>) -> &mut Self {
        self.push(Layer::new(method.into(), path, LayerKind::Normal(chain)))
    }

    /// Middleware for every request.
    pub fn use_handler<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.use_at("/", handler)
    }

    /// Middleware for every request under `path`. The handler sees the full,
    /// unstripped path.
    pub fn use_at<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.push(Layer::new(
            MethodFilter::Use,
            path,
            LayerKind::Normal(vec![boxed(handler)]),
        ))
    }

    pub fn use_error<E: ErrorHandler>(&mut self, handler: E) -> &mut Self {
        self.use_error_at("/", handler)
    }

    pub fn use_error_at<E: ErrorHandler>(&mut self, path: &str, handler: E) -> &mut Self {
        self.push(Layer::new(
            MethodFilter::Use,
            path,
            LayerKind::ErrorHandler(Arc::new(handler)),
        ))
    }

    /// Delegates everything under `path` to `router`, which sees the path
    /// with the prefix stripped.
    pub fn mount(&mut self, path: &str, router: Router) -> &mut Self {
        let base = normalize_path(path);
        let pattern = base.clone();
        self.use_at(&pattern, Mount::new(base, router))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn build(self) -> Router {
        Router {
            layers: self.layers.into(),
        }
    }

    fn push(&mut self, layer: Layer) -> &mut Self {
        self.layers.push(layer);
        self
    }
}

/// A frozen, ordered list of layers.
#[derive(Clone)]
pub struct Router {
    layers: Arc<[Layer]>,
}

#[derive(Default)]
struct DispatchState {
    cursor: usize,
    pending: Option<ServerError>,
    halted: bool,
}

impl DispatchState {
    /// Records a handler outcome. Returns whether the chain may continue.
    fn apply(&mut self, outcome: HandlerResult) -> bool {
        match outcome {
            Ok(Flow::Next) => true,
            Ok(Flow::Halt) => {
                self.halted = true;
                false
            }
            Err(err) => {
                debug!(error = %err, "handler raised an error");
                self.pending = Some(err);
                false
            }
        }
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Dispatches one request and returns the finalized wire bytes.
    ///
    /// Fails only when an error is still pending after the walk, i.e. no
    /// error layer committed a response for it.
    pub async fn handle(&self, mut req: Request) -> ServerResult<Vec<u8>> {
        let mut res = Response::new();
        self.dispatch(&mut req, &mut res, false).await?;
        Ok(res.finalize())
    }

    /// Walks the layers for one request.
    ///
    /// With `fallthrough` set (mounted routers) nothing is synthesized when no
    /// layer commits: `Flow::Next` tells the caller to keep going and a
    /// pending error is returned as `Err`. At the top level an uncommitted,
    /// error-free walk ends in a plain-text 404.
    pub(crate) async fn dispatch(&self, req: &mut Request, res: &mut Response, fallthrough: bool) -> HandlerResult {
        let path = normalize_path(&req.path);
        let mut state = DispatchState::default();

        while state.cursor < self.layers.len() && !res.is_committed() && !state.halted {
            let layer = &self.layers[state.cursor];
            state.cursor += 1;

            if !layer.method.admits(req.method) {
                continue;
            }
            let Some(params) = layer.pattern.matches(&path) else {
                continue;
            };
            // Later matches replace earlier captures wholesale.
            if layer.pattern.has_params() {
                req.params = params;
            }
            match (&layer.kind, state.pending.as_ref()) {
                (LayerKind::ErrorHandler(handler), Some(err)) => {
                    debug!(method = %req.method, path = %path, layer = layer.pattern.as_str(), "running error layer");
                    let outcome = guarded(req, res, |req, res| handler.call(err, req, res)).await;
                    state.apply(outcome);
                }
                (LayerKind::Normal(chain), None) => {
                    debug!(method = %req.method, path = %path, layer = layer.pattern.as_str(), "running layer");
                    for handler in chain.iter() {
                        if res.is_committed() {
                            break;
                        }
                        let outcome = guarded(req, res, |req, res| handler.call(req, res)).await;
                        if !state.apply(outcome) {
                            break;
                        }
                    }
                }
                // Normal layers sit out while an error is pending, error layers while none is.
                _ => continue,
            }
        }

        if res.is_committed() {
            return Ok(Flow::Halt);
        }
        if let Some(err) = state.pending {
            return Err(err);
        }
        if fallthrough {
            return Ok(if state.halted { Flow::Halt } else { Flow::Next });
        }

        res.status(404)
            .content_type(TEXT_PLAIN)
            .send(reason_phrase(404));
        Ok(Flow::Halt)
    }
}
