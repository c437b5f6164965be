use crate::error::{ServerError, ServerResult};
use crate::http::{Request, Response};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// What a handler asks the router to do once it returns.
///
/// Returning `Err(error)` is the third option: the error becomes pending and
/// only error handlers run until the response is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Hand control to the next handler in the chain, then the next layer.
    Next,
    /// Stop dispatching this request.
    Halt,
}

pub type HandlerResult = ServerResult<Flow>;

pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, HandlerResult>;
}

/// Adapts a closure into a [`Handler`]. See [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F>(F);

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, req: &'a mut Request, res: &'a mut Response) -> BoxFuture<'a, HandlerResult> {
        (self.0)(req, res)
    }
}

/// Wraps a closure as a handler.
///
/// ```rust
/// use strand::handler::{handler_fn, Flow};
///
/// let hello = handler_fn(|_req, res| Box::pin(async move {
///     res.send("hello");
///     Ok(Flow::Halt)
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    HandlerFn(f)
}

/// A handler that only runs while an error is pending.
pub trait ErrorHandler: Send + Sync + 'static {
    fn call<'a>(
        &'a self,
        err: &'a ServerError,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult>;
}

#[derive(Clone)]
pub struct ErrorFn<F>(F);

impl<F> ErrorHandler for ErrorFn<F>
where
    F: for<'a> Fn(&'a ServerError, &'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    fn call<'a>(
        &'a self,
        err: &'a ServerError,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.0)(err, req, res)
    }
}

pub fn error_fn<F>(f: F) -> ErrorFn<F>
where
    F: for<'a> Fn(&'a ServerError, &'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    ErrorFn(f)
}

/// Generates the single-handler registration methods (`get`, `post`, ...)
/// on any builder with a `route(filter, path, chain)` method.
macro_rules! verb_methods {
    ($($(#[$meta:meta])* $name:ident => $filter:expr;)+) => {
        $(
            $(#[$meta])*
            pub fn $name<F>(&mut self, path: &str, handler: F) -> &mut Self
            where
                F: for<'a> Fn(
                        &'a mut $crate::http::Request,
                        &'a mut $crate::http::Response,
                    ) -> ::futures::future::BoxFuture<'a, $crate::handler::HandlerResult>
                    + Send
                    + Sync
                    + 'static,
            {
                self.route(
                    $filter,
                    path,
                    vec![$crate::handler::boxed($crate::handler::handler_fn(handler))],
                )
            }
        )+
    };
}

pub(crate) use verb_methods;

pub type BoxedHandler = Arc<dyn Handler>;
pub type BoxedErrorHandler = Arc<dyn ErrorHandler>;

pub fn boxed<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}

/// Starts a handler and drives its future, turning a panic in either step
/// into `ServerError::PanicError`.
///
/// Closure handlers may do work before they return their boxed future, so
/// the call itself has to happen inside the unwind guard too.
pub(crate) async fn guarded<'a, F>(req: &'a mut Request, res: &'a mut Response, start: F) -> HandlerResult
where
    F: FnOnce(&'a mut Request, &'a mut Response) -> BoxFuture<'a, HandlerResult>,
{
    let future = match panic::catch_unwind(AssertUnwindSafe(move || start(req, res))) {
        Ok(future) => future,
        Err(panic) => return Err(ServerError::PanicError(panic_message(panic))),
    };
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(ServerError::PanicError(panic_message(panic))),
    }
}

pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Builds a handler chain for `RouterBuilder::route`.
#[macro_export]
macro_rules! chain {
    ($($handler:expr),+ $(,)?) => {
        vec![$($crate::handler::boxed($handler)),+]
    };

    () => {
        compile_error!("The chain! macro requires at least one handler")
    };
}
