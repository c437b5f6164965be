use crate::handler::{BoxedErrorHandler, BoxedHandler};
use crate::http::Method;
use crate::router::path::PathPattern;

/// Which requests a layer accepts by method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodFilter {
    /// Middleware registered with `use`: any method, prefix match.
    Use,
    /// Any method, exact path.
    All,
    Only(Method),
}

impl MethodFilter {
    pub fn admits(&self, method: Method) -> bool {
        match self {
            MethodFilter::Use | MethodFilter::All => true,
            MethodFilter::Only(m) => *m == method,
        }
    }
}

impl From<Method> for MethodFilter {
    fn from(method: Method) -> Self {
        MethodFilter::Only(method)
    }
}

#[derive(Clone)]
pub(crate) enum LayerKind {
    Normal(Vec<BoxedHandler>),
    ErrorHandler(BoxedErrorHandler),
}

/// One registered routing rule.
#[derive(Clone)]
pub(crate) struct Layer {
    pub(crate) method: MethodFilter,
    pub(crate) pattern: PathPattern,
    pub(crate) kind: LayerKind,
}

impl Layer {
    /// `Use` layers match as a prefix, so their pattern gains a trailing `*`.
    pub(crate) fn new(method: MethodFilter, path: &str, kind: LayerKind) -> Self {
        let pattern = match method {
            MethodFilter::Use => PathPattern::compile(&mount_pattern(path)),
            _ => PathPattern::compile(path),
        };
        Self { method, pattern, kind }
    }
}

fn mount_pattern(path: &str) -> String {
    let cleaned = crate::router::path::normalize_path(path);
    if cleaned == "/" {
        "/*".to_string()
    } else {
        format!("{}/*", cleaned)
    }
}
