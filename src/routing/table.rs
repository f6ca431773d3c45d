//! Route registration and compilation.
//!
//! # Responsibilities
//! - Collect (method, path, handler) registrations under nested prefixes
//! - Detect conflicting registrations before axum sees them
//! - Compile the table into an axum `Router` with a fallback
//!
//! # Design Decisions
//! - `Any` on a path conflicts with every other method on that path
//! - A known path requested with an unregistered method goes to the fallback,
//!   like an unknown path; without a fallback axum answers 405
//! - Paths must be absolute; group prefixes lose their trailing slash when joined

use axum::{
    handler::Handler,
    http::Method,
    routing::{any, on, MethodFilter, MethodRouter},
    Router,
};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Method constraint of a route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// Matches every method.
    Any,
    /// Matches a single method.
    Only(Method),
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        RouteMethod::Only(method)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMethod::Any => f.write_str("ANY"),
            RouteMethod::Only(method) => write!(f, "{method}"),
        }
    }
}

/// Error raised while building the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route {method} {path} is already registered")]
    Duplicate { method: RouteMethod, path: String },

    #[error("route path '{0}' must start with '/'")]
    InvalidPath(String),

    #[error("method {0} cannot be routed")]
    UnsupportedMethod(Method),
}

/// A registered route, without its handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: RouteMethod,
    pub path: String,
}

/// Startup-time route registry.
pub struct RouteTable<S = ()> {
    routes: BTreeMap<String, MethodRouter<S>>,
    keys: Vec<RouteKey>,
    fallback: Option<MethodRouter<S>>,
}

impl<S> RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            routes: BTreeMap::new(),
            keys: Vec::new(),
            fallback: None,
        }
    }

    /// Register `handler` for `method` on `path`.
    pub fn route<H, T>(
        &mut self,
        method: impl Into<RouteMethod>,
        path: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath(path.to_string()));
        }
        let method = method.into();
        self.check_conflict(&method, path)?;

        let method_router = match &method {
            RouteMethod::Any => any(handler),
            RouteMethod::Only(m) => {
                let filter = MethodFilter::try_from(m.clone())
                    .map_err(|_| RouteError::UnsupportedMethod(m.clone()))?;
                on(filter, handler)
            }
        };

        let merged = match self.routes.remove(path) {
            Some(existing) => existing.merge(method_router),
            None => method_router,
        };
        self.routes.insert(path.to_string(), merged);

        let key = RouteKey {
            method,
            path: path.to_string(),
        };
        tracing::debug!(method = %key.method, path = %key.path, "Route registered");
        self.keys.push(key);
        Ok(self)
    }

    /// Open a group whose routes are all registered under `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_, S> {
        RouteGroup {
            table: self,
            prefix: join_path("", prefix),
        }
    }

    /// Handler for requests that match no registered path.
    pub fn fallback<H, T>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.fallback = Some(any(handler));
        self
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> &[RouteKey] {
        &self.keys
    }

    /// Compile into an axum router.
    pub fn into_router(self) -> Router<S> {
        let fallback = self.fallback;
        let keys = self.keys;
        let mut router = self
            .routes
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                // `any` routes are themselves a method fallback.
                let matches_any = keys
                    .iter()
                    .any(|key| key.path == path && key.method == RouteMethod::Any);
                let method_router = match &fallback {
                    Some(fallback) if !matches_any => method_router.fallback(fallback.clone()),
                    _ => method_router,
                };
                router.route(&path, method_router)
            });
        if let Some(fallback) = fallback {
            router = router.fallback(fallback);
        }
        router
    }

    fn check_conflict(&self, method: &RouteMethod, path: &str) -> Result<(), RouteError> {
        let conflicts = self.keys.iter().any(|key| {
            key.path == path
                && (key.method == *method
                    || key.method == RouteMethod::Any
                    || *method == RouteMethod::Any)
        });
        if conflicts {
            return Err(RouteError::Duplicate {
                method: method.clone(),
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

impl<S> Default for RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A prefix scope inside a [`RouteTable`].
pub struct RouteGroup<'a, S> {
    table: &'a mut RouteTable<S>,
    prefix: String,
}

impl<S> RouteGroup<'_, S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Register `handler` for `method` on `prefix + path`.
    pub fn route<H, T>(
        &mut self,
        method: impl Into<RouteMethod>,
        path: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let full = join_path(&self.prefix, path);
        self.table.route(method, &full, handler)?;
        Ok(self)
    }

    /// Open a nested group under this one.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_, S> {
        RouteGroup {
            prefix: join_path(&self.prefix, prefix),
            table: &mut *self.table,
        }
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}
