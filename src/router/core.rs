//! Router core module - hot path for request routing.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::pattern::CompiledPattern;
use crate::error::{Error, Result};
use crate::middleware::{Handler, Middleware};

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Extracted path parameters, in pattern order.
///
/// Names are shared with the compiled route (`Arc<str>`); values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A registered route. Immutable once added to a [`Router`].
pub struct CompiledRoute {
    method: Method,
    pattern: CompiledPattern,
    handler: Arc<dyn Handler>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl CompiledRoute {
    /// Compile `pattern` and bundle it with its handler and route-local middleware.
    pub fn new(
        method: Method,
        pattern: &str,
        middleware: Vec<Arc<dyn Middleware>>,
        handler: Arc<dyn Handler>,
    ) -> Result<Self> {
        Ok(Self {
            method,
            pattern: CompiledPattern::compile(pattern)?,
            handler,
            middleware,
        })
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Original pattern text.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.pattern()
    }

    #[must_use]
    pub fn compiled(&self) -> &CompiledPattern {
        &self.pattern
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Route-local middleware, outermost first.
    #[must_use]
    pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("method", &self.method)
            .field("pattern", &self.pattern.pattern())
            .field("regex", &self.pattern.regex().as_str())
            .field("param_names", &self.pattern.param_names())
            .field("wildcard", &self.pattern.has_wildcard())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Result of successfully matching a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<CompiledRoute>,
    /// Parameters that took part in the match (e.g. `:id` → `("id", "42")`).
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to a HashMap.
    /// Note: This allocates - use get_path_param() in hot paths instead
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Ordered route table.
///
/// Matching is a linear scan in registration order and the first route whose method and
/// pattern both match wins. There is no "most specific wins" resolution: registering
/// `/users/:id` before `/users/me` means `/users/me` is served by the parameterised route
/// with `id = "me"`. Register literal routes first when both should exist.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Arc<CompiledRoute>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Precedence is insertion order.
    pub fn add(&mut self, route: CompiledRoute) -> Arc<CompiledRoute> {
        let route = Arc::new(route);
        debug!(
            method = %route.method,
            route_pattern = %route.pattern(),
            regex = %route.pattern.regex().as_str(),
            position = self.routes.len(),
            "Route registered"
        );
        self.routes.push(Arc::clone(&route));
        route
    }

    /// Compile and append a route in one step.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        middleware: Vec<Arc<dyn Middleware>>,
        handler: Arc<dyn Handler>,
    ) -> Result<Arc<CompiledRoute>> {
        let route = CompiledRoute::new(method, pattern, middleware, handler)?;
        Ok(self.add(route))
    }

    /// Registered routes in precedence order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<CompiledRoute>] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Log every registered route at info level.
    pub fn dump_routes(&self) {
        info!(routes_count = self.routes.len(), "Routing table");
        for (position, route) in self.routes.iter().enumerate() {
            info!(
                position,
                method = %route.method,
                route_pattern = %route.pattern(),
                "Route"
            );
        }
    }

    /// Match a method and raw URL (query string allowed) to the first accepting route.
    ///
    /// Returns [`Error::RouteNotFound`] when nothing matches.
    pub fn match_route(&self, method: &Method, url: &str) -> Result<RouteMatch> {
        let path = strip_query(url);

        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        for route in &self.routes {
            if route.method != *method {
                continue;
            }
            if let Some(path_params) = route.pattern.captures(path) {
                let match_duration = match_start.elapsed();
                if match_duration > Duration::from_millis(1) {
                    warn!(
                        method = %method,
                        path = %path,
                        route_pattern = %route.pattern(),
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %method,
                        path = %path,
                        route_pattern = %route.pattern(),
                        path_params = ?path_params,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                return Ok(RouteMatch {
                    route: Arc::clone(route),
                    path_params,
                });
            }
        }

        debug!(
            method = %method,
            path = %path,
            duration_us = match_start.elapsed().as_micros(),
            "No route matched"
        );
        Err(Error::RouteNotFound {
            method: method.to_string(),
            path: path.to_string(),
        })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.routes.iter()).finish()
    }
}

/// Drop everything from the first `?` (and any `#` fragment).
#[must_use]
pub fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}
