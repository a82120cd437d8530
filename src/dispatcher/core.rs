//! Dispatcher core module - the per-request flow.

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Method, StatusCode};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::context::{Context, ContextSettings, Response, ResponseBody};
use crate::error::{Error, Result};
use crate::middleware::{run_chain, Handler, Middleware, TimeoutMiddleware};
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;
use crate::static_files::StaticFiles;

/// Body of the 404 written when no route matches.
pub const NOT_FOUND_BODY: &str = "Route Not Found";
/// Body of the fallback response for a failed chain.
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";
/// Body of the fallback response for an expired timeout guard.
pub const TIMEOUT_BODY: &str = "Request Timeout";

/// Registration surface and dispatch entry point.
///
/// Requests flow through two chain levels:
///
/// ```text
/// Received → global middleware → route match ─┬─ NotFound → 404
///                                             └─ Found → route middleware → handler
/// ```
///
/// Global middleware always runs, including for requests that end in a 404. Route
/// middleware runs only once a route is resolved. A failure that reaches the dispatcher
/// with nothing written yields a 500 (408 for a timeout); if a response was already
/// written the failure is logged and nothing further is sent.
pub struct App {
    router: Router,
    global: Vec<Arc<dyn Middleware>>,
    settings: Arc<ContextSettings>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            global: Vec::new(),
            settings: Arc::new(ContextSettings::default()),
        }
    }

    /// Build an app from runtime configuration.
    ///
    /// A configured request timeout becomes the outermost global middleware.
    #[must_use]
    pub fn with_config(config: &RuntimeConfig) -> Self {
        let settings = ContextSettings {
            trust_proxy: config.trust_proxy,
            subdomain_offset: config.subdomain_offset,
            static_files: config.static_root.clone().map(StaticFiles::new),
            views: config.views_root.clone().map(StaticFiles::new),
        };
        let mut app = Self::with_settings(settings);
        if let Some(limit) = config.request_timeout {
            app.use_middleware(TimeoutMiddleware::new(limit));
        }
        app
    }

    #[must_use]
    pub fn with_settings(settings: ContextSettings) -> Self {
        Self {
            router: Router::new(),
            global: Vec::new(),
            settings: Arc::new(settings),
        }
    }

    /// Append a global middleware. Global middleware runs in registration order.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.use_shared(Arc::new(middleware))
    }

    /// Append an already shared global middleware.
    pub fn use_shared(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        debug!(
            middleware = middleware.name(),
            position = self.global.len(),
            "Global middleware registered"
        );
        self.global.push(middleware);
        self
    }

    /// Register `handler` for `method` + `pattern`, behind route-local `middleware`.
    ///
    /// Fails with [`Error::RouteCompilation`] if the pattern is malformed.
    pub fn route<H: Handler + 'static>(
        &mut self,
        method: Method,
        pattern: &str,
        middleware: Vec<Arc<dyn Middleware>>,
        handler: H,
    ) -> Result<&mut Self> {
        self.router
            .register(method, pattern, middleware, Arc::new(handler))?;
        Ok(self)
    }

    pub fn get<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::GET, pattern, Vec::new(), handler)
    }

    pub fn post<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::POST, pattern, Vec::new(), handler)
    }

    pub fn put<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::PUT, pattern, Vec::new(), handler)
    }

    pub fn delete<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::DELETE, pattern, Vec::new(), handler)
    }

    pub fn patch<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::PATCH, pattern, Vec::new(), handler)
    }

    pub fn options<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::OPTIONS, pattern, Vec::new(), handler)
    }

    pub fn head<H: Handler + 'static>(&mut self, pattern: &str, handler: H) -> Result<&mut Self> {
        self.route(Method::HEAD, pattern, Vec::new(), handler)
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn global_middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.global
    }

    /// Handle one inbound request end to end.
    pub async fn dispatch(&self, request: http::Request<Bytes>) -> Response {
        let mut ctx = Context::with_settings(request, Arc::clone(&self.settings));
        let span = info_span!(
            "request",
            method = %ctx.method(),
            path = %ctx.path(),
            request_id = %ctx.request_id,
        );
        self.handle(&mut ctx).instrument(span).await;
        ctx.into_response()
    }

    /// Run the full flow against an existing context.
    pub async fn handle(&self, ctx: &mut Context) {
        let started = Instant::now();
        let terminal = RouteStage {
            router: &self.router,
        };

        if let Err(err) = run_chain(&self.global, &terminal, ctx).await {
            recover(ctx, err);
        } else if !ctx.is_sent() {
            debug!(
                status = ctx.response().status().as_u16(),
                "Chain completed without writing a body"
            );
        }

        info!(
            status = ctx.response().status().as_u16(),
            route_pattern = ctx.route_pattern().unwrap_or("-"),
            duration_us = started.elapsed().as_micros(),
            "Request completed"
        );
    }
}

/// Terminal step of the global chain: match, then run the route's own chain.
struct RouteStage<'r> {
    router: &'r Router,
}

impl Handler for RouteStage<'_> {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let matched = match self.router.match_route(ctx.method(), ctx.original_url()) {
                Ok(matched) => matched,
                Err(Error::RouteNotFound { method, path }) => {
                    debug!(method = %method, path = %path, "Responding 404");
                    if !ctx.is_sent() {
                        write_fallback(ctx, StatusCode::NOT_FOUND, NOT_FOUND_BODY)?;
                    }
                    return Ok(());
                }
                Err(err) => return Err(err),
            };

            let route = Arc::clone(&matched.route);
            ctx.set_route_pattern(route.pattern());
            for (name, value) in matched.path_params {
                ctx.params.insert(name.to_string(), value);
            }

            run_chain(route.middleware(), route.handler().as_ref(), ctx).await
        })
    }
}

/// Turn a chain failure into the single fallback response, or log if too late.
fn recover(ctx: &mut Context, err: Error) {
    if ctx.is_sent() {
        error!(
            error = %err,
            status = ctx.response().status().as_u16(),
            "Chain failed after the response was sent; not writing again"
        );
        return;
    }

    let status = err.status();
    let body = match status {
        StatusCode::REQUEST_TIMEOUT => TIMEOUT_BODY,
        StatusCode::NOT_FOUND => NOT_FOUND_BODY,
        _ => INTERNAL_ERROR_BODY,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "Request chain failed");
    } else {
        warn!(error = %err, status = status.as_u16(), "Request chain failed");
    }

    if let Err(write_err) = write_fallback(ctx, status, body) {
        error!(error = %write_err, "Failed to write fallback response");
    }
}

fn write_fallback(ctx: &mut Context, status: StatusCode, body: &'static str) -> Result<()> {
    let response = ctx.response_mut();
    response.set_status(status);
    response.write_as(
        "text/plain; charset=utf-8",
        ResponseBody::Full(Bytes::from_static(body.as_bytes())),
    )
}
