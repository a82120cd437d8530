//! # switchyard
//!
//! **switchyard** is an embeddable HTTP request-dispatch core. It turns an inbound request
//! into a matched route, threads it through ordered layers of middleware, and invokes
//! exactly one terminal handler.
//!
//! ## Overview
//!
//! The crate covers the parts of a web stack that need ordering discipline and nothing
//! else: it does not own sockets, parse HTTP off the wire, or bundle concrete middleware.
//! Server adapters hand it an `http::Request<Bytes>` and get back a [`Response`].
//!
//! ## Architecture
//!
//! - **[`router`]** - Pattern compilation (`/users/:id(\d+)/files/*` → regex) and the
//!   ordered route table
//! - **[`middleware`]** - The `Middleware`/`Handler` contracts, the index-based chain
//!   executor, `compose`, and the timeout guard
//! - **[`context`]** - Per-request state: request accessors and response helpers
//! - **[`dispatcher`]** - Registration surface and the end-to-end request flow
//! - **[`static_files`]** - Base-directory-confined file resolution and template rendering
//! - **[`runtime_config`]** / **[`logging`]** - Environment configuration and `tracing` setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Adapter as Server adapter
//!     participant App as App::dispatch
//!     participant Global as Global chain
//!     participant Router as Router
//!     participant Route as Route chain
//!     participant Handler
//!
//!     Adapter->>App: http::Request<Bytes>
//!     App->>App: Context::new (path / query split)
//!     App->>Global: run_chain(global, RouteStage)
//!     Global->>Router: match_route(method, url)
//!     alt no route
//!         Router-->>Global: 404 Route Not Found
//!     else matched
//!         Router->>Route: run_chain(route middleware, handler)
//!         Route->>Handler: call(ctx)
//!         Handler-->>Route: Ok / Err
//!         Route-->>Global: unwinds in reverse order
//!     end
//!     Global-->>App: Ok / Err
//!     App->>App: Err + nothing sent → 500 (408 on timeout)
//!     App-->>Adapter: Response
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use switchyard::{handler_fn, middleware_fn, App};
//!
//! # async fn run() -> switchyard::Result<()> {
//! let mut app = App::new();
//!
//! app.use_middleware(middleware_fn("powered-by", |ctx, mut next| {
//!     Box::pin(async move {
//!         ctx.set_header("x-powered-by", "switchyard")?;
//!         next.run(ctx).await
//!     })
//! }));
//!
//! app.get(r"/users/:id(\d+)", handler_fn(|ctx| {
//!     Box::pin(async move {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         ctx.json(&serde_json::json!({ "id": id }))
//!     })
//! }))?;
//!
//! let request = http::Request::get("/users/42").body(Bytes::new()).unwrap();
//! let response = app.dispatch(request).await;
//! assert_eq!(response.status(), http::StatusCode::OK);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Each request owns its [`Context`]; nothing in the core is shared mutably between
//! requests, so no locks are taken on the dispatch path. Within one request, ordering is
//! fully deterministic.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod static_files;

pub use context::{
    AuthState, ConnectionInfo, Context, ContextSettings, CookieOptions, Query, QueryValue,
    RequestBody, Response, ResponseBody, SameSite,
};
pub use dispatcher::App;
pub use error::{Error, Result};
pub use ids::RequestId;
pub use middleware::{
    compose, handler_fn, middleware_fn, run_chain, Handler, Middleware, Next,
    RequestIdMiddleware, TimeoutMiddleware,
};
pub use router::{CompiledRoute, RouteMatch, Router};
pub use runtime_config::RuntimeConfig;
pub use static_files::StaticFiles;
