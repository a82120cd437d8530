//! # Dispatcher Module
//!
//! The dispatch orchestrator: one entry point per inbound request.
//!
//! ## Request Flow
//!
//! 1. The request target is split into path and query; repeated query keys accumulate.
//! 2. A fresh [`Context`](crate::context::Context) is created.
//! 3. The global middleware chain runs; its terminal step performs route matching.
//! 4. No match: a `404` with body `Route Not Found` is written and no handler runs.
//! 5. Match: path parameters are merged into `ctx.params` and the route-local chain runs
//!    with the route's handler as its terminal step.
//! 6. A failure from steps 3-5 yields `500 Internal Server Error` (or `408` for an expired
//!    timeout guard) if nothing was written yet; otherwise it is only logged.
//!
//! ## Example
//!
//! ```rust,ignore
//! use switchyard::{App, handler_fn};
//!
//! let mut app = App::new();
//! app.get("/users/:id", handler_fn(|ctx| Box::pin(async move {
//!     let id = ctx.param("id").unwrap_or_default().to_string();
//!     ctx.json(&serde_json::json!({ "id": id }))
//! })))?;
//!
//! let response = app.dispatch(request).await;
//! ```
//!
//! ## Error Handling
//!
//! The dispatcher performs no rich error formatting. Applications that want structured
//! error bodies install an error-handling middleware first in the global chain; it sees
//! every failure on the way out and can write its own response before the fallback does.

mod core;

pub use core::{App, INTERNAL_ERROR_BODY, NOT_FOUND_BODY, TIMEOUT_BODY};
