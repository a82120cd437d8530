//! # Middleware Module
//!
//! The chain executor plus the few layers the core ships itself.
//!
//! Concrete cross-cutting concerns (body parsing, CORS, auth, compression, caching) are
//! ordinary [`Middleware`] implementations supplied by the embedding application.

mod core;
mod request_id;
mod timeout;

pub use core::{
    boxed, compose, handler_fn, middleware_fn, run_chain, Compose, Handler, HandlerFn,
    Middleware, MiddlewareFn, Next,
};
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
pub use timeout::TimeoutMiddleware;
