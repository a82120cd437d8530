//! # Router Module
//!
//! Path pattern compilation and route resolution.
//!
//! ## Overview
//!
//! The router works in two phases:
//!
//! 1. **Compilation**: at registration, a pattern such as `/users/:id(\d+)/files/*` is
//!    compiled into an anchored regex plus its ordered parameter names. Malformed
//!    patterns fail here, never at request time.
//!
//! 2. **Matching**: for each request the query string is stripped and routes are tested
//!    in registration order; the first route whose method and pattern both match wins.
//!
//! ## Example
//!
//! ```rust,ignore
//! use switchyard::router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.register(Method::GET, "/users/:id", vec![], handler)?;
//!
//! let m = router.match_route(&Method::GET, "/users/42?verbose=1")?;
//! assert_eq!(m.get_path_param("id"), Some("42"));
//! ```
//!
//! ## Precedence
//!
//! Insertion order only. A parameterised route registered before a literal one shadows
//! it for every path both accept.

mod core;
mod pattern;
#[cfg(test)]
mod tests;

pub use core::{strip_query, CompiledRoute, ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use pattern::{CompiledPattern, WILDCARD_PARAM};
