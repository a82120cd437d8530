//! Chain executor: onion-style middleware composition with an index cursor.
//!
//! A chain is a fixed slice of middleware plus one terminal [`Handler`]. [`Next`] is a
//! cursor over that slice: running it invokes the middleware at its position with a fresh
//! cursor for `position + 1`, or the terminal once the slice is exhausted. No closure is
//! allocated per hop and no continuation is nested inside another.
//!
//! Contract enforced here:
//!
//! - Each `Next` runs at most once. A second call fails with
//!   [`Error::NextCalledTwice`] and nothing downstream runs again.
//! - A middleware that never runs `next` short-circuits everything after it.
//! - An error from any layer aborts the chain and propagates outward unchanged.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::error;

use crate::context::Context;
use crate::error::{Error, Result};

/// Terminal step of a chain. Never calls `next`.
pub trait Handler: Send + Sync {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<()>>;
}

/// One layer of cross-cutting logic.
///
/// Code before `next.run(ctx).await` runs on the way in, code after it on the way out.
pub trait Middleware: Send + Sync {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Cursor over the remainder of a chain.
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Handler,
    position: usize,
    called: bool,
}

impl<'a> Next<'a> {
    /// Cursor positioned at the start of `middleware`, ending in `terminal`.
    #[must_use]
    pub fn new(middleware: &'a [Arc<dyn Middleware>], terminal: &'a dyn Handler) -> Self {
        Self {
            middleware,
            terminal,
            position: 0,
            called: false,
        }
    }

    /// Run the remainder of the chain.
    ///
    /// Completes when every downstream layer has completed. Calling this a second time
    /// on the same cursor fails immediately with [`Error::NextCalledTwice`].
    pub fn run<'b>(&'b mut self, ctx: &'b mut Context) -> BoxFuture<'b, Result<()>> {
        let position = self.position;
        if self.called {
            // Reported against the middleware that owns this cursor.
            let owner = position.saturating_sub(1);
            error!(position = owner, "next() invoked twice; rejecting");
            return Box::pin(async move { Err(Error::NextCalledTwice { position: owner }) });
        }
        self.called = true;

        match self.middleware.get(position) {
            Some(layer) => {
                let next = Next {
                    middleware: self.middleware,
                    terminal: self.terminal,
                    position: position + 1,
                    called: false,
                };
                layer.handle(ctx, next)
            }
            None => self.terminal.call(ctx),
        }
    }

    /// Number of middleware still ahead of the terminal.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.middleware.len().saturating_sub(self.position)
    }

    /// Whether this cursor has already been run.
    #[must_use]
    pub fn is_called(&self) -> bool {
        self.called
    }
}

/// Run `middleware` then `terminal` against `ctx`.
///
/// A panic anywhere in the chain is caught and reported as [`Error::Panic`].
pub async fn run_chain(
    middleware: &[Arc<dyn Middleware>],
    terminal: &dyn Handler,
    ctx: &mut Context,
) -> Result<()> {
    let mut next = Next::new(middleware, terminal);
    match AssertUnwindSafe(next.run(ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Error::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fold several middleware into one with identical onion semantics.
///
/// The composed stack runs its members in order and then resumes whatever chain it was
/// installed in.
#[must_use]
pub fn compose(middleware: Vec<Arc<dyn Middleware>>) -> Compose {
    Compose { middleware }
}

/// A pre-assembled middleware stack; see [`compose`].
pub struct Compose {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Compose {
    #[must_use]
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

impl Middleware for Compose {
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let resume = Resume {
                next: Mutex::new(Some(next)),
            };
            let mut inner = Next::new(&self.middleware, &resume);
            inner.run(ctx).await
        })
    }
}

/// Terminal of a composed stack: hands control back to the enclosing chain, once.
struct Resume<'a> {
    next: Mutex<Option<Next<'a>>>,
}

impl Handler for Resume<'_> {
    fn call<'b>(&'b self, ctx: &'b mut Context) -> BoxFuture<'b, Result<()>> {
        let next = self
            .next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Box::pin(async move {
            match next {
                Some(mut next) => next.run(ctx).await,
                None => Err(Error::NextCalledTwice {
                    position: usize::MAX,
                }),
            }
        })
    }
}

/// Adapter turning a closure into a [`Handler`]; see [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap a closure as a [`Handler`].
///
/// ```rust,ignore
/// let hello = handler_fn(|ctx| Box::pin(async move { ctx.text("hello") }));
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    HandlerFn { f }
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, Result<()>> {
        (self.f)(ctx)
    }
}

/// Adapter turning a closure into a [`Middleware`]; see [`middleware_fn`].
pub struct MiddlewareFn<F> {
    name: &'static str,
    f: F,
}

/// Wrap a closure as a named [`Middleware`].
///
/// ```rust,ignore
/// let mw = middleware_fn("stamp", |ctx, mut next| Box::pin(async move {
///     ctx.set_header("x-stamp", "1")?;
///     next.run(ctx).await
/// }));
/// ```
pub fn middleware_fn<F>(name: &'static str, f: F) -> MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    MiddlewareFn { name, f }
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        (self.f)(ctx, next)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Box a future the way [`Handler`] and [`Middleware`] expect.
pub fn boxed<'a, F>(fut: F) -> BoxFuture<'a, Result<()>>
where
    F: Future<Output = Result<()>> + Send + 'a,
{
    Box::pin(fut)
}
