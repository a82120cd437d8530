use futures::future::BoxFuture;
use tracing::{field, Span};

use super::{Middleware, Next};
use crate::context::Context;
use crate::error::Result;
use crate::ids::RequestId;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Adopts a valid inbound `x-request-id` (ULID) and echoes the id on the response.
///
/// An adopted id replaces the one on the dispatcher's `request` span, so log lines and
/// the response header agree. Invalid inbound values are ignored and the minted id kept.
pub struct RequestIdMiddleware;

impl RequestIdMiddleware {
    fn inbound(ctx: &Context) -> Option<RequestId> {
        ctx.header(REQUEST_ID_HEADER)?.parse().ok()
    }
}

impl Middleware for RequestIdMiddleware {
    fn handle<'a>(&'a self, ctx: &'a mut Context, mut next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if let Some(adopted) = Self::inbound(ctx) {
                ctx.request_id = adopted;
                Span::current().record("request_id", field::display(adopted));
            }
            let id = ctx.request_id.to_string();
            ctx.set_header(REQUEST_ID_HEADER, &id)?;
            next.run(ctx).await
        })
    }

    fn name(&self) -> &str {
        "request_id"
    }
}
