use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use super::{Middleware, Next};
use crate::context::Context;
use crate::error::{Error, Result};

/// Races the rest of the chain against a timer.
///
/// On expiry the chain fails with [`Error::Timeout`], which the dispatcher turns into a
/// 408 when nothing has been written yet. The downstream future is dropped at that point,
/// so awaited work inside the chain stops at its next suspension point. Tasks the chain
/// spawned onto the runtime keep running.
pub struct TimeoutMiddleware {
    limit: Duration,
}

impl TimeoutMiddleware {
    #[must_use]
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    #[must_use]
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl Middleware for TimeoutMiddleware {
    fn handle<'a>(&'a self, ctx: &'a mut Context, mut next: Next<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let path = ctx.path().to_string();
            match tokio::time::timeout(self.limit, next.run(ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        path = %path,
                        timeout_ms = self.limit.as_millis() as u64,
                        "Request chain timed out"
                    );
                    Err(Error::Timeout(self.limit))
                }
            }
        })
    }

    fn name(&self) -> &str {
        "timeout"
    }
}
