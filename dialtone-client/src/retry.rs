//! Retry policies for transport-level failures.

use std::ops::ControlFlow;
use std::time::Duration;

/// Controls how the transport reacts when a request fails before a complete
/// response was read.
pub trait RetryPolicy: Send + Sync + 'static {
    fn should_retry(&self, ctx: &RetryContext) -> ControlFlow<(), Duration>;
}

/// Context passed to [`RetryPolicy::should_retry`] on each failure.
pub struct RetryContext<'a> {
    /// How many attempts have failed so far (≥ 1).
    pub fail_count: u32,
    pub error: &'a (dyn std::error::Error + 'static),
}

/// Never retry.
pub struct NoRetries;
impl RetryPolicy for NoRetries {
    fn should_retry(&self, _: &RetryContext) -> ControlFlow<(), Duration> {
        ControlFlow::Break(())
    }
}

/// Re-attempt the full request up to a configured bound, with a fixed pause
/// between attempts so a dead link doesn't hot-loop.
///
/// `limit` semantics: `0` = no retry, negative = unbounded.
pub struct BoundedRetry {
    pub limit: i32,
    pub delay: Duration,
}

impl Default for BoundedRetry {
    fn default() -> Self {
        Self { limit: 2, delay: Duration::from_millis(500) }
    }
}

impl RetryPolicy for BoundedRetry {
    fn should_retry(&self, ctx: &RetryContext) -> ControlFlow<(), Duration> {
        if self.limit >= 0 && ctx.fail_count > self.limit as u32 {
            return ControlFlow::Break(());
        }
        tracing::debug!("request failed ({}), retrying: {}", ctx.fail_count, ctx.error);
        ControlFlow::Continue(self.delay)
    }
}
