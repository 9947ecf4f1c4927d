//! Rate limiting decorator
//!
//! Spaces sends evenly so that at most `rate` messages per second reach the
//! wrapped service.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

use super::{DeliveryService, SendError, SendOptions};

/// Delivery service that waits for a rate limiter permit before each send
pub struct RateLimited<S> {
    inner: S,
    limiter: DefaultDirectRateLimiter,
}

impl<S: DeliveryService> RateLimited<S> {
    /// Wrap `inner` so that it sends at most `per_second` messages per second
    ///
    /// The burst is one message, so permits are handed out on a steady
    /// schedule rather than in bunches.
    #[must_use]
    pub fn new(inner: S, per_second: NonZeroU32) -> Self {
        let quota = Quota::per_second(per_second).allow_burst(NonZeroU32::MIN);
        Self {
            inner,
            limiter: RateLimiter::direct(quota),
        }
    }
}

#[async_trait]
impl<S: DeliveryService> DeliveryService for RateLimited<S> {
    async fn send(&self, options: &SendOptions) -> Result<(), SendError> {
        self.limiter.until_ready().await;
        self.inner.send(options).await
    }

    async fn close(&self) -> Result<(), SendError> {
        self.inner.close().await
    }
}
