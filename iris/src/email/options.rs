//! Composition of delivery service decorators
//!
//! A service chain is built at startup by applying [`ServiceOption`]s in
//! order, each one wrapping the service produced by the previous one.

use std::num::NonZeroU32;

use super::{BoxedService, RateLimited, Retried};

/// A function wrapping a delivery service in a decorator
pub type ServiceOption = Box<dyn FnOnce(BoxedService) -> BoxedService + Send>;

/// Limit sends to `per_second` messages per second
#[must_use]
pub fn with_rate_limit(per_second: NonZeroU32) -> ServiceOption {
    Box::new(move |service: BoxedService| -> BoxedService {
        Box::new(RateLimited::new(service, per_second))
    })
}

/// Retry each failed send up to `max_retries` times
#[must_use]
pub fn with_retries(max_retries: u32) -> ServiceOption {
    Box::new(move |service: BoxedService| -> BoxedService {
        Box::new(Retried::new(service, max_retries))
    })
}

/// Apply `options` to `base` in order
///
/// The last option becomes the outermost decorator, so
/// `[with_rate_limit(r), with_retries(n)]` rate limits every retry attempt.
#[must_use]
pub fn apply_options<I>(base: BoxedService, options: I) -> BoxedService
where
    I: IntoIterator<Item = ServiceOption>,
{
    options.into_iter().fold(base, |service, option| option(service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::service::MockDeliveryService;
    use crate::email::{DeliveryService, Message, SendError, SendOptions};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn options() -> SendOptions {
        SendOptions::new("a@example.com", "b@example.com", Message::default())
    }

    fn failing_twice(calls: Arc<AtomicU32>) -> BoxedService {
        let mut inner = MockDeliveryService::new();
        inner.expect_send().returning(move |_| {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(SendError::smtp("unavailable"))
            } else {
                Ok(())
            }
        });
        inner.expect_close().times(1).returning(|| Ok(()));
        Box::new(inner)
    }

    #[tokio::test]
    async fn test_no_options_returns_base() {
        let calls = Arc::new(AtomicU32::new(0));
        let service = apply_options(failing_twice(Arc::clone(&calls)), Vec::new());

        assert!(service.send(&options()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        service.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_retries_wrap_rate_limit() {
        let calls = Arc::new(AtomicU32::new(0));
        let service = apply_options(
            failing_twice(Arc::clone(&calls)),
            [with_rate_limit(NonZeroU32::MIN), with_retries(2)],
        );

        let started = Instant::now();
        service.send(&options()).await.unwrap();

        // Three attempts, each waiting for its own permit
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(2));

        service.close().await.unwrap();
    }
}
