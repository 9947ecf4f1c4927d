//! Retry decorator

use async_trait::async_trait;
use tracing::warn;

use super::{DeliveryService, SendError, SendOptions};

/// Delivery service that retries failed sends
///
/// Every error is retried, immediately and without backoff, until the send
/// succeeds or `max_retries` additional attempts have failed. The error of the
/// final attempt is returned.
pub struct Retried<S> {
    inner: S,
    max_retries: u32,
}

impl<S: DeliveryService> Retried<S> {
    /// Wrap `inner`, allowing up to `max_retries` extra attempts per send
    #[must_use]
    pub const fn new(inner: S, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }
}

#[async_trait]
impl<S: DeliveryService> DeliveryService for Retried<S> {
    async fn send(&self, options: &SendOptions) -> Result<(), SendError> {
        let mut attempt = 0;
        loop {
            match self.inner.send(options).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        to = %options.to,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Send failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn close(&self) -> Result<(), SendError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::service::MockDeliveryService;
    use crate::email::Message;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn options() -> SendOptions {
        SendOptions::new("a@example.com", "b@example.com", Message::default())
    }

    /// Inner service failing `failures` times before succeeding
    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> MockDeliveryService {
        let mut inner = MockDeliveryService::new();
        inner.expect_send().returning(move |_| {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            if call < failures {
                Err(SendError::smtp(format!("failure {call}")))
            } else {
                Ok(())
            }
        });
        inner
    }

    #[tokio::test]
    async fn test_retry_bound() {
        for max_retries in 0..4 {
            for failures in 0..6 {
                let calls = Arc::new(AtomicU32::new(0));
                let service = Retried::new(flaky(failures, Arc::clone(&calls)), max_retries);

                let result = service.send(&options()).await;

                assert_eq!(
                    result.is_ok(),
                    failures <= max_retries,
                    "failures={failures} max_retries={max_retries}"
                );
                assert_eq!(
                    calls.load(Ordering::SeqCst),
                    failures.min(max_retries) + 1,
                    "failures={failures} max_retries={max_retries}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let service = Retried::new(flaky(10, calls), 2);

        match service.send(&options()).await {
            Err(SendError::Smtp(message)) => assert_eq!(message, "failure 2"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retry_closes_inner() {
        let mut inner = MockDeliveryService::new();
        inner.expect_close().times(1).returning(|| Ok(()));

        Retried::new(inner, 3).close().await.unwrap();
    }
}
