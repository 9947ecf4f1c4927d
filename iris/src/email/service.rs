//! Delivery service trait abstraction
//!
//! This module defines the core `DeliveryService` trait that every transport
//! and every decorator implements.

use async_trait::async_trait;

use super::{SendError, SendOptions};

/// A boxed delivery service, as produced by [`super::apply_options`]
pub type BoxedService = Box<dyn DeliveryService>;

/// Trait for delivering rendered messages
///
/// Implemented by all transports (print, SMTP, AWS SES) and by the decorators
/// that wrap them (rate limiting, retries).
///
/// # Examples
///
/// ```rust,no_run
/// use iris::email::{DeliveryService, Message, PrintTransport, SendOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = PrintTransport::stdout();
///
/// let message = Message {
///     subject: "Hello!".to_string(),
///     text_body: "Hello, World!".to_string(),
///     html_body: "<p>Hello, World!</p>".to_string(),
/// };
///
/// service
///     .send(&SendOptions::new("noreply@myapp.com", "user@example.com", message))
///     .await?;
/// service.close().await?;
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryService: Send + Sync {
    /// Send one message
    ///
    /// # Errors
    ///
    /// Returns `SendError::MissingMessage` if `options` carries no message,
    /// or the transport's error if delivery fails.
    async fn send(&self, options: &SendOptions) -> Result<(), SendError>;

    /// Release resources held by the service
    ///
    /// Default implementation does nothing. Decorators close the service they
    /// wrap.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if shutdown fails.
    async fn close(&self) -> Result<(), SendError> {
        Ok(())
    }
}

#[async_trait]
impl<T> DeliveryService for Box<T>
where
    T: DeliveryService + ?Sized,
{
    async fn send(&self, options: &SendOptions) -> Result<(), SendError> {
        (**self).send(options).await
    }

    async fn close(&self) -> Result<(), SendError> {
        (**self).close().await
    }
}
