//! Email delivery with multiple transports and composable decorators
//!
//! This module provides:
//! - A single [`DeliveryService`] trait implemented by every transport
//! - Transports for SMTP, AWS SES (`aws-ses` feature) and dry-run printing
//! - Rate limiting and retry decorators composed with [`apply_options`]
//!
//! # Examples
//!
//! ```rust
//! use iris::email::{
//!     apply_options, with_rate_limit, with_retries, DeliveryService, Message,
//!     PrintTransport, SendOptions,
//! };
//! use std::num::NonZeroU32;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = apply_options(
//!     Box::new(PrintTransport::stdout()),
//!     [with_rate_limit(NonZeroU32::new(14).unwrap()), with_retries(2)],
//! );
//!
//! let message = Message {
//!     subject: "Welcome!".to_string(),
//!     text_body: "Welcome to our list!".to_string(),
//!     html_body: "<h1>Welcome to our list!</h1>".to_string(),
//! };
//!
//! service
//!     .send(&SendOptions::new("news@example.com", "jack@example.com", message))
//!     .await?;
//! service.close().await?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod error;
mod message;
mod options;
mod rate_limit;
mod retry;
mod service;

use std::num::NonZeroU32;

use tracing::info;

#[cfg(feature = "aws-ses")]
pub use backend::aws_ses::AwsSesTransport;
pub use backend::{
    print::PrintTransport,
    smtp::{Encryption, SmtpTransport},
};
pub use error::SendError;
pub use message::{Message, SendOptions};
pub use options::{apply_options, with_rate_limit, with_retries, ServiceOption};
pub use rate_limit::RateLimited;
pub use retry::Retried;
pub use service::{BoxedService, DeliveryService};

#[cfg(test)]
pub use service::MockDeliveryService;

use crate::config::{ConfigError, ServiceSettings};
use crate::error::IrisError;

/// Decorators configured by `settings`
///
/// A rate limit of zero disables rate limiting. Retries wrap the rate limiter
/// so every attempt waits for its own permit.
#[must_use]
pub fn service_options(settings: &ServiceSettings) -> Vec<ServiceOption> {
    let mut options = Vec::with_capacity(2);
    if let Some(rate) = NonZeroU32::new(settings.rate_limit) {
        options.push(with_rate_limit(rate));
    }
    options.push(with_retries(settings.retries));
    options
}

/// Build the delivery service chain for a dispatch run
///
/// A dry run always prints to stdout. Otherwise AWS SES is preferred when
/// configured, then SMTP.
///
/// # Errors
///
/// Returns `ConfigError::MissingTransport` if no transport is configured, or
/// the transport's error if it cannot be created.
pub async fn select_service(
    settings: &ServiceSettings,
    dry_run: bool,
) -> Result<BoxedService, IrisError> {
    let base: BoxedService = if dry_run {
        info!("Dry run, printing emails instead of sending them");
        Box::new(PrintTransport::stdout())
    } else if let Some(aws_ses) = &settings.aws_ses {
        aws_ses_transport(aws_ses).await?
    } else if let Some(smtp) = &settings.smtp {
        Box::new(SmtpTransport::connect(smtp).await?)
    } else {
        return Err(ConfigError::MissingTransport.into());
    };

    Ok(apply_options(base, service_options(settings)))
}

#[cfg(feature = "aws-ses")]
async fn aws_ses_transport(
    settings: &crate::config::AwsSesSettings,
) -> Result<BoxedService, SendError> {
    Ok(Box::new(AwsSesTransport::connect(settings).await))
}

#[cfg(not(feature = "aws-ses"))]
#[allow(clippy::unused_async)]
async fn aws_ses_transport(
    _settings: &crate::config::AwsSesSettings,
) -> Result<BoxedService, SendError> {
    Err(SendError::config(
        "AWS SES support requires the `aws-ses` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AwsSesSettings;

    #[test]
    fn test_service_options_skip_disabled_rate_limit() {
        let settings = ServiceSettings {
            rate_limit: 0,
            ..ServiceSettings::default()
        };
        assert_eq!(service_options(&settings).len(), 1);
        assert_eq!(service_options(&ServiceSettings::default()).len(), 2);
    }

    #[tokio::test]
    async fn test_select_service_without_transport() {
        let result = select_service(&ServiceSettings::default(), false).await;
        assert!(matches!(
            result,
            Err(IrisError::Config(ConfigError::MissingTransport))
        ));
    }

    #[tokio::test]
    async fn test_dry_run_ignores_transport_settings() {
        let settings = ServiceSettings {
            aws_ses: Some(AwsSesSettings::default()),
            ..ServiceSettings::default()
        };
        assert!(select_service(&settings, true).await.is_ok());
    }

    #[cfg(not(feature = "aws-ses"))]
    #[tokio::test]
    async fn test_aws_ses_requires_feature() {
        let settings = ServiceSettings {
            aws_ses: Some(AwsSesSettings::default()),
            ..ServiceSettings::default()
        };
        assert!(matches!(
            select_service(&settings, false).await,
            Err(IrisError::Send(SendError::Config(_)))
        ));
    }
}
