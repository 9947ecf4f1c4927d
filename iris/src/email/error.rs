//! Delivery error types

use thiserror::Error;

/// Errors that can occur while delivering a message
///
/// Transport and provider failures are carried as messages only; callers
/// cannot tell a transient failure from a permanent one without inspecting
/// the text.
#[derive(Debug, Error)]
pub enum SendError {
    /// The send options carry no rendered message
    #[error("message must not be empty")]
    MissingMessage,

    /// Invalid email address format
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// SMTP transport error
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// AWS SES error
    #[error("AWS SES error: {0}")]
    AwsSes(String),

    /// Transport configuration error
    #[error("email configuration error: {0}")]
    Config(String),

    /// The service was closed before this send
    #[error("delivery service is closed")]
    Closed,

    /// Writing to the output sink failed
    #[error("failed to write email: {0}")]
    Io(#[from] std::io::Error),
}

impl SendError {
    /// Create an SMTP error from a string message
    #[must_use]
    pub fn smtp<T: Into<String>>(msg: T) -> Self {
        Self::Smtp(msg.into())
    }

    /// Create an AWS SES error from a string message
    #[must_use]
    pub fn aws_ses<T: Into<String>>(msg: T) -> Self {
        Self::AwsSes(msg.into())
    }

    /// Create a configuration error from a string message
    #[must_use]
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }
}
