//! Error types and error handling
//!
//! Each stage of the pipeline has its own error type. [`IrisError`] collects
//! them so the dispatch loop can report the first fatal failure regardless of
//! where it happened.

use thiserror::Error;

use crate::config::ConfigError;
use crate::data::DataError;
use crate::email::SendError;
use crate::template::RenderError;

/// Top-level error for a dispatch run
#[derive(Debug, Error)]
pub enum IrisError {
    /// Configuration could not be loaded or is incomplete
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Recipient or default table could not be opened or read
    #[error(transparent)]
    Data(#[from] DataError),

    /// A template failed to compile or render
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The delivery service failed to send a message
    #[error(transparent)]
    Send(#[from] SendError),

    /// A record has no usable recipient address
    #[error("record {record} has no value for recipient column '{column}'")]
    MissingRecipient {
        /// One-based index of the data row (header excluded)
        record: usize,
        /// Configured recipient column
        column: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_recipient_message() {
        let err = IrisError::MissingRecipient {
            record: 3,
            column: "email".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "record 3 has no value for recipient column 'email'"
        );
    }

    #[test]
    fn test_send_error_is_transparent() {
        let err: IrisError = SendError::smtp("connection reset").into();
        assert_eq!(err.to_string(), "SMTP error: connection reset");
    }
}
