//! Rendered messages and per-recipient send options

use serde::Serialize;

/// A rendered message for one recipient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub text_body: String,
    /// HTML body
    pub html_body: String,
}

/// Everything a delivery service needs to send one message
///
/// # Examples
///
/// ```rust
/// use iris::email::{Message, SendOptions};
///
/// let options = SendOptions::new("news@example.com", "jack@example.com", Message::default())
///     .reply_to(["support@example.com"]);
/// assert_eq!(options.reply_to, vec!["support@example.com"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// `From` address
    pub from: String,
    /// Single recipient address
    pub to: String,
    /// `Reply-To` addresses
    pub reply_to: Vec<String>,
    /// Rendered message; `None` is rejected by every transport
    pub message: Option<Message>,
}

impl SendOptions {
    /// Create send options for one recipient
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, message: Message) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            reply_to: Vec::new(),
            message: Some(message),
        }
    }

    /// Set the `Reply-To` addresses
    #[must_use]
    pub fn reply_to<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reply_to = addresses.into_iter().map(Into::into).collect();
        self
    }
}
