//! AWS SES transport for sending emails
//!
//! Uses the AWS Simple Email Service (SES) v2 API.
//! Requires the `aws-ses` feature to be enabled.

use async_trait::async_trait;
use aws_sdk_sesv2::{
    config::Region,
    types::{Body, Content, Destination, EmailContent, Message},
    Client,
};
use tracing::{debug, info};

use crate::config::AwsSesSettings;
use crate::email::{DeliveryService, SendError, SendOptions};

const CHARSET: &str = "UTF-8";

/// AWS SES email transport
///
/// # Examples
///
/// ```rust,no_run
/// use iris::config::AwsSesSettings;
/// use iris::email::AwsSesTransport;
///
/// # async fn example() {
/// let settings = AwsSesSettings {
///     region: "eu-west-1".to_string(),
///     profile: "mailing".to_string(),
/// };
///
/// // Credentials come from the shared AWS config files for the profile
/// let transport = AwsSesTransport::connect(&settings).await;
/// # }
/// ```
pub struct AwsSesTransport {
    client: Client,
}

impl AwsSesTransport {
    /// Create a new AWS SES transport with the given client
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a client for the configured region and profile
    ///
    /// Empty region or profile fall back to the AWS SDK default chain.
    pub async fn connect(settings: &AwsSesSettings) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if !settings.region.is_empty() {
            loader = loader.region(Region::new(settings.region.clone()));
        }
        if !settings.profile.is_empty() {
            loader = loader.profile_name(&settings.profile);
        }

        let config = loader.load().await;
        info!(region = %settings.region, profile = %settings.profile, "Created AWS SES client");
        Self::new(Client::new(&config))
    }

    /// Build the SES content for a rendered message
    ///
    /// # Errors
    ///
    /// Returns `SendError::MissingMessage` if `options` carries no message, or
    /// `SendError::AwsSes` if the SDK rejects a content part.
    pub fn build_content(options: &SendOptions) -> Result<EmailContent, SendError> {
        let message = options.message.as_ref().ok_or(SendError::MissingMessage)?;

        let body = Body::builder()
            .html(content(&message.html_body, "HTML body")?)
            .text(content(&message.text_body, "text body")?)
            .build();

        let message = Message::builder()
            .subject(content(&message.subject, "subject")?)
            .body(body)
            .build();

        Ok(EmailContent::builder().simple(message).build())
    }
}

#[async_trait]
impl DeliveryService for AwsSesTransport {
    async fn send(&self, options: &SendOptions) -> Result<(), SendError> {
        let content = Self::build_content(options)?;

        let mut request = self
            .client
            .send_email()
            .from_email_address(&options.from)
            .destination(Destination::builder().to_addresses(&options.to).build())
            .content(content);

        for reply_to in &options.reply_to {
            request = request.reply_to_addresses(reply_to);
        }

        let output = request
            .send()
            .await
            .map_err(|e| SendError::aws_ses(format!("failed to send email: {e}")))?;

        debug!(
            to = %options.to,
            message_id = output.message_id().unwrap_or_default(),
            "Sent email via AWS SES"
        );
        Ok(())
    }
}

fn content(data: &str, part: &str) -> Result<Content, SendError> {
    Content::builder()
        .data(data)
        .charset(CHARSET)
        .build()
        .map_err(|e| SendError::aws_ses(format!("failed to build {part} content: {e}")))
}
