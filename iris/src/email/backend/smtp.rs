//! SMTP transport for sending emails
//!
//! Uses the `lettre` crate with a pooled connection that is opened when the
//! transport is created and reused for every message.

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::SmtpSettings;
use crate::email::{DeliveryService, SendError, SendOptions};

/// Connection encryption mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encryption {
    /// Plain text connection
    None,
    /// Implicit TLS (legacy name)
    Ssl,
    /// STARTTLS (legacy name)
    Tls,
    /// Implicit TLS
    #[default]
    SslTls,
    /// Upgrade a plain connection with STARTTLS
    StartTls,
}

impl FromStr for Encryption {
    type Err = SendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "ssl" => Ok(Self::Ssl),
            "tls" => Ok(Self::Tls),
            "" | "ssl/tls" => Ok(Self::SslTls),
            "starttls" => Ok(Self::StartTls),
            _ => Err(SendError::config(format!(
                "unrecognised smtp encryption type: {s}"
            ))),
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Ssl => "ssl",
            Self::Tls => "tls",
            Self::SslTls => "ssl/tls",
            Self::StartTls => "starttls",
        })
    }
}

/// SMTP email transport
///
/// # Examples
///
/// ```rust,no_run
/// use iris::config::SmtpSettings;
/// use iris::email::{DeliveryService, SmtpTransport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = SmtpSettings {
///     host: "smtp.example.com".to_string(),
///     encryption: "starttls".to_string(),
///     ..SmtpSettings::default()
/// };
///
/// let transport = SmtpTransport::connect(&settings).await?;
/// // ... send messages ...
/// transport.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct SmtpTransport {
    transport: Mutex<Option<AsyncSmtpTransport<Tokio1Executor>>>,
}

impl SmtpTransport {
    /// Connect to the SMTP server described by `settings`
    ///
    /// # Errors
    ///
    /// Returns `SendError::Config` for an unrecognised encryption mode, or
    /// `SendError::Smtp` if the server cannot be reached.
    pub async fn connect(settings: &SmtpSettings) -> Result<Self, SendError> {
        let transport = Self::build_transport(settings)?;

        let connected = transport
            .test_connection()
            .await
            .map_err(|e| SendError::smtp(format!("failed to connect to smtp server: {e}")))?;
        if !connected {
            return Err(SendError::smtp(format!(
                "failed to connect to smtp server {}:{}",
                settings.host, settings.port
            )));
        }

        info!(host = %settings.host, port = settings.port, "Connected to SMTP server");
        Ok(Self::from_transport(transport))
    }

    /// Wrap an already configured lettre transport
    #[must_use]
    pub const fn from_transport(transport: AsyncSmtpTransport<Tokio1Executor>) -> Self {
        Self {
            transport: Mutex::new(Some(transport)),
        }
    }

    /// Create SMTP transport from settings without connecting
    ///
    /// # Errors
    ///
    /// Returns `SendError::Config` for an unrecognised encryption mode, or
    /// `SendError::Smtp` if TLS parameters cannot be built.
    pub fn build_transport(
        settings: &SmtpSettings,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
        let encryption: Encryption = settings.encryption.parse()?;

        let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            .port(settings.port);

        let builder = match encryption {
            Encryption::None => builder,
            Encryption::Ssl | Encryption::SslTls => {
                builder.tls(Tls::Wrapper(tls_parameters(&settings.host)?))
            }
            Encryption::Tls | Encryption::StartTls => {
                builder.tls(Tls::Required(tls_parameters(&settings.host)?))
            }
        };

        let builder = if settings.username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
        };

        debug!(host = %settings.host, %encryption, "Built SMTP transport");
        Ok(builder.build())
    }

    /// Build a `multipart/alternative` lettre message from send options
    ///
    /// # Errors
    ///
    /// Returns `SendError::MissingMessage`, `SendError::InvalidAddress` for an
    /// unparseable address, or `SendError::Smtp` if the message cannot be
    /// assembled.
    pub fn build_message(options: &SendOptions) -> Result<Message, SendError> {
        let message = options.message.as_ref().ok_or(SendError::MissingMessage)?;

        let mut builder = Message::builder()
            .from(parse_mailbox(&options.from)?)
            .to(parse_mailbox(&options.to)?)
            .subject(message.subject.as_str());

        for reply_to in &options.reply_to {
            builder = builder.reply_to(parse_mailbox(reply_to)?);
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))
            .map_err(|e| SendError::smtp(e.to_string()))
    }
}

#[async_trait]
impl DeliveryService for SmtpTransport {
    async fn send(&self, options: &SendOptions) -> Result<(), SendError> {
        let message = Self::build_message(options)?;
        let transport = self.transport.lock().clone().ok_or(SendError::Closed)?;

        transport
            .send(message)
            .await
            .map_err(|e| SendError::smtp(format!("failed to send email: {e}")))?;

        debug!(to = %options.to, "Sent email over SMTP");
        Ok(())
    }

    async fn close(&self) -> Result<(), SendError> {
        // Dropping the last handle shuts the connection pool down
        if self.transport.lock().take().is_some() {
            debug!("Closed SMTP transport");
        }
        Ok(())
    }
}

fn tls_parameters(host: &str) -> Result<TlsParameters, SendError> {
    TlsParameters::new(host.to_string())
        .map_err(|e| SendError::smtp(format!("TLS parameters error: {e}")))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SendError> {
    address
        .parse()
        .map_err(|_| SendError::InvalidAddress(address.to_string()))
}
