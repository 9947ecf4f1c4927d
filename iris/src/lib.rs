//! iris: templated bulk email dispatch
//!
//! Sends one personalised email per row of a CSV recipient table. Each
//! message is rendered from three Handlebars templates (subject, text body and
//! HTML body) and handed to a pluggable delivery service.
//!
//! # Pipeline
//!
//! 1. [`data::RecipientDataSource`] streams recipient records, overlaying
//!    fallback values from an optional default table
//! 2. [`template::MessageRenderer`] renders the subject and both bodies
//! 3. [`email::DeliveryService`] delivers the message through SMTP, AWS SES
//!    or a dry-run printer, under a rate limit and a retry policy
//!
//! [`dispatch::DispatchLoop`] drives the three stages and stops on the first
//! error.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use iris::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     iris::observability::init()?;
//!
//!     let dir = std::path::Path::new("campaign");
//!     let config = IrisConfig::load_from_dir(dir)?;
//!
//!     let renderer =
//!         MessageRenderer::compile(&TemplateFiles::in_dir(dir), config.message.minify_html)?;
//!     let source = RecipientDataSource::open(
//!         config.message.default_data_path(dir).as_deref(),
//!         &config.message.recipient_data_path(dir),
//!     )?;
//!     let service = select_service(&config.service, true).await?;
//!
//!     let report = DispatchLoop::new(&config.message)
//!         .run(source, &renderer, &service)
//!         .await?;
//!     println!("sent {} emails", report.sent);
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `aws-ses` - AWS SES v2 delivery

pub mod config;
pub mod data;
pub mod dispatch;
pub mod email;
pub mod error;
pub mod observability;
pub mod template;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! ```rust
    //! use iris::prelude::*;
    //! ```

    pub use crate::config::{IrisConfig, MessageSettings, ServiceSettings};
    pub use crate::data::{DefaultValues, RecipientDataSource, RecipientRecord};
    pub use crate::dispatch::{DispatchLoop, DispatchReport};
    pub use crate::email::{
        apply_options, select_service, BoxedService, DeliveryService, Message, PrintTransport,
        SendOptions,
    };
    pub use crate::error::IrisError;
    pub use crate::template::{MessageRenderer, TemplateFiles};
}
