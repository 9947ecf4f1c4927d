//! Transport implementations
//!
//! - **SMTP**: Send emails via an SMTP server
//! - **AWS SES**: Send emails via Amazon SES (requires the `aws-ses` feature)
//! - **Print**: Write emails to a terminal table (dry runs)

#[cfg(feature = "aws-ses")]
pub mod aws_ses;
pub mod print;
pub mod smtp;
