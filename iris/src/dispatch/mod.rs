//! The dispatch loop
//!
//! Reads recipient records one at a time, renders a message for each and
//! hands it to a delivery service. The first error stops the run; messages
//! sent before it stay sent.
//!
//! ```text
//! Ready -> (Reading -> Rendering -> Sending)* -> Done | Failed
//! ```

use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::config::MessageSettings;
use crate::data::{DataError, RecipientRecord};
use crate::email::{DeliveryService, SendOptions};
use crate::error::IrisError;
use crate::template::MessageRenderer;

/// Stage of a dispatch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing read yet
    Ready,
    /// Reading the next record
    Reading,
    /// Rendering a message
    Rendering,
    /// Handing a message to the delivery service
    Sending,
    /// All records were sent
    Done,
    /// The run stopped on an error
    Failed,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "ready",
            Self::Reading => "reading",
            Self::Rendering => "rendering",
            Self::Sending => "sending",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of messages sent
    pub sent: usize,
    /// Wall time of the run, including rate limiting
    pub elapsed: Duration,
}

/// Drives records through rendering and delivery
///
/// # Examples
///
/// ```rust
/// use iris::config::MessageSettings;
/// use iris::data::RecipientDataSource;
/// use iris::dispatch::DispatchLoop;
/// use iris::email::PrintTransport;
/// use iris::template::MessageRenderer;
///
/// # async fn example() -> Result<(), iris::error::IrisError> {
/// let settings = MessageSettings {
///     recipient_column: "email".to_string(),
///     ..MessageSettings::default()
/// };
/// let source = RecipientDataSource::from_readers(
///     None::<&[u8]>,
///     "name,email\nJack,jack@example.test\n".as_bytes(),
/// )?;
/// let renderer = MessageRenderer::from_strings("Hello {{name}}", "Hi", "<p>Hi</p>", false)?;
/// let service = PrintTransport::with_width(Vec::new(), 60);
///
/// let report = DispatchLoop::new(&settings)
///     .run(source, &renderer, &service)
///     .await?;
/// assert_eq!(report.sent, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DispatchLoop<'a> {
    settings: &'a MessageSettings,
    state: DispatchState,
    sent: usize,
}

impl<'a> DispatchLoop<'a> {
    /// Create a loop sending with `settings`
    #[must_use]
    pub const fn new(settings: &'a MessageSettings) -> Self {
        Self {
            settings,
            state: DispatchState::Ready,
            sent: 0,
        }
    }

    /// Current stage
    #[must_use]
    pub const fn state(&self) -> DispatchState {
        self.state
    }

    /// Send one message per record until the records run out
    ///
    /// The service is closed before returning, whether the run succeeded or
    /// not. A close failure is reported only when the run itself succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first data, render, recipient or send error.
    pub async fn run<I, S>(
        mut self,
        records: I,
        renderer: &MessageRenderer,
        service: &S,
    ) -> Result<DispatchReport, IrisError>
    where
        I: IntoIterator<Item = Result<RecipientRecord, DataError>>,
        I::IntoIter: Send,
        S: DeliveryService + ?Sized,
    {
        let started = Instant::now();
        let result = self.drive(records, renderer, service).await;
        let closed = service.close().await;

        match result {
            Ok(()) => {
                closed?;
                self.transition(DispatchState::Done);
                let report = DispatchReport {
                    sent: self.sent,
                    elapsed: started.elapsed(),
                };
                info!(
                    sent = report.sent,
                    elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Dispatch complete"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(close_error) = closed {
                    warn!(error = %close_error, "Failed to close delivery service");
                }
                error!(stage = %self.state, sent = self.sent, error = %e, "Dispatch failed");
                self.transition(DispatchState::Failed);
                Err(e)
            }
        }
    }

    async fn drive<I, S>(
        &mut self,
        records: I,
        renderer: &MessageRenderer,
        service: &S,
    ) -> Result<(), IrisError>
    where
        I: IntoIterator<Item = Result<RecipientRecord, DataError>>,
        I::IntoIter: Send,
        S: DeliveryService + ?Sized,
    {
        let mut records = records.into_iter();
        loop {
            self.transition(DispatchState::Reading);
            let Some(record) = records.next().transpose()? else {
                return Ok(());
            };

            let to = self.recipient(&record)?;

            self.transition(DispatchState::Rendering);
            let message = renderer.render(&record)?;

            self.transition(DispatchState::Sending);
            let options = SendOptions::new(self.settings.sender.as_str(), to, message)
                .reply_to(self.settings.reply_to.iter().cloned());
            service.send(&options).await?;

            self.sent += 1;
            debug!(to = %options.to, sent = self.sent, "Sent message");
        }
    }

    fn recipient(&self, record: &RecipientRecord) -> Result<String, IrisError> {
        let column = &self.settings.recipient_column;
        match record.get(column).map(str::trim) {
            Some(address) if !address.is_empty() => Ok(address.to_string()),
            _ => Err(IrisError::MissingRecipient {
                record: self.sent + 1,
                column: column.clone(),
            }),
        }
    }

    fn transition(&mut self, next: DispatchState) {
        trace!(from = %self.state, to = %next, "Dispatch state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RecipientDataSource;
    use crate::email::{MockDeliveryService, SendError};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn settings() -> MessageSettings {
        MessageSettings {
            sender: "news@example.test".to_string(),
            reply_to: vec!["help@example.test".to_string()],
            recipient_column: "email".to_string(),
            ..MessageSettings::default()
        }
    }

    fn renderer() -> MessageRenderer {
        MessageRenderer::from_strings(
            "Hello {{name}}",
            "Hi {{name}}, it is {{date}}.",
            "<p>Hi {{name}}, it is {{date}}.</p>",
            false,
        )
        .unwrap()
    }

    fn source(recipients: &str) -> RecipientDataSource<&[u8]> {
        RecipientDataSource::from_readers(Some("date\nJanuary 2006\n".as_bytes()), recipients.as_bytes())
            .unwrap()
    }

    /// Mock recording every send and expecting exactly one close
    fn recording(sent: Arc<Mutex<Vec<SendOptions>>>) -> MockDeliveryService {
        let mut service = MockDeliveryService::new();
        service.expect_send().returning(move |options| {
            sent.lock().push(options.clone());
            Ok(())
        });
        service.expect_close().times(1).returning(|| Ok(()));
        service
    }

    #[tokio::test]
    async fn test_sends_one_message_per_record() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = recording(Arc::clone(&sent));
        let settings = settings();

        let report = DispatchLoop::new(&settings)
            .run(
                source("name,email\nJack,jack@example.test\nJill,jill@example.test\n"),
                &renderer(),
                &service,
            )
            .await
            .unwrap();

        assert_eq!(report.sent, 2);
        let sent = sent.lock();
        let subjects: Vec<_> = sent
            .iter()
            .map(|o| o.message.as_ref().unwrap().subject.as_str())
            .collect();
        assert_eq!(subjects, ["Hello Jack", "Hello Jill"]);
        assert_eq!(sent[0].to, "jack@example.test");
        assert_eq!(sent[1].to, "jill@example.test");
        assert_eq!(sent[0].from, "news@example.test");
        assert_eq!(sent[0].reply_to, ["help@example.test"]);
        assert!(sent
            .iter()
            .all(|o| o.message.as_ref().unwrap().text_body.ends_with("January 2006.")));
    }

    #[tokio::test]
    async fn test_empty_table_sends_nothing() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = recording(Arc::clone(&sent));
        let settings = settings();

        let report = DispatchLoop::new(&settings)
            .run(source("name,email\n"), &renderer(), &service)
            .await
            .unwrap();

        assert_eq!(report.sent, 0);
        assert!(sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_recipient_stops_run() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = recording(Arc::clone(&sent));
        let settings = settings();

        let result = DispatchLoop::new(&settings)
            .run(
                source("name,email\nJack,jack@example.test\nJill,\nJoe,joe@example.test\n"),
                &renderer(),
                &service,
            )
            .await;

        match result {
            Err(IrisError::MissingRecipient { record, column }) => {
                assert_eq!(record, 2);
                assert_eq!(column, "email");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_recipient_is_reported_before_render_errors() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = recording(Arc::clone(&sent));
        let settings = settings();
        let renderer =
            MessageRenderer::from_strings("Hello {{nickname}}", "", "", false).unwrap();

        let result = DispatchLoop::new(&settings)
            .run(source("name,email\nJill,\n"), &renderer, &service)
            .await;

        match result {
            Err(IrisError::MissingRecipient { record, column }) => {
                assert_eq!(record, 1);
                assert_eq!(column, "email");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_render_error_stops_run() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = recording(Arc::clone(&sent));
        let settings = settings();
        let renderer =
            MessageRenderer::from_strings("Hello {{nickname}}", "", "", false).unwrap();

        let result = DispatchLoop::new(&settings)
            .run(source("name,email\nJack,jack@example.test\n"), &renderer, &service)
            .await;

        assert!(matches!(result, Err(IrisError::Render(_))));
        assert!(sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_row_stops_run() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let service = recording(Arc::clone(&sent));
        let settings = settings();

        let result = DispatchLoop::new(&settings)
            .run(
                source("name,email\nJack,jack@example.test\nJill\n"),
                &renderer(),
                &service,
            )
            .await;

        assert!(matches!(result, Err(IrisError::Data(_))));
        assert_eq!(sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_send_error_closes_service() {
        let mut service = MockDeliveryService::new();
        service
            .expect_send()
            .times(1)
            .returning(|_| Err(SendError::smtp("mailbox unavailable")));
        service.expect_close().times(1).returning(|| Ok(()));
        let settings = settings();

        let result = DispatchLoop::new(&settings)
            .run(
                source("name,email\nJack,jack@example.test\nJill,jill@example.test\n"),
                &renderer(),
                &service,
            )
            .await;

        assert!(matches!(result, Err(IrisError::Send(SendError::Smtp(_)))));
    }

    #[tokio::test]
    async fn test_close_error_reported_after_success() {
        let mut service = MockDeliveryService::new();
        service.expect_send().returning(|_| Ok(()));
        service
            .expect_close()
            .times(1)
            .returning(|| Err(SendError::Closed));
        let settings = settings();

        let result = DispatchLoop::new(&settings)
            .run(source("name,email\nJack,jack@example.test\n"), &renderer(), &service)
            .await;

        assert!(matches!(result, Err(IrisError::Send(SendError::Closed))));
    }

    #[test]
    fn test_new_loop_is_ready() {
        let settings = settings();
        assert_eq!(DispatchLoop::new(&settings).state(), DispatchState::Ready);
    }
}
