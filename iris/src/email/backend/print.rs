//! Print transport for dry runs
//!
//! Writes each message to an output sink as a table instead of sending it.
//! Never touches the network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::Write as _;
use std::io::{self, Stdout, Write};
use tracing::debug;

use crate::email::{DeliveryService, SendError, SendOptions};

/// Content width used when the terminal size is unknown
pub const DEFAULT_WIDTH: usize = 100;

/// Width taken by the label column and the table borders
const FRAME_WIDTH: usize = 16;

const LABEL_WIDTH: usize = 9;

/// Print transport for previews
///
/// Renders the recipient, subject, text body and HTML body of every message
/// as rows of a table. Long content is word-wrapped to fit the terminal.
///
/// # Examples
///
/// ```rust
/// use iris::email::{DeliveryService, Message, PrintTransport, SendOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let preview = PrintTransport::with_width(Vec::new(), 40);
/// let message = Message {
///     subject: "Hello Jack".to_string(),
///     ..Message::default()
/// };
///
/// preview
///     .send(&SendOptions::new("news@example.com", "jack@example.com", message))
///     .await?;
///
/// let output = String::from_utf8(preview.into_inner())?;
/// assert!(output.contains("Hello Jack"));
/// # Ok(())
/// # }
/// ```
pub struct PrintTransport<W = Stdout> {
    out: Mutex<W>,
    width: usize,
}

impl PrintTransport<Stdout> {
    /// Print transport writing to standard output
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> PrintTransport<W> {
    /// Print transport sized to the current terminal
    #[must_use]
    pub fn new(out: W) -> Self {
        let width = console::Term::stdout()
            .size_checked()
            .map_or(DEFAULT_WIDTH, |(_, columns)| usize::from(columns));
        Self::with_width(out, content_width(width))
    }

    /// Print transport wrapping content at `width` characters
    #[must_use]
    pub fn with_width(out: W, width: usize) -> Self {
        Self {
            out: Mutex::new(out),
            width: width.max(1),
        }
    }

    /// Recover the output sink
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn render_table(&self, options: &SendOptions) -> Result<String, SendError> {
        let message = options.message.as_ref().ok_or(SendError::MissingMessage)?;

        let rows: Vec<(&str, Vec<String>)> = [
            ("To", options.to.as_str()),
            ("Subject", message.subject.as_str()),
            ("Text Body", message.text_body.as_str()),
            ("HTML Body", message.html_body.as_str()),
        ]
        .into_iter()
        .map(|(label, value)| (label, wrap(value, self.width)))
        .collect();

        let value_width = rows
            .iter()
            .flat_map(|(_, lines)| lines.iter())
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);

        let border = |left: &str, middle: &str, right: &str| {
            format!(
                "{left}{}{middle}{}{right}\n",
                "─".repeat(LABEL_WIDTH + 2),
                "─".repeat(value_width + 2)
            )
        };

        let mut table = border("╭", "┬", "╮");
        for (index, (label, lines)) in rows.iter().enumerate() {
            if index > 0 {
                table.push_str(&border("├", "┼", "┤"));
            }
            for (line_index, line) in lines.iter().enumerate() {
                let label = if line_index == 0 { *label } else { "" };
                // Writing into a String cannot fail
                let _ = writeln!(table, "│ {label:<LABEL_WIDTH$} │ {line:<value_width$} │");
            }
        }
        table.push_str(&border("╰", "┴", "╯"));
        Ok(table)
    }
}

#[async_trait]
impl<W: Write + Send> DeliveryService for PrintTransport<W> {
    async fn send(&self, options: &SendOptions) -> Result<(), SendError> {
        let table = self.render_table(options)?;

        let mut out = self.out.lock();
        out.write_all(table.as_bytes())?;
        out.flush()?;
        drop(out);

        debug!(to = %options.to, "Printed email");
        Ok(())
    }

    async fn close(&self) -> Result<(), SendError> {
        self.out.lock().flush()?;
        Ok(())
    }
}

/// Content column width for a terminal `terminal_width` characters wide
#[must_use]
pub const fn content_width(terminal_width: usize) -> usize {
    let width = if terminal_width > FRAME_WIDTH {
        terminal_width - FRAME_WIDTH
    } else {
        terminal_width
    };

    if width > DEFAULT_WIDTH {
        DEFAULT_WIDTH
    } else {
        width
    }
}

/// Greedy word wrap that keeps existing line breaks
///
/// Words longer than `width` are placed on a line of their own and not split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for source_line in text.lines() {
        let mut current = String::new();
        for word in source_line.split_whitespace() {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };

            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
