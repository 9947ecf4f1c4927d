//! Working directory templates
//!
//! Sample templates and tables written by `iris init`. The samples are
//! Handlebars templates themselves: `{{recipient_column}}` and the other
//! settings are filled in from the configuration, and `{{field "Name"}}`
//! emits a placeholder (`{{Name}}`) for the message templates.

use anyhow::{Context, Result};
use handlebars::{handlebars_helper, Handlebars};
use iris::config::MessageSettings;
use iris::template::{HTML_BODY_FILE, SUBJECT_FILE, TEXT_BODY_FILE};
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Sample subject template
pub const SUBJECT_TXT: &str = r#"Hello {{field "Name"}}"#;

/// Sample plain text body template
pub const BODY_TXT: &str = r#"Iris is a CLI tool for sending templated bulk emails.

You can inject data into templates, e.g. a date - {{field "Date"}} or your email - {{field recipient_column}}.
"#;

/// Sample HTML body template
pub const BODY_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <meta http-equiv="Content-Type" content="text/html; charset=UTF-8" />
    <title>Hello {{field "Name"}}</title>
  </head>
  <body>
    <p>Iris is a CLI tool for sending templated bulk emails.</p>
    <p>
      You can inject data into templates, e.g. a date - {{field "Date"}} or your
      email - {{field recipient_column}}.
    </p>
  </body>
</html>
"#;

/// Sample default table
pub const DEFAULT_CSV: &str = "Date\nJanuary 2006\n";

/// Sample recipient table
pub const RECIPIENTS_CSV: &str = "Name,{{recipient_column}}
Jack,jack@example.test
Jill,jill@example.test
";

// Placeholder for a message template column; bracketed when the column is
// not a plain identifier
handlebars_helper!(field: |name: str| {
    if name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        format!("{{{{{name}}}}}")
    } else {
        format!("{{{{[{name}]}}}}")
    }
});

/// Outcome of writing one sample file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// The file was written
    Created(PathBuf),
    /// A file already existed at the path and was left untouched
    Skipped(PathBuf),
}

impl FileStatus {
    /// Path of the file
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::Skipped(path) => path,
        }
    }
}

/// Generator for the sample files of a working directory
pub struct WorkspaceTemplate<'a> {
    settings: &'a MessageSettings,
    handlebars: Handlebars<'static>,
}

impl<'a> WorkspaceTemplate<'a> {
    /// Create a generator naming files and columns after `settings`
    #[must_use]
    pub fn new(settings: &'a MessageSettings) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Output is template source, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("field", Box::new(field));

        Self {
            settings,
            handlebars,
        }
    }

    /// Write every sample file into `output_dir`
    ///
    /// Existing files are never overwritten. The default table is skipped
    /// when the configuration names none.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Template rendering fails
    /// - File writing fails
    pub fn generate(&self, output_dir: &Path) -> Result<Vec<FileStatus>> {
        let context = json!({
            "recipient_column": self.settings.recipient_column,
        });

        let mut files = vec![
            (SUBJECT_FILE, SUBJECT_TXT),
            (TEXT_BODY_FILE, BODY_TXT),
            (HTML_BODY_FILE, BODY_HTML),
            (self.settings.recipient_data_file.as_str(), RECIPIENTS_CSV),
        ];
        if !self.settings.default_data_file.is_empty() {
            files.push((self.settings.default_data_file.as_str(), DEFAULT_CSV));
        }

        files
            .into_iter()
            .map(|(name, template)| self.write_file(output_dir, name, template, &context))
            .collect()
    }

    /// Render a single file, writing it only if nothing exists at its path
    fn write_file(
        &self,
        output_dir: &Path,
        relative_path: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<FileStatus> {
        let path = output_dir.join(relative_path);

        let rendered = self
            .handlebars
            .render_template(template, context)
            .with_context(|| format!("Failed to render template: {relative_path}"))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(FileStatus::Skipped(path)),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create file: {}", path.display()))
            }
        };
        file.write_all(rendered.as_bytes())
            .with_context(|| format!("Failed to write file: {}", path.display()))?;

        Ok(FileStatus::Created(path))
    }
}
