//! Message rendering from Handlebars templates
//!
//! A message is made of three templates, looked up in the working directory:
//!
//! - `subject.txt` - the subject line
//! - `body.txt` - the plain text body
//! - `body.html` - the HTML body
//!
//! Every column of a [`RecipientRecord`] is available to the templates by
//! name, e.g. `Hello {{name}}`. Columns containing spaces use bracket
//! segments: `{{[First Name]}}`. A leading dot on a column name is dropped,
//! so `{{.name}}` renders the same as `{{name}}`.
//!
//! Templates run in strict mode: referencing a column that the record does
//! not have is a render error rather than an empty string. Output is not
//! HTML-escaped; template authors control the markup.
//!
//! # Examples
//!
//! ```rust
//! use iris::data::RecipientRecord;
//! use iris::template::MessageRenderer;
//!
//! # fn example() -> Result<(), iris::template::RenderError> {
//! let renderer = MessageRenderer::from_strings(
//!     "Hello {{name}}",
//!     "Hi {{name}}, see you in {{date}}.",
//!     "<p>Hi <b>{{name}}</b></p>",
//!     false,
//! )?;
//!
//! let record: RecipientRecord = [("name", "Jack"), ("date", "January 2006")]
//!     .into_iter()
//!     .collect();
//! let message = renderer.render(&record)?;
//! assert_eq!(message.subject, "Hello Jack");
//! # Ok(())
//! # }
//! ```

mod minify;

use handlebars::{Context, Handlebars};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

use crate::data::RecipientRecord;
use crate::email::Message;

pub use minify::HtmlMinifier;

/// Registry name of the subject template
pub const SUBJECT_TEMPLATE: &str = "subject";
/// Registry name of the text body template
pub const TEXT_BODY_TEMPLATE: &str = "text body";
/// Registry name of the HTML body template
pub const HTML_BODY_TEMPLATE: &str = "html body";

/// File name of the subject template
pub const SUBJECT_FILE: &str = "subject.txt";
/// File name of the text body template
pub const TEXT_BODY_FILE: &str = "body.txt";
/// File name of the HTML body template
pub const HTML_BODY_FILE: &str = "body.html";

/// Errors raised while compiling or rendering templates
#[derive(Debug, Error)]
pub enum RenderError {
    /// A template file could not be read
    #[error("failed to read {template} template {}: {source}", .path.display())]
    Read {
        /// Which template failed
        template: &'static str,
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A template has invalid syntax
    #[error("failed to parse {template} template: {source}")]
    Compile {
        /// Which template failed
        template: &'static str,
        /// Underlying parse error
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    /// A template failed to execute against a record
    #[error("failed to render {template} template: {source}")]
    Render {
        /// Which template failed
        template: &'static str,
        /// Underlying render error
        #[source]
        source: Box<handlebars::RenderError>,
    },

    /// The HTML body could not be minified
    #[error("failed to minify html body: {0}")]
    Minify(#[from] std::string::FromUtf8Error),
}

/// Locations of the three message templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFiles {
    /// Subject template
    pub subject: PathBuf,
    /// Plain text body template
    pub text_body: PathBuf,
    /// HTML body template
    pub html_body: PathBuf,
}

impl TemplateFiles {
    /// Conventional template files inside `dir`
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            subject: dir.join(SUBJECT_FILE),
            text_body: dir.join(TEXT_BODY_FILE),
            html_body: dir.join(HTML_BODY_FILE),
        }
    }
}

/// Renders messages from three precompiled templates
///
/// Templates are parsed once in the constructor and only read afterwards, so
/// a renderer can be shared and called any number of times.
pub struct MessageRenderer {
    registry: Handlebars<'static>,
    minifier: Option<HtmlMinifier>,
}

impl MessageRenderer {
    /// Compile the templates found at `files`
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Read` naming the first template file that cannot
    /// be read, or `RenderError::Compile` naming the first that fails to parse.
    pub fn compile(files: &TemplateFiles, minify_html: bool) -> Result<Self, RenderError> {
        let mut registry = Self::registry();
        for (name, path) in [
            (SUBJECT_TEMPLATE, &files.subject),
            (TEXT_BODY_TEMPLATE, &files.text_body),
            (HTML_BODY_TEMPLATE, &files.html_body),
        ] {
            let source = fs::read_to_string(path).map_err(|source| RenderError::Read {
                template: name,
                path: path.clone(),
                source,
            })?;
            register(&mut registry, name, &source)?;
        }

        debug!(
            subject = %files.subject.display(),
            text_body = %files.text_body.display(),
            html_body = %files.html_body.display(),
            minify_html,
            "Compiled message templates"
        );

        Ok(Self::with_registry(registry, minify_html))
    }

    /// Compile templates from source strings
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Compile` naming the first template that fails to
    /// parse.
    pub fn from_strings(
        subject: &str,
        text_body: &str,
        html_body: &str,
        minify_html: bool,
    ) -> Result<Self, RenderError> {
        let mut registry = Self::registry();
        for (name, source) in [
            (SUBJECT_TEMPLATE, subject),
            (TEXT_BODY_TEMPLATE, text_body),
            (HTML_BODY_TEMPLATE, html_body),
        ] {
            register(&mut registry, name, source)?;
        }

        Ok(Self::with_registry(registry, minify_html))
    }

    fn registry() -> Handlebars<'static> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry
    }

    fn with_registry(registry: Handlebars<'static>, minify_html: bool) -> Self {
        Self {
            registry,
            minifier: minify_html.then(HtmlMinifier::new),
        }
    }

    /// Whether the HTML body is minified after rendering
    #[must_use]
    pub const fn minifies_html(&self) -> bool {
        self.minifier.is_some()
    }

    /// Render a message for one recipient
    ///
    /// Templates are evaluated in the order subject, text body, HTML body.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Render` naming the failing template, or
    /// `RenderError::Minify` if minification fails.
    pub fn render(&self, data: &RecipientRecord) -> Result<Message, RenderError> {
        let context = Context::wraps(data).map_err(|e| render_error(SUBJECT_TEMPLATE, e))?;

        let subject = self.render_one(SUBJECT_TEMPLATE, &context)?;
        let text_body = self.render_one(TEXT_BODY_TEMPLATE, &context)?;
        let mut html_body = self.render_one(HTML_BODY_TEMPLATE, &context)?;

        if let Some(minifier) = &self.minifier {
            html_body = minifier.minify(&html_body)?;
        }

        trace!(subject = %subject, "Rendered message");
        Ok(Message {
            subject,
            text_body,
            html_body,
        })
    }

    fn render_one(&self, name: &'static str, context: &Context) -> Result<String, RenderError> {
        self.registry
            .render_with_context(name, context)
            .map_err(|e| render_error(name, e))
    }
}

fn register(
    registry: &mut Handlebars<'static>,
    name: &'static str,
    source: &str,
) -> Result<(), RenderError> {
    registry
        .register_template_string(name, strip_leading_dots(source))
        .map_err(|e| compile_error(name, e))
}

/// Drop the `.` in front of a name opening an expression (`{{.name}}`)
///
/// `{{.}}`, `{{..}}` and `{{./name}}` are left alone.
fn strip_leading_dots(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        let (before, after) = rest.split_at(start + 2);
        out.push_str(before);

        let name = after.trim_start_matches([' ', '\t']);
        let mut chars = name.chars();
        if chars.next() == Some('.')
            && chars.next().is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            out.push_str(&after[..after.len() - name.len()]);
            rest = &name[1..];
        } else {
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

fn compile_error(template: &'static str, source: handlebars::TemplateError) -> RenderError {
    RenderError::Compile {
        template,
        source: Box::new(source),
    }
}

fn render_error(template: &'static str, source: handlebars::RenderError) -> RenderError {
    RenderError::Render {
        template,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(pairs: &[(&str, &str)]) -> RecipientRecord {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_render_substitutes_columns() {
        let renderer = MessageRenderer::from_strings(
            "Hello {{name}}",
            "Dear {{name}},\nSee you in {{date}}.",
            "<p>Dear {{name}}</p>",
            false,
        )
        .unwrap();

        let message = renderer
            .render(&record(&[("name", "Jack"), ("date", "January 2006")]))
            .unwrap();

        assert_eq!(message.subject, "Hello Jack");
        assert_eq!(message.text_body, "Dear Jack,\nSee you in January 2006.");
        assert_eq!(message.html_body, "<p>Dear Jack</p>");
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = MessageRenderer::from_strings(
            "{{a}}-{{b}}",
            "{{b}} {{a}} {{c}}",
            "<i>{{c}}</i>",
            true,
        )
        .unwrap();
        let data = record(&[("a", "1"), ("b", "2"), ("c", "3")]);

        assert_eq!(renderer.render(&data).unwrap(), renderer.render(&data).unwrap());
    }

    #[test]
    fn test_columns_with_spaces_use_brackets() {
        let renderer =
            MessageRenderer::from_strings("Hi {{[First Name]}}", "", "", false).unwrap();
        let message = renderer.render(&record(&[("First Name", "Jill")])).unwrap();
        assert_eq!(message.subject, "Hi Jill");
    }

    #[test]
    fn test_html_is_not_escaped() {
        let renderer = MessageRenderer::from_strings("", "", "<div>{{snippet}}</div>", false)
            .unwrap();
        let message = renderer
            .render(&record(&[("snippet", "<b>bold & brave</b>")]))
            .unwrap();
        assert_eq!(message.html_body, "<div><b>bold & brave</b></div>");
    }

    #[test]
    fn test_unknown_column_names_failing_template() {
        let renderer =
            MessageRenderer::from_strings("Hello {{name}}", "{{missing}}", "", false).unwrap();
        let err = renderer.render(&record(&[("name", "Jack")])).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Render {
                template: TEXT_BODY_TEMPLATE,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_syntax_names_failing_template() {
        let result = MessageRenderer::from_strings("ok", "ok", "<p>{{name</p>", false);
        assert!(matches!(
            result,
            Err(RenderError::Compile {
                template: HTML_BODY_TEMPLATE,
                ..
            })
        ));
    }

    #[test]
    fn test_minification_collapses_whitespace_but_keeps_content() {
        let html = "<html>\n  <body>\n    <p>Hello    {{name}},</p>\n\n    <p>Your   order   shipped.</p>\n  </body>\n</html>\n";
        let data = record(&[("name", "Jack")]);

        let plain = MessageRenderer::from_strings("", "", html, false)
            .unwrap()
            .render(&data)
            .unwrap();
        let minified = MessageRenderer::from_strings("", "", html, true)
            .unwrap()
            .render(&data)
            .unwrap();

        let has_whitespace_run = |s: &str| {
            s.chars()
                .zip(s.chars().skip(1))
                .any(|(a, b)| a.is_whitespace() && b.is_whitespace())
        };
        assert!(has_whitespace_run(&plain.html_body));
        assert!(!has_whitespace_run(&minified.html_body));
        assert!(plain.html_body.contains("Jack"));
        assert!(minified.html_body.contains("Hello Jack,"));
        assert!(minified.html_body.contains("Your order shipped."));
    }

    #[test]
    fn test_compile_from_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SUBJECT_FILE), "Hello {{name}}").unwrap();
        std::fs::write(dir.path().join(TEXT_BODY_FILE), "Hi {{name}}").unwrap();
        std::fs::write(dir.path().join(HTML_BODY_FILE), "<p>{{name}}</p>").unwrap();

        let renderer = MessageRenderer::compile(&TemplateFiles::in_dir(dir.path()), false).unwrap();
        assert!(!renderer.minifies_html());

        let message = renderer.render(&record(&[("name", "Jill")])).unwrap();
        assert_eq!(message.subject, "Hello Jill");
        assert_eq!(message.text_body, "Hi Jill");
        assert_eq!(message.html_body, "<p>Jill</p>");
    }

    #[test]
    fn test_missing_template_file_names_failing_template() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SUBJECT_FILE), "Hello").unwrap();

        let result = MessageRenderer::compile(&TemplateFiles::in_dir(dir.path()), false);
        assert!(matches!(
            result,
            Err(RenderError::Read {
                template: TEXT_BODY_TEMPLATE,
                ..
            })
        ));
    }

    #[test]
    fn test_leading_dot_names_render_like_plain_names() {
        let renderer = MessageRenderer::from_strings(
            "Hello {{.name}}",
            "Hi {{ .name }}, see you in {{.date}}.",
            "<p>{{.name}}</p>",
            false,
        )
        .unwrap();

        let message = renderer
            .render(&record(&[("name", "Jack"), ("date", "January 2006")]))
            .unwrap();

        assert_eq!(message.subject, "Hello Jack");
        assert_eq!(message.text_body, "Hi Jack, see you in January 2006.");
        assert_eq!(message.html_body, "<p>Jack</p>");
    }

    #[test]
    fn test_leading_dot_names_in_template_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SUBJECT_FILE), "Hello {{.name}}").unwrap();
        std::fs::write(dir.path().join(TEXT_BODY_FILE), "Hi {{.name}}").unwrap();
        std::fs::write(dir.path().join(HTML_BODY_FILE), "<p>{{.name}}</p>").unwrap();

        let renderer = MessageRenderer::compile(&TemplateFiles::in_dir(dir.path()), false).unwrap();
        let message = renderer.render(&record(&[("name", "Jill")])).unwrap();
        assert_eq!(message.subject, "Hello Jill");
        assert_eq!(message.html_body, "<p>Jill</p>");
    }

    #[test]
    fn test_strip_leading_dots_keeps_other_paths() {
        assert_eq!(strip_leading_dots("{{.name}}"), "{{name}}");
        assert_eq!(strip_leading_dots("{{ .name }}"), "{{ name }}");
        assert_eq!(strip_leading_dots("{{._id}}"), "{{_id}}");
        assert_eq!(strip_leading_dots("{{.}}"), "{{.}}");
        assert_eq!(strip_leading_dots("{{..}}"), "{{..}}");
        assert_eq!(strip_leading_dots("{{./name}}"), "{{./name}}");
        assert_eq!(strip_leading_dots("{{[First Name]}}"), "{{[First Name]}}");
        assert_eq!(strip_leading_dots("a.b {{name}}."), "a.b {{name}}.");
    }
}
