//! HTML body minification

use minify_html::Cfg;

/// Strips insignificant whitespace and formatting from rendered HTML
///
/// Closing tags and the `<html>`/`<head>` opening tags are kept so mail
/// clients that are strict about document structure still accept the output.
pub struct HtmlMinifier {
    cfg: Cfg,
}

impl HtmlMinifier {
    /// Create a minifier with mail-safe settings
    #[must_use]
    pub fn new() -> Self {
        let mut cfg = Cfg::new();
        cfg.keep_closing_tags = true;
        cfg.keep_html_and_head_opening_tags = true;
        Self { cfg }
    }

    /// Minify `html`
    ///
    /// # Errors
    ///
    /// Returns an error if the minified output is not valid UTF-8.
    pub fn minify(&self, html: &str) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(minify_html::minify(html.as_bytes(), &self.cfg))
    }
}

impl Default for HtmlMinifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_structure_tags() {
        let minified = HtmlMinifier::new()
            .minify("<html>\n  <head><title>T</title></head>\n  <body><p>x</p></body>\n</html>")
            .unwrap();
        assert!(minified.starts_with("<html>"));
        assert!(minified.contains("<head>"));
        assert!(minified.contains("</p>"));
    }
}
