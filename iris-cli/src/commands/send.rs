//! Email dispatch command

use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use iris::config::IrisConfig;
use iris::data::RecipientDataSource;
use iris::dispatch::{DispatchLoop, DispatchReport};
use iris::email::select_service;
use iris::template::{MessageRenderer, TemplateFiles};
use std::path::PathBuf;

/// Send one email per recipient using the working files in a directory
pub struct SendCommand {
    dir: PathBuf,
    dry_run: bool,
    assume_yes: bool,
}

impl SendCommand {
    /// Create a new command instance
    ///
    /// # Arguments
    ///
    /// * `dir` - Working directory holding `iris.toml`, templates and tables
    /// * `dry_run` - Print rendered emails instead of sending them
    /// * `assume_yes` - Skip the confirmation prompt
    #[must_use]
    pub const fn new(dir: PathBuf, dry_run: bool, assume_yes: bool) -> Self {
        Self {
            dir,
            dry_run,
            assume_yes,
        }
    }

    /// Execute the command
    ///
    /// Templates and tables are opened before asking for confirmation, so a
    /// broken working directory fails without prompting. Returns `None` if
    /// the operator declined.
    ///
    /// # Errors
    ///
    /// Returns the first configuration, data, template or delivery error.
    pub async fn execute(&self) -> Result<Option<DispatchReport>> {
        let config = IrisConfig::load_from_dir(&self.dir)
            .with_context(|| format!("Failed to load config from {}", self.dir.display()))?;
        let message = &config.message;

        let renderer =
            MessageRenderer::compile(&TemplateFiles::in_dir(&self.dir), message.minify_html)?;
        let source = RecipientDataSource::open(
            message.default_data_path(&self.dir).as_deref(),
            &message.recipient_data_path(&self.dir),
        )?;

        if !self.dry_run && !self.assume_yes && !confirm()? {
            println!("{}", style("Aborted, no emails were sent").yellow());
            return Ok(None);
        }

        let service = select_service(&config.service, self.dry_run)
            .await
            .context("Failed to initialise delivery service")?;

        let report = DispatchLoop::new(message)
            .run(source, &renderer, &service)
            .await?;

        self.print_summary(&report);
        Ok(Some(report))
    }

    fn print_summary(&self, report: &DispatchReport) {
        let verb = if self.dry_run { "Previewed" } else { "Sent" };
        println!(
            "{} {} in {:.1}s",
            style(verb).green().bold(),
            style(format!("{} emails", report.sent)).cyan().bold(),
            report.elapsed.as_secs_f64()
        );
    }
}

fn confirm() -> Result<bool> {
    Confirm::new()
        .with_prompt("Confirm sending emails?")
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}
