//! Working directory scaffolding command

use anyhow::{Context, Result};
use console::style;
use iris::config::{IrisConfig, CONFIG_FILE_NAME};
use std::fs;
use std::path::PathBuf;

use crate::templates::{FileStatus, WorkspaceTemplate};

/// Create the working files for a dispatch run
pub struct InitCommand {
    dir: PathBuf,
}

impl InitCommand {
    /// Create a new command instance for `dir`
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Execute the command
    ///
    /// An existing `iris.toml` is kept and decides the names of the tables
    /// and the recipient column; otherwise the defaults are written first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a file cannot be created, or an
    /// existing configuration cannot be loaded.
    pub fn execute(&self) -> Result<Vec<FileStatus>> {
        if !self.dir.exists() {
            println!(
                "{} {}",
                style("Creating directory").green().bold(),
                style(self.dir.display()).cyan()
            );
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;
        }

        let config_path = self.dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            IrisConfig::write_default(&config_path).with_context(|| {
                format!("Failed to write default config: {}", config_path.display())
            })?;
            print_status(&FileStatus::Created(config_path));
        }

        let config = IrisConfig::load_from_dir(&self.dir)
            .with_context(|| format!("Failed to load config from {}", self.dir.display()))?;

        let files = WorkspaceTemplate::new(&config.message).generate(&self.dir)?;
        for file in &files {
            print_status(file);
        }

        tracing::debug!(dir = %self.dir.display(), files = files.len(), "Initialised working directory");
        Ok(files)
    }
}

fn print_status(status: &FileStatus) {
    let label = match status {
        FileStatus::Created(_) => style("Created").green().bold(),
        FileStatus::Skipped(_) => style("Skipped").yellow().bold(),
    };
    println!("{label} {}", style(status.path().display()).cyan());
}
