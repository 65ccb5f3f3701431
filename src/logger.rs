use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Context;
use env_logger::{Builder, Target, WriteStyle};

use crate::cli::Verbosity;

/// Configure env_logger for the chosen verbosity, RUST_LOG still has the last word
pub fn setup_logger(verbosity: Verbosity, log_file: Option<&Path>) -> anyhow::Result<()> {
    let mut builder = Builder::new();
    builder.filter_level(verbosity.level_filter()).parse_default_env();

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Can't open log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file))).write_style(WriteStyle::Never);
    }

    builder.try_init().context("Logger already initialised")
}
