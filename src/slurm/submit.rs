use std::time::Duration;

use log::{debug, info, warn};

use crate::command::CommandRunner;
use crate::error::{LongrunError, Result};
use crate::slurm::Programs;

pub struct Submitter<'a, R: CommandRunner> {
    pub runner: &'a R,
    pub programs: &'a Programs,
    /// Waited once after every successful submission, Slurm registers new jobs asynchronously
    pub settle_delay: Duration,
    /// Blocks for the settle delay
    pub sleep: fn(Duration),
}

impl<'a, R: CommandRunner> Submitter<'a, R> {
    /// Run sbatch with `args` and return the id of the submitted job
    pub fn submit(&self, args: &[String], envs: &[(&str, &str)]) -> Result<String> {
        info!("Running sbatch {}", args.join(" "));
        let output = self.runner.run(&self.programs.sbatch, args, envs)?;

        let job_id = parse_job_id(&output).ok_or_else(|| {
            warn!("Could not parse sbatch output: {}", output.trim());
            LongrunError::SubmissionIdentifierNotFound { output: output.clone() }
        })?;
        info!("Slurm job id: {job_id}");

        if !self.settle_delay.is_zero() {
            debug!("Waiting {:?} for Slurm to register job {job_id}", self.settle_delay);
            (self.sleep)(self.settle_delay);
        }
        Ok(job_id)
    }
}

/// Find `Submitted batch job <id>` (any case) in sbatch output
pub fn parse_job_id(output: &str) -> Option<String> {
    const MARKER: &str = "submitted batch job";

    output.lines().find_map(|line| {
        let start = line.to_ascii_lowercase().find(MARKER)?;
        line[start + MARKER.len()..]
            .split_whitespace()
            .next()
            .map(|id| id.to_string())
    })
}
