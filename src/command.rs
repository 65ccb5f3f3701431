//! Run external programs and capture their output
//!
//! Every interaction with the scheduler goes through a [CommandRunner]. The runner never retries,
//! retry policy belongs to its callers.

use std::process::Command;

use log::{debug, error};

use crate::error::{LongrunError, Result};

pub trait CommandRunner {
    /// Run `program` with `args` (and extra environment variables) to completion
    ///
    /// Returns captured standard output on a zero exit status. A nonzero exit status becomes
    /// [LongrunError::ExternalCommand] carrying both captured streams.
    fn run(&self, program: &str, args: &[String], envs: &[(&str, &str)]) -> Result<String>;
}

/// Runs programs as blocking child processes of the supervisor
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], envs: &[(&str, &str)]) -> Result<String> {
        debug!("Running command `{} {}`", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .envs(envs.iter().copied())
            .output()
            .map_err(|source| {
                error!("Can't start `{program}`: {source}");
                LongrunError::Launch { program: program.to_string(), source }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            error!("Command `{program}` failed ({})\nstdout: {}\nstderr: {}",
                output.status, stdout.trim(), stderr.trim());
            return Err(LongrunError::ExternalCommand {
                program: program.to_string(),
                code: output.status.code(),
                stdout,
                stderr,
            });
        }

        debug!("Command output: {}", stdout.trim());
        Ok(stdout)
    }
}
