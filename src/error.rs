use thiserror::Error;

pub type Result<T> = std::result::Result<T, LongrunError>;

#[derive(Debug, Error)]
pub enum LongrunError {
    /// The program ran but exited with a nonzero status (or was killed by a signal, `code` is None)
    #[error("`{program}` exited with {}:\n{}", exit_code_text(.code), captured_text(.stdout, .stderr))]
    ExternalCommand {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("`{program}` could not be started: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("missing job id in sbatch output\n{output}")]
    SubmissionIdentifierNotFound { output: String },
    #[error("no status source answered for job {job_id}")]
    StatusUnavailable { job_id: String },
    #[error("detached mode is not supported on this platform")]
    #[cfg_attr(unix, allow(dead_code))]
    UnsupportedPlatform,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// sbatch and friends report errors on stderr, fall back to stdout when that is empty
fn captured_text(stdout: &str, stderr: &str) -> String {
    match stderr.trim() {
        "" => stdout.trim().to_string(),
        stderr => stderr.to_string(),
    }
}
