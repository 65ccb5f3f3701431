use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::LongrunError;
use crate::slurm::state::JobState;

/// One sbatch submission belonging to a chain
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 1-based
    pub number: u32,
    pub job_id: String,
    pub submitted_at: DateTime<Utc>,
    /// Final state, once observed
    pub state: Option<JobState>,
}

/// Consecutive submissions of the same long running job
///
/// The id of the first submission identifies the whole chain.
#[derive(Debug)]
pub struct JobChain {
    origin: String,
    attempts: Vec<Attempt>,
    budget: u32,
}

impl JobChain {
    pub fn start(job_id: String, budget: u32) -> JobChain {
        let mut chain = JobChain { origin: job_id.clone(), attempts: Vec::new(), budget };
        chain.push_attempt(job_id);
        chain
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn can_resubmit(&self) -> bool {
        self.attempt_count() < self.budget
    }

    pub fn current(&self) -> &Attempt {
        // a chain always starts with one attempt
        &self.attempts[self.attempts.len() - 1]
    }

    pub fn push_attempt(&mut self, job_id: String) {
        let number = self.attempt_count() + 1;
        self.attempts.push(Attempt { number, job_id, submitted_at: Utc::now(), state: None });
    }

    pub fn record_state(&mut self, state: JobState) {
        if let Some(attempt) = self.attempts.last_mut() {
            attempt.state = Some(state);
        }
    }
}

/// How a chain was closed
#[derive(Debug)]
pub enum Outcome {
    /// The last attempt reached this final state and was not resubmitted
    Finished(JobState),
    /// The very first sbatch call failed, there is no chain
    SubmissionFailed(LongrunError),
    /// A resubmission after a timeout failed
    ResubmissionFailed(LongrunError),
    /// Strict mode only
    StatusUnavailable(LongrunError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Finished(state) if state.is_success())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Finished(state) => write!(f, "{state}"),
            Outcome::SubmissionFailed(err) => write!(f, "submission failed: {err}"),
            Outcome::ResubmissionFailed(err) => write!(f, "resubmission failed: {err}"),
            Outcome::StatusUnavailable(err) => write!(f, "{err}"),
        }
    }
}

/// Everything known about a closed chain
#[derive(Debug)]
pub struct ChainReport {
    pub chain: Option<JobChain>,
    pub outcome: Outcome,
}
