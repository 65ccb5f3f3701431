//! Keep a job running across Slurm time limits
//!
//! The supervisor submits a job, polls it until it reaches a final state and resubmits it as a
//! continuation whenever it was cut off by its time limit, until the attempt budget runs out.
//! Any other final state closes the chain.

/// Attempts, chain identity and outcomes
pub mod chain;

/// Render a closing summary of a chain
pub mod report;

use std::iter;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::command::CommandRunner;
use crate::error::Result;
use crate::slurm::duration::format_duration;
use crate::slurm::poll::next_interval;
use crate::slurm::state::{classify, JobState};
use crate::slurm::status::StatusCollector;
use crate::slurm::submit::Submitter;
use crate::supervisor::chain::{ChainReport, JobChain, Outcome};

/// Set on resubmissions so the job (and anything it runs) can tell which chain it belongs to
pub const ORIGIN_ENV: &str = "SLURM_LONGRUN_INITIAL_JOB_ID";

/// Prepended to resubmissions so output files are appended to instead of overwritten
pub const APPEND_FLAG: &str = "--open-mode=append";

pub const DEFAULT_MAX_RESTARTS: u32 = 10;

pub struct Supervisor<'a, R: CommandRunner> {
    pub submitter: Submitter<'a, R>,
    pub collector: StatusCollector<'a, R>,
    /// Maximum number of submissions in one chain, including the first
    pub budget: u32,
    /// Blocks between polls
    pub sleep: fn(Duration),
}

impl<'a, R: CommandRunner> Supervisor<'a, R> {
    /// Drive one chain from first submission until it is closed
    pub fn run(&self, sbatch_args: &[String]) -> ChainReport {
        let job_id = match self.submitter.submit(sbatch_args, &[]) {
            Ok(job_id) => job_id,
            Err(err) => {
                error!("Initial submission failed: {err}");
                return ChainReport { chain: None, outcome: Outcome::SubmissionFailed(err) };
            }
        };

        let mut chain = JobChain::start(job_id, self.budget);
        let resubmit_args: Vec<String> = iter::once(APPEND_FLAG.to_string())
            .chain(sbatch_args.iter().cloned())
            .collect();

        let outcome = loop {
            let job_id = chain.current().job_id.clone();
            let state = match self.wait_until_final(&job_id) {
                Ok(state) => state,
                Err(err) => break Outcome::StatusUnavailable(err),
            };
            chain.record_state(state);

            if state != JobState::Timeout {
                info!("Job {job_id} has reached its final state {state}");
                break Outcome::Finished(state);
            }
            if !chain.can_resubmit() {
                warn!("Job {job_id} timed out, but all {} attempts are used up", chain.budget());
                break Outcome::Finished(state);
            }

            info!("Job {job_id} has timed out, resubmitting (attempt {} of {})",
                chain.attempt_count() + 1, chain.budget());
            let envs = [(ORIGIN_ENV, chain.origin())];
            match self.submitter.submit(&resubmit_args, &envs) {
                Ok(new_id) => chain.push_attempt(new_id),
                Err(err) => {
                    error!("Resubmission of chain {} failed: {err}", chain.origin());
                    break Outcome::ResubmissionFailed(err);
                }
            }
        };

        ChainReport { chain: Some(chain), outcome }
    }

    /// Poll a job until its classified state is final
    fn wait_until_final(&self, job_id: &str) -> Result<JobState> {
        let mut record = self.collector.fetch(job_id)?;
        info!("Job {job_id} information: {}", serde_json::to_string(&record).unwrap_or_default());

        loop {
            let state = classify(&record);
            if state.is_final() {
                return Ok(state);
            }

            let interval = next_interval(
                record.get("TimeLimit").map(String::as_str),
                record.get("RunTime").map(String::as_str),
            );
            debug!("Job {job_id} is {state}, sleeping for {}", format_duration(interval.as_secs()));
            (self.sleep)(interval);

            record = self.collector.fetch(job_id)?;
            debug!("Job {job_id} information: {}", serde_json::to_string(&record).unwrap_or_default());
        }
    }
}
