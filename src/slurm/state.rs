use std::fmt;

use crate::slurm::status::StateRecord;

/// Slurm job states, as reported by `sacct` (State) and `scontrol show job` (JobState)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Suspended,
    Completing,
    Configuring,
    Resizing,
    Requeued,
    Completed,
    Failed,
    Timeout,
    Preempted,
    Stopped,
    Cancelled,
    BootFail,
    NodeFail,
    Deadline,
    OutOfMemory,
    SpecialExit,
    Revoked,
    /// Missing or unrecognised status text
    Unknown,
}

impl JobState {
    pub fn parse(raw: &str) -> JobState {
        match raw {
            "PENDING" => JobState::Pending,
            "RUNNING" => JobState::Running,
            "SUSPENDED" => JobState::Suspended,
            "COMPLETING" => JobState::Completing,
            "CONFIGURING" => JobState::Configuring,
            "RESIZING" => JobState::Resizing,
            "REQUEUED" => JobState::Requeued,
            "COMPLETED" => JobState::Completed,
            "FAILED" => JobState::Failed,
            "TIMEOUT" => JobState::Timeout,
            "PREEMPTED" => JobState::Preempted,
            "STOPPED" => JobState::Stopped,
            "CANCELLED" => JobState::Cancelled,
            "BOOT_FAIL" => JobState::BootFail,
            "NODE_FAIL" => JobState::NodeFail,
            "DEADLINE" => JobState::Deadline,
            "OUT_OF_MEMORY" => JobState::OutOfMemory,
            "SPECIAL_EXIT" => JobState::SpecialExit,
            "REVOKED" => JobState::Revoked,
            _ => JobState::Unknown,
        }
    }

    /// No further change will happen to a job in this state
    ///
    /// Unknown is final so that an unreadable status can't keep the supervisor polling forever.
    pub fn is_final(&self) -> bool {
        !matches!(
            self,
            JobState::Pending
                | JobState::Running
                | JobState::Suspended
                | JobState::Completing
                | JobState::Configuring
                | JobState::Resizing
                | JobState::Requeued
        )
    }

    /// The attempt ran to its end without failing
    ///
    /// Timeout counts: whether a timeout is resubmitted or accepted is up to the supervisor.
    pub fn is_success(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Timeout)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Suspended => "SUSPENDED",
            JobState::Completing => "COMPLETING",
            JobState::Configuring => "CONFIGURING",
            JobState::Resizing => "RESIZING",
            JobState::Requeued => "REQUEUED",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
            JobState::Timeout => "TIMEOUT",
            JobState::Preempted => "PREEMPTED",
            JobState::Stopped => "STOPPED",
            JobState::Cancelled => "CANCELLED",
            JobState::BootFail => "BOOT_FAIL",
            JobState::NodeFail => "NODE_FAIL",
            JobState::Deadline => "DEADLINE",
            JobState::OutOfMemory => "OUT_OF_MEMORY",
            JobState::SpecialExit => "SPECIAL_EXIT",
            JobState::Revoked => "REVOKED",
            JobState::Unknown => "UNKNOWN",
        };
        write!(f, "{text}")
    }
}

/// Classify a merged state record
///
/// scontrol's `JobState` wins over sacct's `State`. sacct may annotate the state
/// (`CANCELLED by 1234`), so only its first token counts.
pub fn classify(record: &StateRecord) -> JobState {
    let raw = record
        .get("JobState")
        .map(|state| state.trim())
        .or_else(|| record.get("State").and_then(|state| state.split_whitespace().next()));

    match raw {
        Some(raw) => JobState::parse(raw),
        None => JobState::Unknown,
    }
}
