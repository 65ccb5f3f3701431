//! Talk to Slurm through its command line tools and interpret what it says

/// Submit job scripts with sbatch and extract the job id
pub mod submit;

/// Query sacct and scontrol, merging both into one state record
pub mod status;

/// The closed set of Slurm job states and their classification
pub mod state;

/// Slurm `[D-]HH:MM:SS` durations
pub mod duration;

/// How long to wait between status polls
pub mod poll;

/// Names of the Slurm programs to invoke
///
/// Normally these are the bare program names found on `PATH`, but they can be pointed elsewhere
/// (wrappers, test doubles).
#[derive(Debug, Clone)]
pub struct Programs {
    pub sbatch: String,
    pub sacct: String,
    pub scontrol: String,
}

impl Default for Programs {
    fn default() -> Self {
        Programs {
            sbatch: "sbatch".to_string(),
            sacct: "sacct".to_string(),
            scontrol: "scontrol".to_string(),
        }
    }
}
