use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::slurm::Programs;
use crate::supervisor::DEFAULT_MAX_RESTARTS;

/// Submit a Slurm batch job and resubmit it whenever it hits its time limit
///
/// Options not listed here are passed to sbatch unchanged, e.g.
/// `slurm-longrun --max-restarts 5 -- --time=04:00:00 train.sbatch`
#[derive(Parser, Debug)]
#[command(name = "slurm-longrun", version, about)]
pub struct Args {
    /// How much to log
    #[arg(long, value_enum, default_value_t = Verbosity::Default)]
    pub verbosity: Verbosity,

    /// Return immediately and keep supervising in a background process
    #[arg(long)]
    pub detached: bool,

    /// Maximum number of submissions of the job, counting the first one
    #[arg(long, default_value_t = DEFAULT_MAX_RESTARTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_restarts: u32,

    /// Stop supervising when neither sacct nor scontrol can report on the job
    #[arg(long)]
    pub strict: bool,

    /// Append logs to this file instead of stderr (a detached supervisor has no stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, env = "LONGRUN_SBATCH", default_value = "sbatch")]
    pub sbatch: String,

    #[arg(long, env = "LONGRUN_SACCT", default_value = "sacct")]
    pub sacct: String,

    #[arg(long, env = "LONGRUN_SCONTROL", default_value = "scontrol")]
    pub scontrol: String,

    /// Time Slurm gets to register a new job before it is queried
    #[arg(long, env = "LONGRUN_SETTLE_DELAY", default_value = "5s", value_parser = humantime::parse_duration)]
    pub settle_delay: Duration,

    /// Arguments for sbatch, including the job script
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true, value_name = "SBATCH_ARGS")]
    pub sbatch_args: Vec<String>,
}

impl Args {
    pub fn programs(&self) -> Programs {
        Programs {
            sbatch: self.sbatch.clone(),
            sacct: self.sacct.clone(),
            scontrol: self.scontrol.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Verbosity {
    Default,
    Verbose,
    Silent,
}

impl Verbosity {
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            Verbosity::Default => LevelFilter::Info,
            Verbosity::Verbose => LevelFilter::Debug,
            Verbosity::Silent => LevelFilter::Warn,
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Verbosity::Default => write!(f, "default"),
            Verbosity::Verbose => write!(f, "verbose"),
            Verbosity::Silent => write!(f, "silent"),
        }
    }
}
