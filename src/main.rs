use std::process::ExitCode;
use std::thread;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};

use crate::cli::Args;
use crate::command::SystemRunner;
use crate::detach::{Detach, PlatformDetacher};
use crate::slurm::status::StatusCollector;
use crate::slurm::submit::Submitter;
use crate::supervisor::chain::Outcome;
use crate::supervisor::report::render_summary;
use crate::supervisor::Supervisor;

/// Command line flags and verbosity levels
mod cli;
/// Run external programs
mod command;
/// Detach the supervisor from the terminal
mod detach;
mod error;
mod logger;
/// Slurm command line tools
mod slurm;
/// Submit, poll and resubmit a job chain
mod supervisor;

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = logger::setup_logger(args.verbosity, args.log_file.as_deref()) {
        eprintln!("{err:?}");
        return ExitCode::FAILURE;
    }
    info!("terve! starting up :)");

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    if !args.detached {
        return Ok(ExitCode::from(supervise(args)));
    }

    if args.log_file.is_none() {
        warn!("Running detached without --log-file, supervisor logs will be discarded");
    }
    let pid = PlatformDetacher
        .run_detached(|| i32::from(supervise(args)))
        .context("Can't start detached supervisor")?;
    info!("Supervisor is running detached with pid {pid}");
    println!("{pid}");
    Ok(ExitCode::SUCCESS)
}

/// Run one job chain to completion and return the process exit status
fn supervise(args: &Args) -> u8 {
    let programs = args.programs();
    let runner = SystemRunner;
    let supervisor = Supervisor {
        submitter: Submitter {
            runner: &runner,
            programs: &programs,
            settle_delay: args.settle_delay,
            sleep: thread::sleep,
        },
        collector: StatusCollector { runner: &runner, programs: &programs, strict: args.strict },
        budget: args.max_restarts,
        sleep: thread::sleep,
    };

    let report = supervisor.run(&args.sbatch_args);
    match render_summary(&report) {
        Ok(summary) if report.outcome.is_success() => info!("{summary}"),
        Ok(summary) => warn!("{summary}"),
        Err(err) => warn!("Can't render chain summary ({err}), outcome: {}", report.outcome),
    }
    exit_status(&report.outcome)
}

/// 0 on success, 2 when nothing could be submitted, 1 for every other failure
fn exit_status(outcome: &Outcome) -> u8 {
    match outcome {
        _ if outcome.is_success() => 0,
        Outcome::SubmissionFailed(_) => 2,
        _ => 1,
    }
}
