use std::time::Duration;

use log::debug;

use crate::slurm::duration::time_to_seconds;

/// Never poll the scheduler more often than this
pub const MIN_INTERVAL: Duration = Duration::from_secs(5);
/// Never go longer than this without looking (catches manual scancel and friends)
pub const MAX_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Wait until the job is expected to hit its time limit, bounded to [MIN_INTERVAL, MAX_INTERVAL]
///
/// Missing or unparsable durations count as zero, which errs on the side of polling often.
pub fn next_interval(time_limit: Option<&str>, run_time: Option<&str>) -> Duration {
    let limit = seconds_or_zero(time_limit);
    let elapsed = seconds_or_zero(run_time);
    let remaining = limit - elapsed;
    debug!("Remaining time: {remaining} seconds");

    let remaining = Duration::from_secs(remaining.max(0) as u64);
    remaining.clamp(MIN_INTERVAL, MAX_INTERVAL)
}

fn seconds_or_zero(value: Option<&str>) -> i64 {
    value
        .and_then(|value| time_to_seconds(value).ok())
        .and_then(|seconds| i64::try_from(seconds).ok())
        .unwrap_or(0)
}
