use anyhow::{anyhow, Context};
use log::trace;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Convert a Slurm duration (`D-HH:MM:SS` or `HH:MM:SS`) to a number of seconds
///
/// Every component must be plain decimal digits, minutes and seconds below 60. Hours are not
/// bounded, Slurm only rolls them over into days when it prints a day count.
pub fn time_to_seconds(value: &str) -> anyhow::Result<u64> {
    let value = value.trim();
    let (days, hms) = match value.split_once('-') {
        Some((days, rest)) => (parse_component(days, value)?, rest),
        None => (0, value),
    };

    let parts = hms
        .split(':')
        .map(|part| parse_component(part, value))
        .collect::<anyhow::Result<Vec<u64>>>()?;
    let [hours, minutes, seconds] = parts[..] else {
        return Err(anyhow!("duration {value} is not in [D-]HH:MM:SS format"));
    };
    if minutes >= 60 || seconds >= 60 {
        return Err(anyhow!("minutes and seconds of {value} must be below 60"));
    }

    let total = days
        .checked_mul(DAY)
        .and_then(|total| total.checked_add(hours.checked_mul(HOUR)?))
        .and_then(|total| total.checked_add(minutes * MINUTE + seconds))
        .ok_or_else(|| anyhow!("duration {value} is too long"))?;
    trace!("Parsed {value} -> {total}s");
    Ok(total)
}

fn parse_component(part: &str, value: &str) -> anyhow::Result<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(anyhow!("invalid duration {value}"));
    }
    part.parse().with_context(|| format!("invalid duration {value}"))
}

/// Format seconds as a Slurm duration, e.g. `01:05:02` or `2-00:00:10`
pub fn format_duration(total: u64) -> String {
    let days = total / DAY;
    let hours = (total % DAY) / HOUR;
    let minutes = (total % HOUR) / MINUTE;
    let seconds = total % MINUTE;
    match days {
        0 => format!("{hours:02}:{minutes:02}:{seconds:02}"),
        _ => format!("{days}-{hours:02}:{minutes:02}:{seconds:02}"),
    }
}
