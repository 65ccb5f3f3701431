use std::collections::BTreeMap;

use log::{debug, warn};

use crate::command::CommandRunner;
use crate::error::{LongrunError, Result};
use crate::slurm::Programs;

/// Merged key/value view of a job, rebuilt from scratch on every poll
pub type StateRecord = BTreeMap<String, String>;

/// sacct columns, in the order they're requested
pub const SACCT_HEADERS: [&str; 7] = ["JobID", "JobName", "State", "ExitCode", "Reason", "Comment", "Elapsed"];

/// Queries sacct (accounting) and scontrol (live) for a job
pub struct StatusCollector<'a, R: CommandRunner> {
    pub runner: &'a R,
    pub programs: &'a Programs,
    /// Fail instead of returning an empty record when neither source answers
    pub strict: bool,
}

impl<'a, R: CommandRunner> StatusCollector<'a, R> {
    /// Fetch the current state record of a job
    ///
    /// Fields from scontrol overwrite fields from sacct, live data is fresher. A source that
    /// fails contributes nothing.
    pub fn fetch(&self, job_id: &str) -> Result<StateRecord> {
        let accounting = self.accounting(job_id);
        let live = self.live(job_id);

        if self.strict && accounting.is_err() && live.is_err() {
            warn!("Neither sacct nor scontrol answered for job {job_id}");
            return Err(LongrunError::StatusUnavailable { job_id: job_id.to_string() });
        }

        let mut record = StateRecord::new();
        match accounting {
            Ok(Some(row)) => record.extend(row),
            Ok(None) => debug!("sacct has no row for job {job_id}"),
            Err(err) => debug!("sacct unavailable for job {job_id}: {err}"),
        }
        match live {
            Ok(fields) => record.extend(fields),
            Err(err) => debug!("scontrol unavailable for job {job_id}: {err}"),
        }
        Ok(record)
    }

    /// The sacct row of the job itself (not one of its steps)
    fn accounting(&self, job_id: &str) -> Result<Option<StateRecord>> {
        let args = vec![
            "-j".to_string(),
            job_id.to_string(),
            format!("--format={}", SACCT_HEADERS.join(",")),
            "--noheader".to_string(),
            "-P".to_string(),
        ];
        let output = self.runner.run(&self.programs.sacct, &args, &[])?;
        Ok(parse_sacct_rows(&output).into_iter().find(|row| row.get("JobID").map(String::as_str) == Some(job_id)))
    }

    fn live(&self, job_id: &str) -> Result<StateRecord> {
        let args = vec!["show".to_string(), "job".to_string(), job_id.to_string()];
        let output = self.runner.run(&self.programs.scontrol, &args, &[])?;
        Ok(parse_scontrol_items(&output))
    }
}

/// Parse `sacct -P --noheader` output, one record per line
///
/// Short rows are padded with empty values and long rows truncated to [SACCT_HEADERS].
pub fn parse_sacct_rows(output: &str) -> Vec<StateRecord> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut values = line.split('|');
            SACCT_HEADERS
                .iter()
                .map(|header| (header.to_string(), values.next().unwrap_or_default().to_string()))
                .collect()
        })
        .collect()
}

/// Parse the `key=value` tokens of `scontrol show job`
///
/// Only the first `=` splits a token (`TRES=cpu=4,mem=7600M`). Later keys overwrite earlier ones.
pub fn parse_scontrol_items(output: &str) -> StateRecord {
    output
        .split_whitespace()
        .filter_map(|token| token.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod test {
    use super::{parse_sacct_rows, parse_scontrol_items, StatusCollector};
    use crate::command::fake::ScriptedRunner;
    use crate::error::LongrunError;
    use crate::slurm::Programs;

    const SCONTROL: &str = "JobId=4641914 JobName=bash
   UserId=sboehm00(33646) GroupId=interactive(25200) MCS_label=N/A
   JobState=RUNNING Reason=None Dependency=(null)
   Requeue=0 Restarts=0 BatchFlag=0 Reboot=0 ExitCode=0:0
   RunTime=00:01:34 TimeLimit=00:15:00 TimeMin=N/A
   TRES=cpu=4,mem=7600M,node=1,billing=4
   Power=";

    #[test]
    fn scontrol_items() {
        let items = parse_scontrol_items(SCONTROL);
        assert_eq!(items["JobState"], "RUNNING");
        assert_eq!(items["RunTime"], "00:01:34");
        assert_eq!(items["TRES"], "cpu=4,mem=7600M,node=1,billing=4");
        assert_eq!(items["Power"], "");
        assert!(!items.contains_key("sboehm00(33646)"));
    }

    #[test]
    fn scontrol_later_keys_win() {
        let items = parse_scontrol_items("Reason=None\nReason=TimeLimit");
        assert_eq!(items["Reason"], "TimeLimit");
    }

    #[test]
    fn sacct_rows_are_padded_and_truncated() {
        let rows = parse_sacct_rows("42|train|RUNNING\n42.batch|batch|RUNNING|0:0|||00:01:00|extra|more\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["State"], "RUNNING");
        assert_eq!(rows[0]["Elapsed"], "");
        assert_eq!(rows[0].len(), 7);
        assert_eq!(rows[1]["Elapsed"], "00:01:00");
        assert_eq!(rows[1].len(), 7);
    }

    #[test]
    fn sacct_empty_output() {
        assert!(parse_sacct_rows("").is_empty());
        assert!(parse_sacct_rows("\n").is_empty());
    }

    #[test]
    fn live_fields_overwrite_accounting() {
        let runner = ScriptedRunner::default()
            .reply("sacct", "42|train|TIMEOUT|0:0|||00:10:00\n42.batch|batch|CANCELLED|0:15|||00:10:01\n")
            .reply("scontrol", "JobId=42 State=RUNNING JobState=RUNNING");
        let programs = Programs::default();
        let collector = StatusCollector { runner: &runner, programs: &programs, strict: false };

        let record = collector.fetch("42").unwrap();
        assert_eq!(record["State"], "RUNNING");
        assert_eq!(record["JobName"], "train");
        assert_eq!(record["Elapsed"], "00:10:00");

        let sacct = &runner.calls_to("sacct")[0];
        assert_eq!(sacct.args, ["-j", "42", "--format=JobID,JobName,State,ExitCode,Reason,Comment,Elapsed", "--noheader", "-P"]);
        assert_eq!(runner.calls_to("scontrol")[0].args, ["show", "job", "42"]);
    }

    #[test]
    fn step_rows_are_ignored() {
        let runner = ScriptedRunner::default()
            .reply("sacct", "42.batch|batch|COMPLETED|0:0|||00:00:05\n")
            .fail("scontrol", "slurm_load_jobs error: Invalid job id specified");
        let programs = Programs::default();
        let collector = StatusCollector { runner: &runner, programs: &programs, strict: false };

        assert!(collector.fetch("42").unwrap().is_empty());
    }

    #[test]
    fn failing_sources_give_empty_record() {
        let runner = ScriptedRunner::default()
            .fail("sacct", "sacct: error: Problem talking to the database")
            .fail("scontrol", "slurm_load_jobs error: Invalid job id specified");
        let programs = Programs::default();
        let collector = StatusCollector { runner: &runner, programs: &programs, strict: false };

        assert!(collector.fetch("42").unwrap().is_empty());
    }

    #[test]
    fn strict_mode_fails_without_sources() {
        let runner = ScriptedRunner::default()
            .fail("sacct", "sacct: error: Problem talking to the database")
            .fail("scontrol", "slurm_load_jobs error: Invalid job id specified");
        let programs = Programs::default();
        let collector = StatusCollector { runner: &runner, programs: &programs, strict: true };

        assert!(matches!(collector.fetch("42"), Err(LongrunError::StatusUnavailable { job_id }) if job_id == "42"));
    }

    #[test]
    fn strict_mode_accepts_one_source() {
        let runner = ScriptedRunner::default()
            .reply("sacct", "")
            .fail("scontrol", "slurm_load_jobs error: Invalid job id specified");
        let programs = Programs::default();
        let collector = StatusCollector { runner: &runner, programs: &programs, strict: true };

        assert!(collector.fetch("42").unwrap().is_empty());
    }
}
