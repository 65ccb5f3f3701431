//! Drive the slurm-longrun binary against fake sbatch, sacct and scontrol scripts
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_slurm-longrun");

/// Hands out job ids 42, 43, ... and logs its arguments and chain origin
const SBATCH: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
n=$(cat "$dir/submissions" 2>/dev/null || echo 0)
n=$((n + 1))
echo "$n" > "$dir/submissions"
echo "$* origin=${SLURM_LONGRUN_INITIAL_JOB_ID:-none}" >> "$dir/sbatch.log"
echo "Submitted batch job $((41 + n))"
"#;

const SBATCH_FAILING: &str = r#"#!/bin/sh
echo "sbatch: error: Invalid partition name specified" >&2
exit 1
"#;

const SACCT_EMPTY: &str = "#!/bin/sh\nexit 0\n";

/// Job 42 times out, every later job completes
const SCONTROL_TIMEOUT_ONCE: &str = r#"#!/bin/sh
case "$3" in
  42) echo "JobId=42 JobState=TIMEOUT Reason=TimeLimit RunTime=00:00:02 TimeLimit=00:00:02" ;;
  *) echo "JobId=$3 JobState=COMPLETED Reason=None RunTime=00:00:01 TimeLimit=00:00:02" ;;
esac
"#;

/// Running on the first poll, completed (and leaves a `done` marker) from the second on
const SCONTROL_SLOW: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
n=$(cat "$dir/polls" 2>/dev/null || echo 0)
n=$((n + 1))
echo "$n" > "$dir/polls"
if [ "$n" -ge 2 ]; then
  echo "JobId=$3 JobState=COMPLETED RunTime=00:00:06 TimeLimit=00:00:02"
  touch "$dir/done"
else
  echo "JobId=$3 JobState=RUNNING RunTime=00:00:01 TimeLimit=00:00:02"
fi
"#;

fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

struct FakeSlurm {
    dir: TempDir,
    sbatch: PathBuf,
    sacct: PathBuf,
    scontrol: PathBuf,
}

impl FakeSlurm {
    fn new(sbatch: &str, scontrol: &str) -> FakeSlurm {
        let dir = TempDir::new().unwrap();
        FakeSlurm {
            sbatch: write_script(dir.path(), "sbatch", sbatch),
            sacct: write_script(dir.path(), "sacct", SACCT_EMPTY),
            scontrol: write_script(dir.path(), "scontrol", scontrol),
            dir,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(BIN);
        cmd.arg("--sbatch").arg(&self.sbatch)
            .arg("--sacct").arg(&self.sacct)
            .arg("--scontrol").arg(&self.scontrol)
            .arg("--settle-delay").arg("0s")
            .env_remove("RUST_LOG");
        cmd
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(100));
    }
    condition()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn resubmits_timed_out_job_in_foreground() {
    let slurm = FakeSlurm::new(SBATCH, SCONTROL_TIMEOUT_ONCE);

    let output = slurm.command()
        .args(["--max-restarts", "3", "--", "--time=00:00:02", "job.sh"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", stderr(&output));
    let log = fs::read_to_string(slurm.path("sbatch.log")).unwrap();
    let calls: Vec<&str> = log.lines().collect();
    assert_eq!(calls, [
        "--time=00:00:02 job.sh origin=none",
        "--open-mode=append --time=00:00:02 job.sh origin=42",
    ]);
    assert!(stderr(&output).contains("Job chain 42 closed after 2 of 3 attempt(s): COMPLETED"));
}

#[test]
fn initial_submission_failure_exits_nonzero() {
    let slurm = FakeSlurm::new(SBATCH_FAILING, SCONTROL_TIMEOUT_ONCE);

    let output = slurm.command().arg("job.sh").output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Invalid partition name specified"));
}

#[test]
fn detached_supervisor_outlives_caller() {
    let slurm = FakeSlurm::new(SBATCH, SCONTROL_SLOW);
    let log_file = slurm.path("longrun.log");

    let start = Instant::now();
    let caller = slurm.command()
        .arg("--detached")
        .arg("--log-file").arg(&log_file)
        .arg("job.sh")
        .spawn_and_wait();
    let caller_runtime = start.elapsed();

    let (caller_pid, output) = caller;
    assert!(output.status.success(), "{}", stderr(&output));
    let pid: u32 = String::from_utf8_lossy(&output.stdout).trim().parse().unwrap();
    assert_ne!(pid, caller_pid);
    assert_ne!(pid, std::process::id());

    // the supervisor sleeps at least 5 seconds before its second poll
    assert!(caller_runtime < Duration::from_secs(4), "caller took {caller_runtime:?}");
    assert!(!slurm.path("done").exists());

    assert!(wait_for(Duration::from_secs(30), || slurm.path("done").exists()));
    assert!(wait_for(Duration::from_secs(10), || {
        fs::read_to_string(&log_file).unwrap_or_default().contains("Job chain 42 closed after 1 of 10 attempt(s): COMPLETED")
    }));
}

trait SpawnAndWait {
    fn spawn_and_wait(&mut self) -> (u32, Output);
}

impl SpawnAndWait for Command {
    fn spawn_and_wait(&mut self) -> (u32, Output) {
        let child = self
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();
        let pid = child.id();
        (pid, child.wait_with_output().unwrap())
    }
}
