//! Run the supervisor as a daemon so the invoking shell gets its prompt back
//!
//! Detaching is a platform capability. On unix it is a double fork: an intermediate child forks
//! the real worker, reports the worker's pid back through a pipe and exits at once. The worker is
//! reparented to init, starts a new session and drops its terminal. Elsewhere detaching fails
//! with [crate::error::LongrunError::UnsupportedPlatform], which the caller reports as a fatal
//! error. Running in the foreground is what happens without `--detached`, never as a substitute.

use crate::error::Result;

pub trait Detach {
    /// Run `entrypoint` in a detached process and return that process' pid
    ///
    /// Returns as soon as the pid is known. The value returned by `entrypoint` becomes the exit
    /// status of the detached process.
    fn run_detached<F: FnOnce() -> i32>(&self, entrypoint: F) -> Result<u32>;
}

#[cfg(unix)]
pub use self::unix::ForkDetacher as PlatformDetacher;
#[cfg(not(unix))]
pub use self::unsupported::UnsupportedDetacher as PlatformDetacher;

#[cfg(unix)]
mod unix {
    use std::fs::{File, OpenOptions};
    use std::io::{Read, Write};
    use std::os::fd::AsRawFd;
    use std::process;

    use log::debug;
    use nix::sys::wait::waitpid;
    use nix::unistd::{dup2, fork, pipe, setsid, ForkResult};

    use super::Detach;
    use crate::error::{LongrunError, Result};

    #[derive(Debug, Default, Clone, Copy)]
    pub struct ForkDetacher;

    impl Detach for ForkDetacher {
        fn run_detached<F: FnOnce() -> i32>(&self, entrypoint: F) -> Result<u32> {
            // single slot: written once by the intermediate child, read once here
            let (read_end, write_end) = pipe().map_err(std::io::Error::from)?;

            // SAFETY: the supervisor is single threaded, there are no other threads whose
            // state could be left inconsistent in the children
            match unsafe { fork() }.map_err(std::io::Error::from)? {
                ForkResult::Parent { child } => {
                    drop(write_end);
                    let mut reply = String::new();
                    File::from(read_end).read_to_string(&mut reply)?;
                    waitpid(child, None).map_err(std::io::Error::from)?;

                    let pid = reply.trim().parse::<u32>().map_err(|_| {
                        LongrunError::Io(std::io::Error::new(
                            std::io::ErrorKind::Other,
                            format!("detached process reported an invalid pid {reply:?}"),
                        ))
                    })?;
                    debug!("Detached supervisor has pid {pid}");
                    Ok(pid)
                }
                ForkResult::Child => {
                    drop(read_end);
                    // SAFETY: as above, still single threaded
                    match unsafe { fork() } {
                        Ok(ForkResult::Parent { child }) => {
                            let mut channel = File::from(write_end);
                            let written = write!(channel, "{child}");
                            process::exit(if written.is_ok() { 0 } else { 1 })
                        }
                        Ok(ForkResult::Child) => {
                            drop(write_end);
                            let status = match leave_terminal() {
                                Ok(()) => entrypoint(),
                                Err(_) => 1,
                            };
                            process::exit(status)
                        }
                        Err(_) => process::exit(1),
                    }
                }
            }
        }
    }

    /// Start a new session and point stdin, stdout and stderr at /dev/null
    fn leave_terminal() -> Result<()> {
        setsid().map_err(std::io::Error::from)?;

        let null_in = File::open("/dev/null")?;
        let null_out = OpenOptions::new().append(true).open("/dev/null")?;
        dup2(null_in.as_raw_fd(), 0).map_err(std::io::Error::from)?;
        dup2(null_out.as_raw_fd(), 1).map_err(std::io::Error::from)?;
        dup2(null_out.as_raw_fd(), 2).map_err(std::io::Error::from)?;
        Ok(())
    }
}

#[cfg(not(unix))]
mod unsupported {
    use super::Detach;
    use crate::error::{LongrunError, Result};

    #[derive(Debug, Default, Clone, Copy)]
    pub struct UnsupportedDetacher;

    impl Detach for UnsupportedDetacher {
        fn run_detached<F: FnOnce() -> i32>(&self, _entrypoint: F) -> Result<u32> {
            Err(LongrunError::UnsupportedPlatform)
        }
    }
}
