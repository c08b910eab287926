use crate::errors::{ShellError, ShellResult};
use crate::exec::{wait_for, WaitOutcome};
use crate::signals::ForegroundGuard;
use crate::utils::truncate_str;
use log::debug;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::io::Write;

/// Maximum number of tracked jobs.
pub const MAXJOBS: usize = 100;

/// Longest command text kept in a job record, in bytes.
pub const MAXCMDLINE: usize = 255;

/// Represents the state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
}

impl JobState {
    fn as_str(self) -> &'static str {
        match self {
            JobState::Running => "Running",
            JobState::Stopped => "Stopped",
        }
    }
}

/// A child process started by this shell and not yet reaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid,
    pub state: JobState,
    pub cmdline: String,
}

/// Ordered, capacity-bounded list of jobs.
///
/// Slots are 1-based: slot N lives at index N-1. Removing a job shifts every
/// later job down by one, so slot numbers always stay dense.
#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    capacity: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self::with_capacity(MAXJOBS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        JobTable {
            jobs: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    /// Appends a job and returns its slot.
    pub fn push(&mut self, pid: Pid, state: JobState, cmdline: &str) -> ShellResult<usize> {
        if self.is_full() {
            return Err(ShellError::JobTableFull(self.capacity));
        }
        if self.jobs.iter().any(|job| job.pid == pid) {
            return Err(ShellError::DuplicateJob(pid));
        }
        self.jobs.push(Job {
            pid,
            state,
            cmdline: truncate_str(cmdline, MAXCMDLINE).to_string(),
        });
        let slot = self.jobs.len();
        debug!("job [{}] added: pid {} ({})", slot, pid, cmdline);
        Ok(slot)
    }

    pub fn get(&self, slot: usize) -> Option<&Job> {
        slot.checked_sub(1).and_then(|idx| self.jobs.get(idx))
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Job> {
        slot.checked_sub(1).and_then(|idx| self.jobs.get_mut(idx))
    }

    /// Removes the job at `slot`, compacting the jobs after it.
    pub fn remove(&mut self, slot: usize) -> Option<Job> {
        if slot == 0 || slot > self.jobs.len() {
            return None;
        }
        let job = self.jobs.remove(slot - 1);
        debug!("job [{}] removed: pid {}", slot, job.pid);
        Some(job)
    }

    /// Iterates over `(slot, job)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Job)> {
        self.jobs.iter().enumerate().map(|(idx, job)| (idx + 1, job))
    }

    /// Polls every job without blocking.
    ///
    /// Finished jobs are removed and returned with the slot they held when
    /// the sweep started. Stopped and continued jobs only change state.
    pub fn reap(&mut self) -> Vec<(usize, Job)> {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        let mut finished = Vec::new();
        let mut idx = 0;
        while idx < self.jobs.len() {
            let slot = idx + 1 + finished.len();
            match waitpid(self.jobs[idx].pid, Some(flags)) {
                Ok(WaitStatus::Exited(pid, code)) => {
                    debug!("job [{}] pid {} exited with {}", slot, pid, code);
                    finished.push((slot, self.jobs.remove(idx)));
                }
                Ok(WaitStatus::Signaled(pid, sig, _)) => {
                    debug!("job [{}] pid {} killed by {}", slot, pid, sig);
                    finished.push((slot, self.jobs.remove(idx)));
                }
                Err(Errno::ECHILD) => {
                    debug!("job [{}] pid {} is gone", slot, self.jobs[idx].pid);
                    finished.push((slot, self.jobs.remove(idx)));
                }
                Ok(WaitStatus::Stopped(..)) => {
                    self.jobs[idx].state = JobState::Stopped;
                    idx += 1;
                }
                Ok(WaitStatus::Continued(_)) => {
                    self.jobs[idx].state = JobState::Running;
                    idx += 1;
                }
                _ => idx += 1,
            }
        }
        finished
    }
}

/// Prints the list of jobs.
pub fn list_jobs<W: Write>(job_list: &JobTable, out: &mut W) -> ShellResult<()> {
    for (slot, job) in job_list.iter() {
        writeln!(out, "[{}] ({}) {} {}", slot, job.pid, job.state.as_str(), job.cmdline)?;
    }
    Ok(())
}

/// Parses a user-supplied slot such as `2` or `%2`.
pub fn parse_slot(arg: &str) -> Option<usize> {
    arg.strip_prefix('%').unwrap_or(arg).parse().ok()
}

fn resolve_slot(job_list: &JobTable, cmd: &'static str, arg: Option<&str>) -> ShellResult<usize> {
    let arg = arg.ok_or(ShellError::Usage(cmd))?;
    match parse_slot(arg) {
        Some(slot) if job_list.get(slot).is_some() => Ok(slot),
        _ => Err(ShellError::InvalidJobId),
    }
}

/// `fg`: waits for the job in `slot` (`N` or `%N`) and drops it from the
/// table once it ends. Ctrl-C and Ctrl-Z are relayed to the job while the
/// shell waits.
pub fn foreground<W: Write>(
    job_list: &mut JobTable,
    arg: Option<&str>,
    out: &mut W,
) -> ShellResult<()> {
    let slot = resolve_slot(job_list, "fg", arg)?;
    let (pid, state) = match job_list.get(slot) {
        Some(job) => (job.pid, job.state),
        None => return Err(ShellError::InvalidJobId),
    };
    out.flush()?;

    if state == JobState::Stopped {
        kill(pid, Signal::SIGCONT).map_err(|errno| ShellError::os("kill", errno))?;
        if let Some(job) = job_list.get_mut(slot) {
            job.state = JobState::Running;
        }
    }

    let outcome = {
        let _relay = ForegroundGuard::new(pid);
        wait_for(pid)
    };
    match outcome {
        Ok(WaitOutcome::Stopped(_)) => {
            if let Some(job) = job_list.get_mut(slot) {
                job.state = JobState::Stopped;
                writeln!(out)?;
                writeln!(out, "[{}] ({}) Stopped {}", slot, job.pid, job.cmdline)?;
            }
            Ok(())
        }
        Ok(_) => {
            if let Some(job) = job_list.remove(slot) {
                writeln!(out, "Foreground job {} ({}) terminated.", job.pid, job.cmdline)?;
            }
            Ok(())
        }
        Err(ShellError::Os {
            errno: Errno::ECHILD,
            ..
        }) => {
            job_list.remove(slot);
            Err(ShellError::os("fg", Errno::ECHILD))
        }
        Err(err) => Err(err),
    }
}

/// `bg`: resumes the job in `slot` (`N` or `%N`); it stays in the table.
pub fn background<W: Write>(
    job_list: &mut JobTable,
    arg: Option<&str>,
    out: &mut W,
) -> ShellResult<()> {
    let slot = resolve_slot(job_list, "bg", arg)?;
    let job = job_list.get_mut(slot).ok_or(ShellError::InvalidJobId)?;
    writeln!(out, "Background job {} ({}).", job.pid, job.cmdline)?;
    kill(job.pid, Signal::SIGCONT).map_err(|errno| ShellError::os("kill", errno))?;
    job.state = JobState::Running;
    Ok(())
}
