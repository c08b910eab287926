use crate::errors::{ShellError, ShellResult};
use crate::jobs::{JobState, JobTable};
use crate::parser::{Args, CommandLine};
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{kill, signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, setpgid, write, ForkResult, Pid};
use std::io::Write;
use std::ptr;

/// Where a child runs relative to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Foreground,
    Background,
}

/// How a waited-for child left the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Exited(i32),
    Signaled(Signal),
    Stopped(Signal),
}

/// Runs an external command.
///
/// Foreground commands block until the child exits or stops; a stopped child
/// becomes a job. Background commands are added to the job table right after
/// the fork and the shell returns to the prompt.
pub fn execute_command<W: Write>(
    cmd: &CommandLine<'_>,
    job_list: &mut JobTable,
    out: &mut W,
) -> ShellResult<()> {
    if cmd.background && job_list.is_full() {
        return Err(ShellError::JobTableFull(job_list.capacity()));
    }
    // Anything buffered must reach the terminal before the child writes.
    out.flush()?;

    if cmd.background {
        let pid = spawn(&cmd.args, Placement::Background)?;
        let slot = job_list.push(pid, JobState::Running, cmd.text)?;
        writeln!(out, "[{}] {}", slot, pid)?;
        return Ok(());
    }

    let pid = spawn(&cmd.args, Placement::Foreground)?;
    loop {
        match wait_for(pid)? {
            WaitOutcome::Exited(code) => {
                debug!("pid {} exited with {}", pid, code);
                return Ok(());
            }
            WaitOutcome::Signaled(sig) => {
                debug!("pid {} killed by {}", pid, sig);
                return Ok(());
            }
            WaitOutcome::Stopped(sig) => {
                debug!("pid {} stopped by {}", pid, sig);
                match job_list.push(pid, JobState::Stopped, cmd.text) {
                    Ok(slot) => {
                        writeln!(out)?;
                        writeln!(out, "[{}] ({}) Stopped {}", slot, pid, cmd.text)?;
                        return Ok(());
                    }
                    Err(err) => {
                        warn!("cannot track stopped pid {}: {}", pid, err);
                        eprintln!("{}", err);
                        kill(pid, Signal::SIGCONT).map_err(|errno| ShellError::os("kill", errno))?;
                    }
                }
            }
        }
    }
}

/// Forks and execs `args`, returning the child's pid.
///
/// The C strings and the NULL-terminated pointer array are built before the
/// fork; the child only adjusts its process group and signal dispositions,
/// execs, and on failure writes a message and `_exit`s.
pub fn spawn(args: &Args<'_>, placement: Placement) -> ShellResult<Pid> {
    let argv = args.to_cstrings()?;
    if argv.is_empty() {
        return Err(ShellError::os("exec", Errno::EINVAL));
    }
    let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
    argv_ptrs.push(ptr::null());
    let prefix = format!("{}: ", args.name().unwrap_or_default());

    match unsafe { fork() } {
        Ok(ForkResult::Child) => exec_child(&argv_ptrs, prefix.as_bytes(), placement),
        Ok(ForkResult::Parent { child }) => {
            if placement == Placement::Background {
                // Also set from the parent so the group exists before `spawn`
                // returns. Fails harmlessly once the child has exec'd.
                let _ = setpgid(child, child);
            }
            debug!("forked pid {} for {:?} ({:?})", child, args.as_slice(), placement);
            Ok(child)
        }
        Err(errno) => Err(ShellError::os("fork", errno)),
    }
}

fn exec_child(argv: &[*const libc::c_char], prefix: &[u8], placement: Placement) -> ! {
    // Background jobs get their own process group so keyboard signals aimed
    // at the shell's group miss them; `fg` relays those signals instead.
    if placement == Placement::Background {
        let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
    }
    unsafe {
        let _ = signal(Signal::SIGINT, SigHandler::SigDfl);
        let _ = signal(Signal::SIGTSTP, SigHandler::SigDfl);
        libc::execvp(argv[0], argv.as_ptr());
    }

    let errno = Errno::last();
    let _ = write(libc::STDERR_FILENO, prefix);
    let _ = write(libc::STDERR_FILENO, errno.desc().as_bytes());
    let _ = write(libc::STDERR_FILENO, b"\n");
    unsafe { libc::_exit(127) }
}

/// Blocks until `pid` exits, is killed, or stops.
pub fn wait_for(pid: Pid) -> ShellResult<WaitOutcome> {
    loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(WaitOutcome::Exited(code)),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(WaitOutcome::Signaled(sig)),
            Ok(WaitStatus::Stopped(_, sig)) => return Ok(WaitOutcome::Stopped(sig)),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(errno) => return Err(ShellError::os("waitpid", errno)),
        }
    }
}
