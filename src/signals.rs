use crate::errors::ShellResult;
use log::debug;
use nix::sys::signal::{kill, Signal};
use nix::unistd::{getpgid, getpgrp, write, Pid};
use signal_hook::{consts::signal::*, iterator::Signals};
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;

/// Pid of a job resumed with `fg` that lives outside the shell's process
/// group, or 0. The terminal cannot reach such a job, so the shell relays
/// keyboard signals to it.
static FOREGROUND_PID: AtomicI32 = AtomicI32::new(0);

/// Installs signal handlers for the shell:
/// - SIGINT: (Ctrl-C) prints a newline and is relayed to the `fg` job.
/// - SIGTSTP: (Ctrl-Z) caught, so the shell itself is never suspended, and
///   relayed to the `fg` job.
///
/// Handlers do not survive exec, so children start with default dispositions.
pub fn install_signal_handlers() -> ShellResult<()> {
    let mut signals = Signals::new([SIGINT, SIGTSTP])?;
    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            for sig in signals.forever() {
                debug!("received signal {}", sig);
                match sig {
                    SIGINT => {
                        // Bypass the stdout lock: the main thread may hold it
                        // while blocked on a foreground child.
                        let _ = write(libc::STDOUT_FILENO, b"\n");
                        forward_to_foreground(Signal::SIGINT);
                    }
                    SIGTSTP => forward_to_foreground(Signal::SIGTSTP),
                    _ => {}
                }
            }
        })?;
    Ok(())
}

/// Sends `sig` to the job registered by a live [`ForegroundGuard`], if any.
pub fn forward_to_foreground(sig: Signal) {
    let raw = FOREGROUND_PID.load(Ordering::SeqCst);
    if raw > 0 {
        debug!("relaying {} to pid {}", sig, raw);
        let _ = kill(Pid::from_raw(raw), sig);
    }
}

/// Registers `pid` as the relay target for as long as the guard lives.
///
/// Jobs in the shell's own process group already get keyboard signals from
/// the terminal and are not registered.
pub struct ForegroundGuard {
    registered: bool,
}

impl ForegroundGuard {
    pub fn new(pid: Pid) -> Self {
        let separate = matches!(getpgid(Some(pid)), Ok(pgid) if pgid != getpgrp());
        if separate {
            FOREGROUND_PID.store(pid.as_raw(), Ordering::SeqCst);
        }
        ForegroundGuard {
            registered: separate,
        }
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        if self.registered {
            FOREGROUND_PID.store(0, Ordering::SeqCst);
        }
    }
}
