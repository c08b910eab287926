use nix::errno::Errno;
use nix::unistd::Pid;
use rustyline::error::ReadlineError;
use std::io;
use thiserror::Error;

/// Every failure a command can report back to the prompt loop.
///
/// The Display text is exactly what the user sees.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("{0}: missing argument")]
    MissingArgument(&'static str),

    #[error("{0}: missing arguments")]
    MissingArguments(&'static str),

    #[error("{0}: invalid syntax")]
    InvalidSyntax(&'static str),

    #[error("Usage: {0} <job_id>")]
    Usage(&'static str),

    #[error("Invalid job ID.")]
    InvalidJobId,

    /// An OS primitive failed; rendered like perror(3).
    #[error("{context}: {}", .errno.desc())]
    Os { context: &'static str, errno: Errno },

    #[error("jobs: job table full ({0} jobs)")]
    JobTableFull(usize),

    #[error("jobs: process {0} is already tracked")]
    DuplicateJob(Pid),

    #[error("{0}: argument contains a NUL byte")]
    NulByte(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Input error: {0}")]
    Readline(#[from] ReadlineError),
}

impl ShellError {
    pub fn os(context: &'static str, errno: Errno) -> Self {
        ShellError::Os { context, errno }
    }

    /// `fg`/`bg` usage and slot errors are printed as regular output.
    pub fn reports_on_stdout(&self) -> bool {
        matches!(self, ShellError::Usage(_) | ShellError::InvalidJobId)
    }
}

pub type ShellResult<T> = Result<T, ShellError>;
