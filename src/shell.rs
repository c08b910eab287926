use crate::builtins::{Builtin, Flow};
use crate::env::{AliasStore, AliasTable, ProcessEnv, VarStore};
use crate::errors::{ShellError, ShellResult};
use crate::exec::execute_command;
use crate::jobs::JobTable;
use crate::parser::{parse_command_line, MAXLINE};
use crate::utils::truncate_str;
use log::{debug, warn};
use nix::unistd::isatty;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, BufRead, Write};

/// Global prompt string.
pub static PROMPT: &str = "$ ";

/// Command-line options of the shell binary.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Print the prompt before each read.
    pub emit_prompt: bool,
    /// Log each received command.
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            emit_prompt: true,
            verbose: false,
        }
    }
}

/// State owned by the prompt loop and lent to each command.
pub struct ShellContext {
    pub jobs: JobTable,
    pub vars: Box<dyn VarStore>,
    pub aliases: Box<dyn AliasStore>,
}

impl Default for ShellContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellContext {
    pub fn new() -> Self {
        Self::with_stores(Box::new(ProcessEnv), Box::<AliasTable>::default())
    }

    pub fn with_stores(vars: Box<dyn VarStore>, aliases: Box<dyn AliasStore>) -> Self {
        ShellContext {
            jobs: JobTable::new(),
            vars,
            aliases,
        }
    }
}

/// Source of input lines: a line editor on a terminal, plain stdin otherwise.
pub enum LineReader {
    Editor(Box<DefaultEditor>),
    Plain { emit_prompt: bool },
}

impl LineReader {
    pub fn new(opts: &Options) -> ShellResult<Self> {
        if opts.emit_prompt && isatty(libc::STDIN_FILENO).unwrap_or(false) {
            let config = Config::builder().auto_add_history(false).build();
            let editor = DefaultEditor::with_config(config)?;
            return Ok(LineReader::Editor(Box::new(editor)));
        }
        Ok(LineReader::Plain {
            emit_prompt: opts.emit_prompt,
        })
    }

    /// Reads one line, or `None` at end of input.
    pub fn read_line(&mut self) -> ShellResult<Option<String>> {
        match self {
            LineReader::Editor(editor) => match editor.readline(PROMPT) {
                Ok(line) => Ok(Some(line)),
                Err(ReadlineError::Interrupted) => {
                    println!();
                    Ok(Some(String::new()))
                }
                Err(ReadlineError::Eof) => Ok(None),
                Err(ReadlineError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                    eprintln!("warning: input is not valid UTF-8, line ignored");
                    Ok(Some(String::new()))
                }
                Err(e) => Err(e.into()),
            },
            LineReader::Plain { emit_prompt } => {
                if *emit_prompt {
                    print!("{}", PROMPT);
                    io::stdout().flush()?;
                }
                Ok(read_raw_line(&mut io::stdin().lock())?)
            }
        }
    }
}

/// Reads one line of arbitrary bytes; invalid UTF-8 becomes U+FFFD.
pub fn read_raw_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    match reader.read_until(b'\n', &mut buf)? {
        0 => Ok(None),
        _ => Ok(Some(String::from_utf8_lossy(&buf).into_owned())),
    }
}

/// Cuts an overlong line to `MAXLINE` bytes, warning the user.
pub fn bound_line(mut line: String) -> String {
    let body_len = line.trim_end_matches(['\n', '\r']).len();
    if body_len > MAXLINE {
        let keep = truncate_str(&line, MAXLINE).len();
        line.truncate(keep);
        warn!("input line of {} bytes truncated", body_len);
        eprintln!("warning: input longer than {} bytes, truncated", MAXLINE);
    }
    line
}

/// Evaluates one input line.
pub fn eval<W: Write>(line: &str, ctx: &mut ShellContext, out: &mut W) -> ShellResult<Flow> {
    let cmd = parse_command_line(line);
    if cmd.dropped > 0 {
        warn!("{} arguments dropped", cmd.dropped);
        eprintln!("warning: too many arguments, {} ignored", cmd.dropped);
    }
    let Some(name) = cmd.args.name() else {
        return Ok(Flow::Continue);
    };

    if let Some(builtin) = Builtin::lookup(name) {
        if cmd.background {
            debug!("ignoring background request for builtin {}", name);
        }
        return builtin.execute(&cmd.args, ctx, out);
    }

    execute_command(&cmd, &mut ctx.jobs, out)?;
    Ok(Flow::Continue)
}

/// Prints a failed command's error. `fg`/`bg` usage and slot errors are
/// regular output; everything else goes to stderr.
fn report_error<W: Write>(err: &ShellError, out: &mut W) -> io::Result<()> {
    if err.reports_on_stdout() {
        writeln!(out, "{}", err)
    } else {
        eprintln!("{}", err);
        Ok(())
    }
}

/// Reports and forgets background jobs that finished since the last prompt.
fn report_finished<W: Write>(ctx: &mut ShellContext, out: &mut W) -> io::Result<()> {
    for (slot, job) in ctx.jobs.reap() {
        writeln!(out, "[{}] Done {}", slot, job.cmdline)?;
    }
    out.flush()
}

/// Runs the main shell loop: prints the prompt (if enabled), reads input,
/// parses it, and evaluates commands. Returns the exit status.
pub fn run_shell(opts: &Options) -> ShellResult<i32> {
    let mut ctx = ShellContext::new();
    let mut input = LineReader::new(opts)?;
    let stdout = io::stdout();

    loop {
        report_finished(&mut ctx, &mut stdout.lock())?;

        let line = match input.read_line() {
            Ok(Some(line)) => bound_line(line),
            Ok(None) => break, // End-of-file (Ctrl-D)
            Err(e) => {
                debug!("reading input failed: {:?}", e);
                eprintln!("Error reading input: {}", e);
                break;
            }
        };
        if opts.verbose {
            debug!("received command: {}", line.trim_end());
        }

        let mut out = stdout.lock();
        let flow = match eval(&line, &mut ctx, &mut out) {
            Ok(flow) => flow,
            Err(e) => {
                report_error(&e, &mut out)?;
                Flow::Continue
            }
        };
        out.flush()?;
        if let Flow::Exit(code) = flow {
            return Ok(code);
        }
    }
    Ok(0)
}
