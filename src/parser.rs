use crate::errors::{ShellError, ShellResult};
use std::ffi::CString;

/// Upper bound on the argument vector, sentinel slot included.
pub const MAXARGS: usize = 64;

/// Upper bound on one input line, in bytes.
pub const MAXLINE: usize = 255;

/// The argument vector of one command line.
///
/// Tokens borrow from the line buffer, so an `Args` cannot outlive the
/// prompt-loop iteration that read the line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Args<'a> {
    tokens: Vec<&'a str>,
}

impl<'a> Args<'a> {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the token at `index`, or `None` at and past the end.
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.tokens.get(index).copied()
    }

    /// The command name (token 0).
    pub fn name(&self) -> Option<&'a str> {
        self.get(0)
    }

    /// Everything after the command name.
    pub fn rest(&self) -> &[&'a str] {
        self.tokens.get(1..).unwrap_or(&[])
    }

    pub fn as_slice(&self) -> &[&'a str] {
        &self.tokens
    }

    /// Converts the vector for `execvp`.
    pub fn to_cstrings(&self) -> ShellResult<Vec<CString>> {
        self.tokens
            .iter()
            .map(|tok| CString::new(*tok).map_err(|_| ShellError::NulByte(tok.to_string())))
            .collect()
    }
}

/// Result of splitting a line into tokens.
#[derive(Debug)]
pub struct Tokens<'a> {
    pub args: Args<'a>,
    /// Tokens beyond `MAXARGS - 1` that were discarded.
    pub dropped: usize,
}

/// Splits `line` on whitespace into at most `MAXARGS - 1` tokens.
///
/// No quoting or escaping is recognised. Excess tokens are counted in
/// `dropped` so the caller can warn about them.
pub fn tokenize(line: &str) -> Tokens<'_> {
    let mut tokens = Vec::new();
    let mut dropped = 0;
    for token in line.split_whitespace() {
        if tokens.len() < MAXARGS - 1 {
            tokens.push(token);
        } else {
            dropped += 1;
        }
    }
    Tokens {
        args: Args { tokens },
        dropped,
    }
}

/// A parsed command line ready for dispatch.
#[derive(Debug)]
pub struct CommandLine<'a> {
    pub args: Args<'a>,
    /// Set when the line ends in `&`.
    pub background: bool,
    /// The line as typed, without its trailing newline.
    pub text: &'a str,
    pub dropped: usize,
}

/// Tokenizes `line` and strips a trailing background marker.
///
/// Both `sleep 5 &` and `sleep 5&` request background execution.
pub fn parse_command_line(line: &str) -> CommandLine<'_> {
    let text = line.trim_end_matches(['\n', '\r']);
    let Tokens { mut args, dropped } = tokenize(text);

    let mut background = false;
    if let Some(last) = args.tokens.pop() {
        match last.strip_suffix('&') {
            Some("") => background = true,
            Some(stripped) => {
                background = true;
                args.tokens.push(stripped);
            }
            None => args.tokens.push(last),
        }
    }

    CommandLine {
        args,
        background,
        text,
        dropped,
    }
}
