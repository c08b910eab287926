use crate::env::{parse_assignment, AliasStore, VarStore};
use crate::errors::{ShellError, ShellResult};
use crate::jobs;
use crate::parser::Args;
use crate::shell::ShellContext;
use log::debug;
use nix::errno::Errno;
use nix::unistd::{chdir, getcwd};
use std::io::Write;
use std::path::PathBuf;

/// What the prompt loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

/// Commands implemented inside the shell process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Echo,
    Pwd,
    Export,
    Unset,
    Alias,
    Unalias,
    Jobs,
    Fg,
    Bg,
    Exit,
}

/// Registration order; lookup scans it front to back.
pub const BUILTINS: [Builtin; 11] = [
    Builtin::Cd,
    Builtin::Echo,
    Builtin::Pwd,
    Builtin::Export,
    Builtin::Unset,
    Builtin::Alias,
    Builtin::Unalias,
    Builtin::Jobs,
    Builtin::Fg,
    Builtin::Bg,
    Builtin::Exit,
];

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Cd => "cd",
            Builtin::Echo => "echo",
            Builtin::Pwd => "pwd",
            Builtin::Export => "export",
            Builtin::Unset => "unset",
            Builtin::Alias => "alias",
            Builtin::Unalias => "unalias",
            Builtin::Jobs => "jobs",
            Builtin::Fg => "fg",
            Builtin::Bg => "bg",
            Builtin::Exit => "exit",
        }
    }

    /// Returns the first builtin whose name equals `name` exactly.
    pub fn lookup(name: &str) -> Option<Builtin> {
        BUILTINS.iter().copied().find(|b| b.name() == name)
    }

    pub fn execute<W: Write>(
        self,
        args: &Args<'_>,
        ctx: &mut ShellContext,
        out: &mut W,
    ) -> ShellResult<Flow> {
        debug!("builtin {} {:?}", self.name(), args.rest());
        match self {
            Builtin::Cd => cd(args)?,
            Builtin::Echo => echo(args, out)?,
            Builtin::Pwd => pwd(out)?,
            Builtin::Export => export(args, ctx.vars.as_mut())?,
            Builtin::Unset => unset(args, ctx.vars.as_mut())?,
            Builtin::Alias => alias(args, ctx.aliases.as_mut(), out)?,
            Builtin::Unalias => unalias(args, ctx.aliases.as_mut(), out)?,
            Builtin::Jobs => jobs::list_jobs(&ctx.jobs, out)?,
            Builtin::Fg => jobs::foreground(&mut ctx.jobs, args.get(1), out)?,
            Builtin::Bg => jobs::background(&mut ctx.jobs, args.get(1), out)?,
            Builtin::Exit => {
                writeln!(out, "Exiting shell...")?;
                return Ok(Flow::Exit(0));
            }
        }
        Ok(Flow::Continue)
    }
}

fn cd(args: &Args<'_>) -> ShellResult<()> {
    let target = args.get(1).ok_or(ShellError::MissingArgument("cd"))?;
    let path = match target.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let home = dirs_next::home_dir().ok_or(ShellError::os("cd", Errno::ENOENT))?;
            let mut path = home.into_os_string();
            path.push(rest);
            PathBuf::from(path)
        }
        _ => PathBuf::from(target),
    };
    chdir(path.as_path()).map_err(|errno| ShellError::os("cd", errno))
}

fn echo<W: Write>(args: &Args<'_>, out: &mut W) -> ShellResult<()> {
    for word in args.rest() {
        write!(out, "{} ", word)?;
    }
    writeln!(out)?;
    Ok(())
}

fn pwd<W: Write>(out: &mut W) -> ShellResult<()> {
    let cwd = getcwd().map_err(|errno| ShellError::os("pwd", errno))?;
    writeln!(out, "{}", cwd.display())?;
    Ok(())
}

fn export(args: &Args<'_>, vars: &mut dyn VarStore) -> ShellResult<()> {
    let arg = args.get(1).ok_or(ShellError::MissingArgument("export"))?;
    let (name, value) = parse_assignment(arg).ok_or(ShellError::InvalidSyntax("export"))?;
    vars.set(name, value).map_err(|errno| ShellError::os("export", errno))
}

fn unset(args: &Args<'_>, vars: &mut dyn VarStore) -> ShellResult<()> {
    let name = args.get(1).ok_or(ShellError::MissingArgument("unset"))?;
    vars.unset(name).map_err(|errno| ShellError::os("unset", errno))
}

fn alias<W: Write>(args: &Args<'_>, aliases: &mut dyn AliasStore, out: &mut W) -> ShellResult<()> {
    let arg = args.get(1).ok_or(ShellError::MissingArguments("alias"))?;
    let (name, value) = parse_assignment(arg).ok_or(ShellError::InvalidSyntax("alias"))?;
    aliases.set(name, value);
    writeln!(out, "Alias: {}={}", name, value)?;
    Ok(())
}

fn unalias<W: Write>(args: &Args<'_>, aliases: &mut dyn AliasStore, out: &mut W) -> ShellResult<()> {
    let name = args.get(1).ok_or(ShellError::MissingArguments("unalias"))?;
    aliases.remove(name);
    writeln!(out, "Unalias: {}", name)?;
    Ok(())
}
