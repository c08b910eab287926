use nix::errno::Errno;
use std::collections::HashMap;
use std::env;

/// Key-value store behind `export` and `unset`.
pub trait VarStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str) -> Result<(), Errno>;
    fn unset(&mut self, name: &str) -> Result<(), Errno>;
}

/// The process environment, inherited by every child the shell starts.
#[derive(Debug, Default)]
pub struct ProcessEnv;

fn check_name(name: &str) -> Result<(), Errno> {
    if name.is_empty() || name.contains(['=', '\0']) {
        return Err(Errno::EINVAL);
    }
    Ok(())
}

impl VarStore for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        check_name(name).ok()?;
        env::var(name).ok()
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), Errno> {
        check_name(name)?;
        if value.contains('\0') {
            return Err(Errno::EINVAL);
        }
        env::set_var(name, value);
        Ok(())
    }

    fn unset(&mut self, name: &str) -> Result<(), Errno> {
        check_name(name)?;
        env::remove_var(name);
        Ok(())
    }
}

/// Name-to-text map behind `alias` and `unalias`.
pub trait AliasStore {
    fn set(&mut self, name: &str, value: &str);
    fn remove(&mut self, name: &str) -> Option<String>;
    fn lookup(&self, name: &str) -> Option<&str>;
}

#[derive(Debug, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasStore for AliasTable {
    fn set(&mut self, name: &str, value: &str) {
        self.aliases.insert(name.to_string(), value.to_string());
    }

    fn remove(&mut self, name: &str) -> Option<String> {
        self.aliases.remove(name)
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }
}

/// Splits `name=value` at the first `=`. The name must be non-empty.
pub fn parse_assignment(arg: &str) -> Option<(&str, &str)> {
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() => Some((name, value)),
        _ => None,
    }
}
