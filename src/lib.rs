pub mod builtins;
pub mod env;
pub mod errors;
pub mod exec;
pub mod jobs;
pub mod parser;
pub mod shell;
pub mod signals;
pub mod utils;

pub use errors::{ShellError, ShellResult};
