use log::LevelFilter;
use std::process;

pub fn print_usage() {
    println!("Usage: jobsh [-hvp]");
    println!("   -h   Print this help message");
    println!("   -v   Enable verbose mode");
    println!("   -p   Do not print a command prompt");
    process::exit(1);
}

/// Sets up `env_logger`; `-v` forces debug output regardless of `RUST_LOG`.
pub fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.format_timestamp(None);
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

/// Cuts `s` to at most `max` bytes without splitting a UTF-8 sequence.
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
