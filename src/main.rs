use jobsh::shell::{self, Options};
use jobsh::{signals, utils};
use std::env;
use std::process;

fn main() {
    // Parse command-line arguments.
    let mut opts = Options::default();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" => utils::print_usage(),
            "-v" => opts.verbose = true,
            "-p" => opts.emit_prompt = false,
            other => {
                eprintln!("jobsh: unknown option {}", other);
                utils::print_usage();
            }
        }
    }

    utils::init_logging(opts.verbose);

    // Install signal handlers.
    if let Err(e) = signals::install_signal_handlers() {
        eprintln!("jobsh: {}", e);
        process::exit(1);
    }

    // Run the main shell loop with the options.
    match shell::run_shell(&opts) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("jobsh: {}", e);
            process::exit(1);
        }
    }
}
