//! fetchcache CLI

// CLI binary needs to report fatal errors to stderr
#![allow(clippy::print_stderr)]

use fetchcache::cli::{self, EXIT_CLI, EXIT_OK, exit_code_for};
use fetchcache::{commands, logging};

fn main() {
    let cli = cli::parse();

    if let Err(e) = logging::init_tracing(cli.tracing_config()) {
        eprintln!("{e:?}");
        std::process::exit(EXIT_CLI);
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_CLI);
        }
    };

    let exit_code = match rt.block_on(commands::run(cli)) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("{:?}", miette::Report::new(e));
            code
        }
    };
    std::process::exit(exit_code);
}
