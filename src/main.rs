use clap::Parser;
use std::process::ExitCode;
use trendsim::cli::{init_tracing, run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.log_format) {
        eprintln!("error: {e}");
        return ExitCode::from(1);
    }
    run(cli)
}
