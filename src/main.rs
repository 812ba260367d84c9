use clap::Parser;
use finmetrics::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
