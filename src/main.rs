use clap::Parser;
use trendangle::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
