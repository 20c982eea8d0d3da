// src/main.rs

use std::process::ExitCode;

use clap::Parser;

use testwatch::cli::CliArgs;
use testwatch::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = CliArgs::parse();
    init_logging(args.log_level)?;
    testwatch::run(args).await
}
