// src/cli.rs

//! Command-line interface definitions.

use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{BusyBehaviour, RunParameters};

#[derive(Debug, Parser)]
#[command(
    name = "testwatch",
    about = "Run go tests, stream their output, and re-run them on file changes",
    version
)]
pub struct CliArgs {
    /// Working directory containing the go module. Defaults to the current
    /// directory.
    #[arg(long = "dir", env = "TESTWATCH_DIR", global = true)]
    pub dir: Option<String>,

    /// Log verbosity. Falls back to the TESTWATCH_LOG environment variable,
    /// then "info".
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the tests once and stream their output.
    Run(TestArgs),
    /// Run once, then re-run whenever the working directory changes.
    Watch(WatchArgs),
    /// Print the orchestrator state, including the package list.
    State,
    /// List test functions per package.
    Funcs(TestArgs),
}

/// Test selection flags shared by `run`, `watch` and `funcs`.
#[derive(Debug, Clone, Args)]
pub struct TestArgs {
    /// Package path pattern to test.
    #[arg(long, env = "TESTWATCH_PKG", default_value = "./...")]
    pub pkg: String,

    /// Do not pass -v to go test (verbose is the default).
    #[arg(long = "no-verbose")]
    pub no_verbose: bool,

    /// Enable the race detector (-race).
    #[arg(long)]
    pub race: bool,

    /// Only run tests matching this pattern (-run).
    #[arg(long = "run", value_name = "PATTERN")]
    pub run_filter: Option<String>,
}

impl TestArgs {
    pub fn to_params(&self) -> RunParameters {
        RunParameters {
            pkg: self.pkg.clone(),
            verbose: !self.no_verbose,
            race: self.race,
            run_filter: self.run_filter.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub test: TestArgs,

    /// What to do with a change that arrives while tests are running:
    /// "ignore" drops it, "queue" remembers one rerun for after the run.
    #[arg(long = "on-busy", default_value = "ignore", value_parser = parse_busy)]
    pub on_busy: BusyBehaviour,
}

fn parse_busy(s: &str) -> Result<BusyBehaviour, String> {
    BusyBehaviour::from_str(s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}
