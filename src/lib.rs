// src/lib.rs

pub mod cli;
pub mod errors;
pub mod events;
pub mod exec;
pub mod listing;
pub mod logging;
pub mod notifier;
pub mod orchestrator;
pub mod state;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::events::{ChannelSink, EventSink, RunEvent, StreamSource};
use crate::exec::GoProcessBackend;
use crate::listing::GoPackageLister;
use crate::notifier::CommandNotifier;
use crate::orchestrator::{Orchestrator, OrchestratorOptions};
use crate::types::{BusyBehaviour, Verdict};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the orchestrator and its real collaborators
/// - the event feed consumer that prints run output
/// - Ctrl-C handling for watch mode
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    let cwd = match args.dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("resolving working directory")?,
    };

    match args.command {
        Command::Run(test) => {
            let params = test.to_params();
            let (sink, mut events) = ChannelSink::pair();
            let orch = build_orchestrator(&cwd, BusyBehaviour::default(), Arc::new(sink));

            let ack = orch.run(params).await?;
            debug!(pkg = %ack.package, "test run started");

            while let Some(event) = events.recv().await {
                if let Some(verdict) = print_event(&event) {
                    return Ok(match verdict {
                        Verdict::Pass => ExitCode::SUCCESS,
                        Verdict::Fail => ExitCode::FAILURE,
                    });
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Watch(watch_args) => {
            let params = watch_args.test.to_params();
            let (sink, mut events) = ChannelSink::pair();
            let orch = build_orchestrator(&cwd, watch_args.on_busy, Arc::new(sink));

            let ack = orch.watch(params).await?;
            debug!(pkg = %ack.package, "watch session started");

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            loop {
                tokio::select! {
                    res = &mut ctrl_c => {
                        if let Err(err) = res {
                            warn!(error = %err, "failed to listen for Ctrl+C");
                        }
                        info!("shutting down");
                        if let Err(err) = orch.unwatch().await {
                            warn!(error = %err, "unwatch on shutdown failed");
                        }
                        break;
                    }
                    event = events.recv() => {
                        match event {
                            Some(event) => {
                                print_event(&event);
                            }
                            None => break,
                        }
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::State => {
            let (sink, _events) = ChannelSink::pair();
            let orch = build_orchestrator(&cwd, BusyBehaviour::default(), Arc::new(sink));
            let state = orch.get_state().await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(ExitCode::SUCCESS)
        }

        Command::Funcs(test) => {
            let params = test.to_params();
            let (sink, _events) = ChannelSink::pair();
            let orch = build_orchestrator(&cwd, BusyBehaviour::default(), Arc::new(sink));
            let funcs = orch.list_test_funcs(&params).await?;
            println!("{}", serde_json::to_string_pretty(&funcs)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_orchestrator(
    cwd: &Path,
    busy_behaviour: BusyBehaviour,
    sink: Arc<dyn EventSink>,
) -> Arc<Orchestrator> {
    Orchestrator::new(
        cwd,
        Default::default(),
        OrchestratorOptions { busy_behaviour },
        Box::new(GoProcessBackend),
        sink,
        Arc::new(CommandNotifier),
        Box::new(GoPackageLister),
    )
}

/// Print one event the way the terminal consumer wants it: test output
/// lines verbatim on their stream, everything else as log lines. Returns
/// the verdict once the run result arrives.
fn print_event(event: &RunEvent) -> Option<Verdict> {
    match event {
        RunEvent::ClearScreen => None,
        RunEvent::Line {
            source: StreamSource::Stdout,
            text,
        } => {
            println!("{text}");
            None
        }
        RunEvent::Line {
            source: StreamSource::Stderr,
            text,
        } => {
            eprintln!("{text}");
            None
        }
        RunEvent::StreamError { source, message } => {
            warn!(%source, %message, "stream decode error");
            None
        }
        RunEvent::StreamDone { source } => {
            debug!(%source, "stream finished");
            None
        }
        RunEvent::RunResult { verdict, message } => {
            match message {
                Some(message) => info!(%verdict, %message, "tests finished"),
                None => info!(%verdict, "tests finished"),
            }
            Some(*verdict)
        }
    }
}
