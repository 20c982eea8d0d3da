//! Event-feed helpers shared by the integration tests.

use tokio::sync::mpsc::UnboundedReceiver;

use testwatch::events::{RunEvent, StreamSource};

/// Drain the event feed up to and including the `RunResult` of one run.
#[allow(dead_code)]
pub async fn collect_run(events: &mut UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
    let mut out = Vec::new();
    while let Some(event) = events.recv().await {
        let done = matches!(event, RunEvent::RunResult { .. });
        out.push(event);
        if done {
            break;
        }
    }
    out
}

/// The line texts of one source, in emission order.
#[allow(dead_code)]
pub fn lines_from(events: &[RunEvent], from: StreamSource) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            RunEvent::Line { source, text } if *source == from => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Index of the first event matching `pred`, panicking if absent.
#[allow(dead_code)]
pub fn index_of(events: &[RunEvent], pred: impl Fn(&RunEvent) -> bool) -> usize {
    events
        .iter()
        .position(pred)
        .expect("expected event not found in feed")
}
