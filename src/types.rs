use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Parameters for one `go test` invocation.
///
/// Supplied fresh by the caller on every run/watch request and never mutated
/// by the orchestrator. The defaults match the interactive tool: test the
/// whole module tree, verbosely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParameters {
    /// Package path pattern (e.g. `.`, `./...`, `./pkg/...`).
    pub pkg: String,
    /// Pass `-v`.
    pub verbose: bool,
    /// Pass `-race`.
    pub race: bool,
    /// Pass `-run <pattern>`; `None` means unrestricted.
    #[serde(default)]
    pub run_filter: Option<String>,
}

impl Default for RunParameters {
    fn default() -> Self {
        RunParameters {
            pkg: "./...".to_string(),
            verbose: true,
            race: false,
            run_filter: None,
        }
    }
}

/// Behaviour when a change notification arrives while a test run is already
/// in progress.
///
/// - `Ignore`: drop the notification (default). The running run is the only
///   intent that is honoured; a change arriving mid-run does not retrigger.
/// - `Queue`: remember that a rerun is wanted and start exactly one new run
///   once the current one finishes. Multiple changes mid-run coalesce into
///   that single pending rerun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyBehaviour {
    Ignore,
    Queue,
}

impl Default for BusyBehaviour {
    fn default() -> Self {
        BusyBehaviour::Ignore
    }
}

impl FromStr for BusyBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(BusyBehaviour::Ignore),
            "queue" => Ok(BusyBehaviour::Queue),
            other => Err(format!(
                "invalid on-busy behaviour: {other} (expected \"ignore\" or \"queue\")"
            )),
        }
    }
}

/// Outcome of a test run: `Pass` iff the process exited with status zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn from_success(success: bool) -> Self {
        if success { Verdict::Pass } else { Verdict::Fail }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
