// src/listing.rs

//! Package and test-function discovery via the go toolchain.
//!
//! Plain subprocess-output parsing, no state of its own. `get_state` uses
//! the [`PackageLister`] capability so tests never have to depend on a go
//! installation.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::errors::{Result, TestwatchError};
use crate::types::RunParameters;

/// One record of `go test -json` output. Only the fields we consume.
#[derive(Debug, Clone, Default, Deserialize)]
struct TestRecord {
    #[serde(rename = "Action", default)]
    action: String,
    #[serde(rename = "Package", default)]
    package: String,
    #[serde(rename = "Output", default)]
    output: String,
}

/// Test functions of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageTests {
    pub pkg: String,
    pub test_funcs: Vec<String>,
}

/// Capability for discovering buildable packages under a working directory.
pub trait PackageLister: Send + Sync {
    fn list_packages(
        &self,
        cwd: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + '_>>;
}

/// Real lister: `go list ./...` in the working directory. The returned list
/// always starts with the two catch-all patterns `.` and `./...` so a
/// caller can offer them for selection directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoPackageLister;

impl PackageLister for GoPackageLister {
    fn list_packages(
        &self,
        cwd: &Path,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + '_>> {
        let cwd = cwd.to_path_buf();
        Box::pin(async move {
            let output = Command::new("go")
                .args(["list", "./..."])
                .current_dir(&cwd)
                .output()
                .await
                .map_err(|err| TestwatchError::Listing(format!("running go list: {err}")))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(TestwatchError::Listing(format!(
                    "go list failed: {}",
                    stderr.trim()
                )));
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(with_catchall_patterns(stdout.lines()))
        })
    }
}

/// Prepend `.` and `./...` to the listed packages, skipping blank lines.
pub fn with_catchall_patterns<'a>(pkgs: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut list = vec![".".to_string(), "./...".to_string()];
    list.extend(pkgs.filter(|l| !l.trim().is_empty()).map(str::to_string));
    list
}

/// Discover test functions per package via `go test -list=Test -json`.
///
/// Benchmarks and examples are excluded by the `Test` list pattern itself.
pub async fn list_test_funcs(cwd: &Path, params: &RunParameters) -> Result<Vec<PackageTests>> {
    let output = Command::new("go")
        .args(["test", "-list=Test", "-json"])
        .arg(&params.pkg)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|err| TestwatchError::Listing(format!("running go test -list: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TestwatchError::Listing(format!(
            "go test -list failed: {}",
            stderr.trim()
        )));
    }

    debug!(pkg = %params.pkg, "parsing test list output");
    parse_test_list(&String::from_utf8_lossy(&output.stdout))
}

/// Parse a `go test -json` stream: every `output` record whose text starts
/// with `Test` names one test function of its package.
pub fn parse_test_list(raw: &str) -> Result<Vec<PackageTests>> {
    let mut by_pkg: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let record: TestRecord = serde_json::from_str(line)
            .map_err(|err| TestwatchError::Listing(format!("parsing test record: {err}")))?;
        if record.action == "output" && record.output.starts_with("Test") {
            by_pkg
                .entry(record.package)
                .or_default()
                .push(record.output.trim_end().to_string());
        }
    }

    Ok(by_pkg
        .into_iter()
        .map(|(pkg, test_funcs)| PackageTests { pkg, test_funcs })
        .collect())
}
