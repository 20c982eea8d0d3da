// tests/state_and_listing.rs

mod common;

use std::error::Error;
use std::sync::Arc;

use testwatch_test_utils::init_tracing;

use testwatch::errors::TestwatchError;
use testwatch::events::ChannelSink;
use testwatch::listing::{parse_test_list, with_catchall_patterns, PackageTests};
use testwatch::orchestrator::{Orchestrator, OrchestratorOptions};
use testwatch::types::RunParameters;
use testwatch_test_utils::fakes::{FakeLister, FakeNotifier};
use testwatch_test_utils::harness::harness;
use testwatch_test_utils::process::ScriptedBackend;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn get_state_returns_snapshot_with_refreshed_package_list() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let h = harness(
        dir.path(),
        Box::new(ScriptedBackend::passing()),
        Default::default(),
    );

    let state = h.orch.get_state().await?;
    assert_eq!(state.cwd, dir.path().display().to_string());
    assert_eq!(state.pkg_list, vec!["example.com/mod/pkg".to_string()]);
    assert!(!state.running);
    assert!(!state.watching);
    assert_eq!(state.test_params, RunParameters::default());

    Ok(())
}

#[tokio::test]
async fn get_state_propagates_listing_errors() -> TestResult {
    init_tracing();

    let (sink, _events) = ChannelSink::pair();
    let orch = Orchestrator::new(
        std::env::temp_dir(),
        RunParameters::default(),
        OrchestratorOptions::default(),
        Box::new(ScriptedBackend::passing()),
        Arc::new(sink),
        Arc::new(FakeNotifier::new()),
        Box::new(FakeLister::failing()),
    );

    let err = orch.get_state().await.expect_err("lister failure must surface");
    assert!(matches!(err, TestwatchError::Listing(_)));

    Ok(())
}

#[tokio::test]
async fn get_state_reflects_last_used_parameters() -> TestResult {
    init_tracing();

    let mut h = harness(
        &std::env::temp_dir(),
        Box::new(ScriptedBackend::passing()),
        Default::default(),
    );

    let params = RunParameters {
        pkg: "./internal/...".to_string(),
        verbose: false,
        race: true,
        run_filter: Some("TestGamma".to_string()),
    };
    h.orch.run(params.clone()).await?;
    crate::common::collect_run(&mut h.events).await;

    let state = h.orch.get_state().await?;
    assert_eq!(state.test_params, params);

    Ok(())
}

#[test]
fn package_list_starts_with_catchall_patterns() {
    let listed = with_catchall_patterns(
        "example.com/mod\nexample.com/mod/inner\n\n".lines(),
    );
    assert_eq!(
        listed,
        vec![
            ".".to_string(),
            "./...".to_string(),
            "example.com/mod".to_string(),
            "example.com/mod/inner".to_string(),
        ]
    );
}

#[test]
fn test_list_parsing_groups_test_functions_by_package() {
    let raw = concat!(
        r#"{"Action":"start","Package":"example.com/mod/a"}"#,
        "\n",
        r#"{"Action":"output","Package":"example.com/mod/a","Output":"TestAlpha\n"}"#,
        "\n",
        r#"{"Action":"output","Package":"example.com/mod/a","Output":"TestBeta\n"}"#,
        "\n",
        r#"{"Action":"output","Package":"example.com/mod/a","Output":"ok      example.com/mod/a 0.001s\n"}"#,
        "\n",
        r#"{"Action":"output","Package":"example.com/mod/b","Output":"TestGamma\n"}"#,
        "\n",
        r#"{"Action":"pass","Package":"example.com/mod/b"}"#,
        "\n",
    );

    let parsed = parse_test_list(raw).expect("well-formed stream parses");
    assert_eq!(
        parsed,
        vec![
            PackageTests {
                pkg: "example.com/mod/a".to_string(),
                test_funcs: vec!["TestAlpha".to_string(), "TestBeta".to_string()],
            },
            PackageTests {
                pkg: "example.com/mod/b".to_string(),
                test_funcs: vec!["TestGamma".to_string()],
            },
        ]
    );
}

#[test]
fn test_list_parsing_rejects_malformed_records() {
    let err = parse_test_list("not json at all\n").expect_err("garbage must not parse");
    assert!(matches!(err, TestwatchError::Listing(_)));
}
