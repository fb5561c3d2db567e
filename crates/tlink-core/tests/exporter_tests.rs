mod common;

use common::*;
use tlink_core::rpc::ExecutionStatus;
use tlink_core::{Config, FixtureConfig, ResultExporter, ResultState, TestResultNode};

const FIXTURE: &str = "Acme.Tests.LoginTests";

fn config() -> Config {
    Config {
        defaults: FixtureConfig {
            url: Some("http://tl.example.com/api".to_string()),
            dev_key: Some("dev-key".to_string()),
            user: Some("automation".to_string()),
            project: Some("Demo".to_string()),
            test_plan: Some("Release1".to_string()),
            platform: Some("Linux".to_string()),
            build: None,
            test_suite: None,
            enabled: Some(true),
        },
        ..Config::default()
    }
}

fn login_tests() -> TestResultNode {
    TestResultNode::group(
        "Acme.Tests.dll",
        vec![TestResultNode::group(
            FIXTURE,
            vec![
                TestResultNode::leaf("Acme.Tests.LoginTests.Accepts", ResultState::Success),
                TestResultNode::leaf("Acme.Tests.LoginTests.Rejects", ResultState::Failure)
                    .with_message("expected 401"),
                TestResultNode::leaf("Acme.Tests.LoginTests.Later", ResultState::Skipped),
            ],
        )],
    )
}

#[tokio::test]
async fn test_exports_every_leaf() {
    let fake = FakeTestLink::demo();
    let mut exporter = ResultExporter::new(fake.connector(), config());

    let summary = exporter.run_finished(&login_tests()).await;
    assert_eq!(summary.reported, 3);
    assert_eq!(summary.total(), 3);

    let (reports, suites) = fake.with(|server| (server.reports.clone(), server.created_suites.clone()));
    let statuses: Vec<_> = reports.iter().map(|report| report.status).collect();
    assert_eq!(
        statuses,
        [ExecutionStatus::Pass, ExecutionStatus::Fail, ExecutionStatus::Blocked]
    );
    assert!(reports[1].notes.contains("expected 401"));
    assert!(reports[2].notes.contains("SKIPPED"));
    assert!(reports.iter().all(|report| report.build_id == BUILD_11_ID));

    // The fixture name doubles as the suite path.
    let names: Vec<_> = suites.iter().map(|suite| suite.name.as_str()).collect();
    assert_eq!(names, ["Acme", "Tests", "LoginTests"]);
    assert_eq!(fake.calls("ping"), 1);
}

#[tokio::test]
async fn test_output_goes_to_the_next_leaf_only() {
    let fake = FakeTestLink::demo();
    let mut exporter = ResultExporter::new(fake.connector(), config());

    exporter.test_started();
    exporter.test_output("console text");
    exporter.run_finished(&login_tests()).await;

    let reports = fake.with(|server| server.reports.clone());
    assert!(reports[0].notes.contains("console text"));
    assert!(!reports[1].notes.contains("console text"));
}

#[tokio::test]
async fn test_leaf_output_wins() {
    let fake = FakeTestLink::demo();
    let mut exporter = ResultExporter::new(fake.connector(), config());
    let tree = TestResultNode::group(
        FIXTURE,
        vec![
            TestResultNode::leaf("Acme.Tests.LoginTests.Accepts", ResultState::Success)
                .with_output("own output"),
            TestResultNode::leaf("Acme.Tests.LoginTests.Rejects", ResultState::Success),
        ],
    );

    exporter.test_output("stale");
    exporter.run_finished(&tree).await;

    let reports = fake.with(|server| server.reports.clone());
    assert_eq!(reports[0].notes, "own output\n");
    assert!(!reports[1].notes.contains("stale"));
}

#[tokio::test]
async fn test_leaf_without_fixture_is_unconfigured() {
    let fake = FakeTestLink::demo();
    let mut config = config();
    config.defaults.test_suite = Some("Root".to_string());
    let mut exporter = ResultExporter::new(fake.connector(), config);

    let summary = exporter
        .run_finished(&TestResultNode::leaf("Standalone", ResultState::Success))
        .await;
    assert_eq!(summary.unconfigured, 1);
    assert_eq!(summary.total(), 1);
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_lost_connection_reconnects_for_next_leaf() {
    let fake = FakeTestLink::demo();
    fake.with(|server| server.failing.insert("report_test_case_result"));
    let mut exporter = ResultExporter::new(fake.connector(), config());

    let summary = exporter.run_finished(&login_tests()).await;
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.reported, 0);

    let connects = fake.with(|server| server.connects.len());
    assert_eq!(connects, 3);
    assert_eq!(fake.calls("ping"), 3);
    assert!(exporter.adaptor().last_error().is_some());
}

#[tokio::test]
async fn test_disabled_and_unconfigured_fixtures() {
    let fake = FakeTestLink::demo();
    let mut config = config();
    config.defaults.url = None;
    config.fixtures.insert(
        FIXTURE.to_string(),
        FixtureConfig {
            url: Some("http://tl.example.com/api".to_string()),
            enabled: Some(false),
            ..FixtureConfig::default()
        },
    );
    let mut exporter = ResultExporter::new(fake.connector(), config);

    let tree = TestResultNode::group(
        "Acme.Tests.dll",
        vec![
            login_tests(),
            TestResultNode::leaf("Acme.Tests.CartTests.Adds", ResultState::Success),
        ],
    );
    let summary = exporter.run_finished(&tree).await;

    assert_eq!(summary.disabled, 3);
    assert_eq!(summary.unconfigured, 1);
    assert_eq!(summary.reported, 0);
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_run() {
    let fake = FakeTestLink::demo();
    fake.with(|server| {
        server.reject_test_case_names.insert("Rejects".to_string());
    });
    let mut exporter = ResultExporter::new(fake.connector(), config());

    let summary = exporter.run_finished(&login_tests()).await;
    assert_eq!(summary.reported, 2);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_unreachable_server() {
    let fake = FakeTestLink::demo();
    let mut config = config();
    config.defaults.url = Some(UNREACHABLE_URL.to_string());
    let mut exporter = ResultExporter::new(fake.connector(), config);

    let summary = exporter.run_finished(&login_tests()).await;
    assert_eq!(summary.failed, 3);
    assert!(exporter.adaptor().last_error().is_some());
    // Unchanged parameters are not retried.
    assert_eq!(fake.with(|server| server.connects.len()), 1);
}

#[tokio::test]
async fn test_configured_suite_and_parameterised_name() {
    let fake = FakeTestLink::demo();
    let mut config = config();
    config.fixtures.insert(
        "Acme.MathTests".to_string(),
        FixtureConfig {
            test_suite: Some("Root.Math".to_string()),
            ..FixtureConfig::default()
        },
    );
    let mut exporter = ResultExporter::new(fake.connector(), config);

    let mut leaf = TestResultNode::leaf("Acme.MathTests.Add(1,2)", ResultState::Success)
        .with_method_name("Add")
        .with_description("adds numbers");
    leaf.name = "Add(1,2)".to_string();
    let summary = exporter.run_finished(&leaf).await;
    assert_eq!(summary.reported, 1);

    let (created, suites) =
        fake.with(|server| (server.created_test_cases.clone(), server.created_suites.clone()));
    assert_eq!(created[0].name, "Add.Add(1,2)");
    assert_eq!(created[0].summary, "adds numbers");
    assert_eq!(suites.len(), 1);
    assert_eq!(suites[0].name, "Math");
    assert_eq!(suites[0].parent_id, Some(ROOT_SUITE_ID));
}
