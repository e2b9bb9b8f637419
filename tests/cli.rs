mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tracing_subscriber::{layer::Context, prelude::*, Layer, Registry};

use common::StubServer;

fn write_config(dir: &Path, server: &StubServer) -> std::path::PathBuf {
    write_config_with_report(dir, server, &dir.join("report.json"))
}

fn write_config_with_report(dir: &Path, server: &StubServer, report: &Path) -> std::path::PathBuf {
    let config = dir.join("docs-bucket.yaml");
    let yaml = format!(
        r#"
source:
  owner: reflex-dev
  repo: reflex-web
  reference: main
  root_path: docs
  api_base: "{api}"
output:
  artifact: "{artifact}"
  staging_dir: "{staging}"
  report: "{report}"
baseline:
  url: "{baseline}"
request_timeout_secs: 5
"#,
        api = server.base_url,
        artifact = dir.join("reflex_docs.txt").display(),
        staging = dir.join("staging").display(),
        report = report.display(),
        baseline = server.url("/published/reflex_docs.txt"),
    );
    fs::write(&config, yaml).expect("Writing temp config failed");
    config
}

fn serve_single_file(server: &StubServer) {
    server.route(
        "/repos/reflex-dev/reflex-web/contents/docs?ref=main",
        200,
        format!(
            r#"[{{"path":"docs/index.md","type":"file","download_url":"{}","url":null}}]"#,
            server.url("/raw/docs/index.md")
        ),
    );
    server.route("/raw/docs/index.md", 200, "\n# Welcome\n");
}

#[test]
fn sync_cli_publishes_when_baseline_is_missing() {
    let server = StubServer::start();
    serve_single_file(&server);
    let tmp = tempdir().unwrap();
    let config = write_config(tmp.path(), &server);

    let mut cmd = Command::cargo_bin("docs-bucket").expect("Binary exists");
    cmd.arg("sync")
        .arg("--config")
        .arg(&config)
        .env("GITHUB_TOKEN", "cli-token");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Synchronise complete"));

    assert_eq!(
        fs::read_to_string(tmp.path().join("reflex_docs.txt")).unwrap(),
        "# Welcome\n"
    );
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report["outcome"]["state"], "publish");
    assert_eq!(report["outcome"]["verified"], false);
    assert!(!tmp.path().join("staging").exists());

    let listing = server
        .requests()
        .into_iter()
        .find(|r| r.target.starts_with("/repos/"))
        .expect("listing request");
    assert_eq!(listing.header("authorization"), Some("Bearer cli-token"));
}

#[test]
fn sync_cli_output_flag_overrides_artifact_path() {
    let server = StubServer::start();
    serve_single_file(&server);
    server.route("/published/reflex_docs.txt", 200, "# Welcome\n");
    let tmp = tempdir().unwrap();
    let config = write_config(tmp.path(), &server);
    let output = tmp.path().join("elsewhere.txt");

    Command::cargo_bin("docs-bucket")
        .unwrap()
        .arg("sync")
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .env_remove("GITHUB_TOKEN")
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&output).unwrap(), "# Welcome\n");
    assert!(!tmp.path().join("reflex_docs.txt").exists());
    let report = fs::read_to_string(tmp.path().join("report.json")).unwrap();
    assert!(report.contains("no_change"), "report: {report}");
}

#[test]
fn sync_cli_succeeds_when_report_cannot_be_written() {
    let server = StubServer::start();
    serve_single_file(&server);
    let tmp = tempdir().unwrap();
    let report = tmp.path().join("no-such-dir").join("report.json");
    let config = write_config_with_report(tmp.path(), &server, &report);

    Command::cargo_bin("docs-bucket")
        .unwrap()
        .arg("sync")
        .arg("--config")
        .arg(&config)
        .env_remove("GITHUB_TOKEN")
        .assert()
        .success()
        .stderr(predicate::str::contains("Could not write sync report"));

    assert_eq!(
        fs::read_to_string(tmp.path().join("reflex_docs.txt")).unwrap(),
        "# Welcome\n"
    );
    assert!(!report.exists());
}

#[test]
fn sync_cli_fails_when_nothing_is_retrieved() {
    // No routes: every listing returns 404.
    let server = StubServer::start();
    let tmp = tempdir().unwrap();
    let config = write_config(tmp.path(), &server);

    Command::cargo_bin("docs-bucket")
        .unwrap()
        .arg("sync")
        .arg("--config")
        .arg(&config)
        .env_remove("GITHUB_TOKEN")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Synchronisation failed"));

    assert!(!tmp.path().join("reflex_docs.txt").exists());
    assert!(!tmp.path().join("staging").exists());
}

#[test]
fn sync_cli_fails_on_missing_config() {
    Command::cargo_bin("docs-bucket")
        .unwrap()
        .arg("sync")
        .arg("--config")
        .arg("definitely-missing.yaml")
        .assert()
        .failure();
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use docs_bucket::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Sync {
            config: std::path::PathBuf::from("dummy.yaml"),
            output: None,
        },
    };

    assert!(run(cli).await.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
