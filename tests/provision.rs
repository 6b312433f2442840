mod helper;

use std::path::Path;
use std::sync::Arc;

use mockito::Server;
use serde_json::json;

use helper::sources::{mock_feed, mock_latest, sources_config};
use helper::worker::{FakeWorker, arg_value};
use template_provisioner::config::ProvisionConfig;
use template_provisioner::progress::{ProgressBus, ProgressEvent};
use template_provisioner::provision::{ProvisionError, ProvisionRequest, Provisioner};
use template_provisioner::version::cache::VersionCache;
use template_provisioner::version::error::ResolveError;
use template_provisioner::version::resolver::TagResolver;
use template_provisioner::worker::error::ExtractionError;

fn provisioner(server: &Server, worker: &FakeWorker) -> Provisioner {
    let cache = Arc::new(VersionCache::new());
    let resolver =
        TagResolver::from_config(cache.clone(), reqwest::Client::new(), &sources_config(server));
    let supervisor = worker.supervisor(cache.clone(), ProgressBus::new());
    Provisioner::new(cache, resolver, supervisor)
}

fn request() -> ProvisionRequest {
    ProvisionRequest::for_user_data_dir(
        "30.1.0",
        Path::new("/tmp/provision-test"),
        &ProvisionConfig::default(),
    )
}

const SUCCESSFUL_WORKER: &str = r#"echo '{"progress":{"pct":0}}'
echo '{"templateInfo":{"version":"2.0.0","files":12}}'
echo '{"progress":{"pct":100}}'
exit 0"#;

#[tokio::test]
async fn provision_resolves_stable_tag_and_installs_it() {
    let mut server = Server::new_async().await;
    let latest = mock_latest(&mut server, "2.0.0", 1).await;
    let worker = FakeWorker::new(SUCCESSFUL_WORKER);
    let provisioner = provisioner(&server, &worker);
    let mut progress = provisioner.subscribe();

    let version = provisioner.provision(false, request()).await.unwrap();

    latest.assert_async().await;
    assert_eq!(version, "2.0.0");

    let runs = worker.runs();
    assert_eq!(arg_value(&runs[0], "--tagName"), Some("v2.0.0"));
    assert_eq!(arg_value(&runs[0], "--templateInfoJson"), None);
    assert_eq!(
        arg_value(&runs[0], "--templatePath"),
        Some("/tmp/provision-test/template")
    );

    assert_eq!(progress.try_recv().unwrap(), ProgressEvent(json!({"pct": 0})));
    assert_eq!(
        progress.try_recv().unwrap(),
        ProgressEvent(json!({"pct": 100}))
    );
}

#[tokio::test]
async fn provision_uses_feed_when_prerelease_allowed() {
    let mut server = Server::new_async().await;
    let feed = mock_feed(
        &mut server,
        &[
            "tag:github.com,2008:Repository/123/v2.1.0",
            "tag:github.com,2008:Repository/123/v2.0.0",
        ],
        1,
    )
    .await;
    let latest = mock_latest(&mut server, "2.0.0", 0).await;
    let worker = FakeWorker::new("exit 0");
    let provisioner = provisioner(&server, &worker);

    provisioner.provision(true, request()).await.unwrap();

    feed.assert_async().await;
    latest.assert_async().await;
    assert_eq!(arg_value(&worker.runs()[0], "--tagName"), Some("v2.1.0"));
}

#[tokio::test]
async fn second_provision_reuses_cached_tag_and_template_info() {
    let mut server = Server::new_async().await;
    let latest = mock_latest(&mut server, "2.0.0", 1).await;
    let worker = FakeWorker::new(SUCCESSFUL_WORKER);
    let provisioner = provisioner(&server, &worker);

    provisioner.provision(false, request()).await.unwrap();
    provisioner.provision(false, request()).await.unwrap();

    latest.assert_async().await;
    let runs = worker.runs();
    assert_eq!(runs.len(), 2);
    assert_eq!(arg_value(&runs[1], "--tagName"), Some("v2.0.0"));

    let cached: serde_json::Value =
        serde_json::from_str(arg_value(&runs[1], "--templateInfoJson").unwrap()).unwrap();
    assert_eq!(cached, json!({"version": "2.0.0", "files": 12}));
}

#[tokio::test]
async fn force_extract_is_sent_until_first_success() {
    let mut server = Server::new_async().await;
    let _latest = mock_latest(&mut server, "2.0.0", 1).await;
    // Fails on the first run only
    let worker = FakeWorker::new(
        r#"if [ -e '{dir}/failed-once' ]; then exit 0; fi
: > '{dir}/failed-once'
exit 1"#,
    );
    let provisioner = provisioner(&server, &worker);
    assert!(provisioner.force_extract());

    assert!(provisioner.provision(false, request()).await.is_err());
    assert!(provisioner.force_extract());

    provisioner.provision(false, request()).await.unwrap();
    assert!(!provisioner.force_extract());

    provisioner.provision(false, request()).await.unwrap();
    assert_eq!(worker.force_flags(), vec!["true", "true", "false"]);
}

#[tokio::test]
async fn worker_error_reaches_caller_unchanged() {
    let mut server = Server::new_async().await;
    let _latest = mock_latest(&mut server, "2.0.0", 1).await;
    let worker = FakeWorker::new(
        r#"echo '{"error":{"message":"disk full","name":"IOError","stack":"IOError: disk full"}}'
exit 1"#,
    );
    let provisioner = provisioner(&server, &worker);

    let err = provisioner.provision(false, request()).await.unwrap_err();

    let ProvisionError::Extraction(ExtractionError::WorkerReported { name, message, .. }) = err
    else {
        panic!("expected a reported worker error");
    };
    assert_eq!(name, "IOError");
    assert_eq!(message, "disk full");
    assert!(provisioner.force_extract());
}

#[tokio::test]
async fn resolution_failure_does_not_spawn_worker() {
    let mut server = Server::new_async().await;
    let latest = server
        .mock("GET", helper::sources::LATEST_PATH)
        .with_status(503)
        .create_async()
        .await;
    let worker = FakeWorker::new("exit 0");
    let provisioner = provisioner(&server, &worker);

    let err = provisioner.provision(false, request()).await.unwrap_err();

    latest.assert_async().await;
    assert!(matches!(
        err,
        ProvisionError::Resolve(ResolveError::InvalidResponse(_))
    ));
    assert!(worker.runs().is_empty());
    assert!(provisioner.force_extract());
}
