//! Framework content fetched over HTTP.

mod common;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{framework, framework_yaml, TestHarness};
use scopekeeper::client::memory::Operation;
use scopekeeper::{ContentError, ReconcileError};

#[tokio::test]
async fn test_create_fetches_content_over_http() {
    let server = MockServer::start().await;
    let body = framework_yaml("pci-lite", "PCI Lite");
    Mock::given(method("GET"))
        .and(path("/frameworks/pci-lite.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let harness = TestHarness::new();
    let url = format!("{}/frameworks/pci-lite.yaml", server.uri());
    let applied = harness
        .frameworks()
        .create(&framework("s1", &url), None)
        .await
        .unwrap();

    let mrn = applied.state.get_str("mrn").unwrap();
    assert_eq!(mrn, "//captain.api.mondoo.app/spaces/s1/frameworks/pci-lite");
    assert_eq!(applied.state.get_str("data_url"), Some(url.as_str()));
    assert_eq!(harness.service.framework_content(mrn).unwrap(), body.into_bytes());
}

#[tokio::test]
async fn test_http_error_status_fails_before_upload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let harness = TestHarness::new();
    let url = format!("{}/missing.yaml", server.uri());
    let err = harness
        .frameworks()
        .create(&framework("s1", &url), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Content(ContentError::Fetch { .. })));
    assert!(!harness.service.calls().contains(&Operation::UploadFramework));
}

#[tokio::test]
async fn test_content_without_frameworks_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("frameworks: []\n"))
        .mount(&server)
        .await;

    let harness = TestHarness::new();
    let err = harness
        .frameworks()
        .create(&framework("s1", &format!("{}/empty.yaml", server.uri())), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Content(ContentError::NoFramework)));
}

#[tokio::test]
async fn test_update_uploads_new_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(framework_yaml("soc", "SOC v1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(framework_yaml("soc", "SOC v2")))
        .mount(&server)
        .await;

    let harness = TestHarness::new();
    let controller = harness.frameworks();
    let created = controller
        .create(&framework("s1", &format!("{}/v1.yaml", server.uri())), None)
        .await
        .unwrap()
        .state;

    let v2 = format!("{}/v2.yaml", server.uri());
    let updated = controller
        .update(&created.clone().with("data_url", v2.as_str()), None)
        .await
        .unwrap()
        .state;

    assert_eq!(updated.get_str("mrn"), created.get_str("mrn"));
    let content = harness
        .service
        .framework_content(updated.get_str("mrn").unwrap())
        .unwrap();
    assert!(String::from_utf8(content).unwrap().contains("SOC v2"));
}
