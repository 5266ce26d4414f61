use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cnpj_etl_console::control::poller::StatusPoller;
use cnpj_etl_console::remote::client::ApiClient;
use cnpj_etl_console::remote::models::JobState;

const FAST_INTERVAL: Duration = Duration::from_millis(30);

fn status_body(state: &str, progress: f64) -> serde_json::Value {
    json!({
        "job_id": "etl_20260825_090000",
        "status": state,
        "progress_percent": progress,
        "files_processed": 3,
        "files_total": 37,
        "records_imported": 1000
    })
}

async fn mount_once(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/etl/status"))
        .respond_with(template)
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .len()
}

fn client_for(server: &MockServer) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(server.uri(), Some("tok".to_string())).expect("client builds"))
}

#[tokio::test]
async fn polling_stops_after_a_terminal_state() {
    let server = MockServer::start().await;
    mount_once(
        &server,
        ResponseTemplate::new(200).set_body_json(status_body("running", 42.0)),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/etl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("completed", 100.0)))
        .mount(&server)
        .await;

    let poller = StatusPoller::spawn(client_for(&server), FAST_INTERVAL);
    let last = poller.join().await;

    let status = last.status.expect("final status present");
    assert_eq!(status.state, JobState::Completed);
    assert_eq!(status.progress_percent, 100.0);
    assert_eq!(last.last_error, None);
    // initial fetch saw "running", one armed re-fetch saw "completed"
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn a_failed_tick_keeps_polling_until_terminal() {
    let server = MockServer::start().await;
    mount_once(
        &server,
        ResponseTemplate::new(200).set_body_json(status_body("running", 42.0)),
    )
    .await;
    mount_once(
        &server,
        ResponseTemplate::new(502).set_body_string("bad gateway"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/etl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("completed", 100.0)))
        .mount(&server)
        .await;

    let poller = StatusPoller::spawn(client_for(&server), FAST_INTERVAL);
    let last = poller.join().await;

    let status = last.status.expect("final status present");
    assert_eq!(status.state, JobState::Completed);
    // the successful final tick clears the recorded error
    assert_eq!(last.last_error, None);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn an_idle_job_disarms_after_the_initial_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/etl/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"job_id": "none", "status": "idle"})),
        )
        .mount(&server)
        .await;

    let poller = StatusPoller::spawn(client_for(&server), FAST_INTERVAL);
    let last = poller.join().await;

    assert_eq!(last.status.expect("status present").state, JobState::Idle);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn an_error_on_the_initial_fetch_ends_with_the_error_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/etl/status"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "db down"})))
        .mount(&server)
        .await;

    let poller = StatusPoller::spawn(client_for(&server), FAST_INTERVAL);
    let last = poller.join().await;

    // never armed, so one fetch and done, with the failure visible
    assert_eq!(last.status, None);
    assert!(last.last_error.expect("error recorded").contains("db down"));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn shutdown_stops_all_further_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/etl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("running", 10.0)))
        .mount(&server)
        .await;

    let poller = StatusPoller::spawn(client_for(&server), Duration::from_millis(25));
    tokio::time::sleep(Duration::from_millis(80)).await;
    poller.shutdown().await;

    let at_shutdown = request_count(&server).await;
    assert!(at_shutdown >= 2, "poller should have fetched repeatedly");

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(request_count(&server).await, at_shutdown);
}

#[tokio::test]
async fn observers_see_the_terminal_snapshot() {
    let server = MockServer::start().await;
    mount_once(
        &server,
        ResponseTemplate::new(200).set_body_json(status_body("running", 42.0)),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/etl/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("completed", 100.0)))
        .mount(&server)
        .await;

    let poller = StatusPoller::spawn(client_for(&server), FAST_INTERVAL);
    let mut snapshots = poller.subscribe();

    let mut seen = Vec::new();
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        if let Some(status) = snapshot.status {
            seen.push(status.state);
        }
    }

    assert_eq!(seen.last(), Some(&JobState::Completed));
    let last = poller.join().await;
    assert_eq!(last.status.expect("status present").state, JobState::Completed);
}
