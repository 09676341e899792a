//! End-to-end tracking against mock listing and bot endpoints.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::time::timeout;
use visa_tracker::config::{CONFIG_FILE, Workspace};
use visa_tracker::models::{PollResult, Settings};
use visa_tracker::pipeline::PollCycle;
use visa_tracker::storage::HistoryStorage;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:ABC";
const SEND_PATH: &str = "/bot123:ABC/sendMessage";

fn listing(people: i64) -> Value {
    json!([
        {"source_country": "Turkey", "mission_country": "Germany",
         "appointment_date": "2024-05-01T00:00:00Z", "center_name": "Istanbul",
         "people_looking": people, "last_checked": "2024-05-01T06:00:00Z"},
        {"source_country": "Turkey", "mission_country": "France",
         "appointment_date": "2024-05-02", "people_looking": 4},
        {"mission_country": "Germany", "appointment_date": "2024-05-03"},
        {"source_country": "Turkey", "mission_country": "Germany"},
        {"source_country": "Turkey", "mission_country": "Germany",
         "appointment_date": "2024-04-20", "people_looking": 1}
    ])
}

fn settings(send_all_updates: bool) -> Settings {
    Settings {
        telegram_token: TOKEN.into(),
        telegram_chat_id: "42".into(),
        source_country: "Turkey".into(),
        mission_country: "Germany".into(),
        check_interval: 3600,
        send_all_updates,
        ..Default::default()
    }
}

/// Storage directory whose config points both endpoints at `server`.
fn workspace(server: &MockServer) -> (TempDir, Workspace) {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join(CONFIG_FILE),
        format!(
            "[api]\nlisting_url = \"{uri}/api/visa-list/\"\ntimeout_secs = 5\n\n\
             [telegram]\napi_base = \"{uri}\"\n",
            uri = server.uri()
        ),
    )
    .unwrap();
    let ws = Workspace::open(tmp.path()).unwrap();
    (tmp, ws)
}

async fn mount_listing(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/visa-list/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn first_result(
    results: &mut tokio::sync::mpsc::UnboundedReceiver<PollResult>,
) -> PollResult {
    timeout(Duration::from_secs(10), results.recv())
        .await
        .expect("no result within 10s")
        .expect("result channel closed")
}

#[tokio::test]
async fn test_cycles_filter_diff_and_persist() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/visa-list/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(12)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_listing(&server, listing(20)).await;

    let (_tmp, ws) = workspace(&server);
    let settings = settings(false);
    let cycle = PollCycle::new(
        Arc::new(ws.listing_source().unwrap()),
        ws.history().await,
        &settings,
        &ws.config.display,
    )
    .unwrap();

    let first = cycle.run().await;
    assert!(!first.is_error(), "{:?}", first.error());
    let dates: Vec<&str> = first
        .appointments()
        .iter()
        .map(|a| a.snapshot.date.as_str())
        .collect();
    assert_eq!(dates, vec!["20.04.2024", "01.05.2024"]);
    assert!(first.appointments().iter().all(|a| {
        a.key.source_country == "Turkey"
            && a.key.mission_country == "Germany"
            && a.people_looking_change.is_none()
    }));
    assert_eq!(first.api_last_checked.as_deref(), Some("01.05.2024 - 09:00:00"));

    let second = cycle.run().await;
    assert_eq!(second.last_check.as_deref(), Some(first.current_time.as_str()));
    let may = &second.appointments()[1];
    assert_eq!(may.snapshot.date, "01.05.2024");
    assert_eq!(may.snapshot.people_looking, 20);
    assert_eq!(may.people_looking_change, Some(8));
    assert_eq!(second.appointments()[0].people_looking_change, None);

    let saved = ws.storage.load_history().await.unwrap().unwrap();
    assert_eq!(
        saved.appointments["Turkey_Germany_2024-05-01"].people_looking,
        20
    );
    assert_eq!(saved.len(), 2);
}

#[tokio::test]
async fn test_unchanged_listing_reports_no_changes() {
    let server = MockServer::start().await;
    mount_listing(&server, listing(12)).await;

    let (_tmp, ws) = workspace(&server);
    let settings = settings(false);
    let cycle = PollCycle::new(
        Arc::new(ws.listing_source().unwrap()),
        ws.history().await,
        &settings,
        &ws.config.display,
    )
    .unwrap();

    cycle.run().await;
    let again = cycle.run().await;
    assert_eq!(again.appointments().len(), 2);
    assert!(
        again
            .appointments()
            .iter()
            .all(|a| a.people_looking_change.is_none())
    );
}

#[tokio::test]
async fn test_empty_result_suppressed_without_send_all() {
    let server = MockServer::start().await;
    mount_listing(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(0)
        .mount(&server)
        .await;

    let (_tmp, ws) = workspace(&server);
    let (mut tracker, mut results) = ws.tracker(settings(false)).await.unwrap();
    tracker.start_tracking().unwrap();

    let result = first_result(&mut results).await;
    tracker.stop_tracking().await;

    assert!(!result.is_error());
    assert!(result.appointments().is_empty());
    assert!(tracker.notifier().last_sent().is_none());
}

#[tokio::test]
async fn test_empty_result_sent_once_with_send_all() {
    let server = MockServer::start().await;
    mount_listing(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (_tmp, ws) = workspace(&server);
    let (mut tracker, mut results) = ws.tracker(settings(true)).await.unwrap();
    tracker.start_tracking().unwrap();
    first_result(&mut results).await;
    tracker.stop_tracking().await;

    let requests = server.received_requests().await.unwrap();
    let sends: Vec<Value> = requests
        .iter()
        .filter(|r| r.url.path() == SEND_PATH)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0]["chat_id"], "42");
    assert_eq!(sends[0]["parse_mode"], "HTML");
    let text = sends[0]["text"].as_str().unwrap();
    assert!(text.ends_with("❌ No appointments are currently available."));
}

#[tokio::test]
async fn test_listing_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/visa-list/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (_tmp, ws) = workspace(&server);
    let (mut tracker, mut results) = ws.tracker(settings(false)).await.unwrap();
    tracker.start_tracking().unwrap();
    let result = first_result(&mut results).await;
    tracker.stop_tracking().await;

    assert!(result.is_error());
    assert!(result.error().unwrap().contains("502"));
}

#[tokio::test]
async fn test_stop_returns_promptly_and_emits_nothing_after() {
    let server = MockServer::start().await;
    mount_listing(&server, listing(3)).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let (_tmp, ws) = workspace(&server);
    let (mut tracker, mut results) = ws.tracker(settings(true)).await.unwrap();
    tracker.start_tracking().unwrap();
    first_result(&mut results).await;

    let started = Instant::now();
    tracker.stop_tracking().await;
    assert!(started.elapsed() <= Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(results.try_recv().is_err());
}
