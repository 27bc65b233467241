//! Integration tests for the assistant status indicator and the health
//! probe, against a fake backend.

mod common;

use std::net::TcpListener;
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use serde_json::json;
use vitalis::api::ApiClient;
use vitalis::status::{self, StatusPoller};

use common::{FakeBackend, Routes};

fn status_backend(success: bool, ollama_running: bool, model_available: bool) -> FakeBackend {
    FakeBackend::start(Routes::new().json(
        "/api/chat/status",
        200,
        json!({
            "success": success,
            "status": {"ollama_running": ollama_running, "model_available": model_available}
        }),
    ))
}

fn label_for(backend: &FakeBackend) -> (bool, String) {
    let indicator = status::check(&ApiClient::new(backend.url()));
    (indicator.healthy, indicator.label)
}

#[test]
fn each_service_state_has_its_own_indicator() {
    let online = label_for(&status_backend(true, true, true));
    let loading = label_for(&status_backend(true, true, false));
    let down = label_for(&status_backend(true, false, false));
    let failed = label_for(&status_backend(false, true, true));

    assert_eq!(online, (true, status::LABEL_ONLINE.to_string()));
    assert_eq!(loading, (false, status::LABEL_MODEL_LOADING.to_string()));
    assert_eq!(down, (false, status::LABEL_UNREACHABLE.to_string()));
    assert_eq!(failed, (false, status::LABEL_SERVICE_ERROR.to_string()));
}

#[test]
fn http_failure_is_a_connection_error() {
    let backend = FakeBackend::start(Routes::new().json("/api/chat/status", 502, json!({})));
    assert_eq!(
        label_for(&backend),
        (false, status::LABEL_CONNECTION_ERROR.to_string())
    );
}

#[test]
fn health_probe_warnings() {
    let ready = FakeBackend::start(Routes::new().json(
        "/",
        200,
        json!({"message": "Obesity prediction API", "model_loaded": true}),
    ));
    let probe = ApiClient::new(ready.url()).health();
    assert_eq!(status::probe_warning(&probe), None);

    let no_model =
        FakeBackend::start(Routes::new().json("/", 200, json!({"model_loaded": false})));
    let probe = ApiClient::new(no_model.url()).health();
    assert!(status::probe_warning(&probe).unwrap().contains("Model could not be loaded"));

    let probe = ApiClient::new("http://127.0.0.1:9").health();
    assert!(status::probe_warning(&probe).unwrap().contains("Cannot reach the API"));
}

#[test]
fn poller_checks_repeatedly_until_dropped() {
    let backend = status_backend(true, true, true);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let poller = StatusPoller::spawn(
        ApiClient::new(backend.url()),
        Duration::from_millis(20),
        move |indicator| sink.lock().unwrap().push(indicator),
    );

    let deadline = Instant::now() + Duration::from_secs(10);
    while seen.lock().unwrap().len() < 3 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    drop(poller);

    let count = seen.lock().unwrap().len();
    assert!(count >= 3, "only {count} checks ran");
    assert!(seen.lock().unwrap().iter().all(|i| i.healthy));

    // A check already in flight at drop time may still report once.
    std::thread::sleep(Duration::from_millis(100));
    let settled = seen.lock().unwrap().len();
    assert!(settled <= count + 1);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(seen.lock().unwrap().len(), settled, "poller kept running after drop");
}

#[test]
fn dropping_poller_does_not_wait_for_a_hung_check() {
    // Accepts connections and never answers.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let held = Arc::new(Mutex::new(Vec::new()));
    {
        let held = Arc::clone(&held);
        std::thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                held.lock().unwrap().push(stream);
            }
        });
    }

    let poller = StatusPoller::spawn(ApiClient::new(&url), Duration::from_secs(30), |_| {});
    let deadline = Instant::now() + Duration::from_secs(5);
    while held.lock().unwrap().is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(!held.lock().unwrap().is_empty(), "status check never connected");

    let (done_tx, done_rx) = mpsc::channel();
    std::thread::spawn(move || {
        drop(poller);
        let _ = done_tx.send(());
    });
    assert!(
        done_rx.recv_timeout(Duration::from_secs(2)).is_ok(),
        "dropping the poller blocked on the pending check"
    );
}
