//! Integration tests for the prediction surface: prediction calls, result
//! rendering, recommendations and the chat hand-off, against a fake backend.

mod common;

use serde_json::json;
use vitalis::api::types::{
    Frequency, PredictRequest, PredictionResult, QuickPredictRequest, Recommendations, Transport,
    YesNo,
};
use vitalis::api::{ApiClient, ClientError};
use vitalis::predict::{LAST_PREDICTION_KEY, PredictionSession, decode_handoff};
use vitalis::render::recommendations::recommendations_html;
use vitalis::render::{self, ResultKind, Tone};
use vitalis::storage::{FileStore, KeyValueStore, MemoryStore};

use common::{FakeBackend, Routes};

fn quick_request() -> QuickPredictRequest {
    QuickPredictRequest {
        gender: "Female".to_string(),
        age: 41,
        height: 160,
        weight: 80.0,
    }
}

fn full_request() -> PredictRequest {
    PredictRequest {
        gender: "Male".to_string(),
        age: 25,
        height: 175,
        weight: 74.2,
        family_history: YesNo::Yes,
        favc: YesNo::No,
        fcvc: 3,
        ncp: 3,
        caec: Frequency::Sometimes,
        smoke: YesNo::No,
        ch2o: 2,
        scc: YesNo::No,
        faf: 2,
        tue: 1,
        calc: Frequency::No,
        mtrans: Transport::PublicTransportation,
    }
}

fn session_for(backend: &FakeBackend) -> PredictionSession {
    PredictionSession::open(ApiClient::new(backend.url()), Box::new(MemoryStore::new()))
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

#[test]
fn quick_prediction_renders_and_is_stored() {
    let backend =
        FakeBackend::start(Routes::new().json("/quick-predict", 200, common::quick_result()));
    let dir = tempfile::tempdir().unwrap();
    let mut session =
        PredictionSession::open(ApiClient::new(backend.url()), Box::new(FileStore::new(dir.path())));

    let outcome = session.quick(&quick_request()).cloned();
    let rendered = render::render_outcome(ResultKind::Quick, &outcome);
    assert_eq!(rendered.tone, Tone::Success);
    assert!(rendered.html.contains("<strong>BMI:</strong> 31.2"));
    assert!(rendered.html.contains("Obesity Type I"));
    assert!(rendered.html.contains("%64.5"));

    assert_eq!(
        backend.requests()[0].json(),
        json!({"gender": "Female", "age": 41, "height": 160, "weight": 80.0})
    );

    let stored = FileStore::new(dir.path()).get(LAST_PREDICTION_KEY).unwrap();
    assert!(stored.is_some());
    let reopened =
        PredictionSession::open(ApiClient::new(backend.url()), Box::new(FileStore::new(dir.path())));
    assert_eq!(reopened.last(), outcome.as_ref().ok());
}

#[test]
fn incomplete_quick_input_makes_no_request() {
    let backend = FakeBackend::start(Routes::new());
    let mut session = session_for(&backend);
    let mut req = quick_request();
    req.height = 0;

    let err = session.quick(&req).unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));
    assert!(backend.requests().is_empty());
}

#[test]
fn full_prediction_lists_every_probability() {
    let backend = FakeBackend::start(Routes::new().json("/predict", 200, common::full_result()));
    let mut session = session_for(&backend);

    let result = session.full(&full_request()).unwrap().clone();
    let html = render::full_result_html(&result);

    assert_eq!(html.matches("<li>").count(), 3);
    assert!(html.contains("<li>Overweight Level I: %20.0</li>"));
    assert!(html.contains("<li>Insufficient Weight: %8.7</li>"));
    assert!(html.contains("Height: 175cm"));

    let sent = backend.requests()[0].json();
    assert_eq!(sent["family_history"], "yes");
    assert_eq!(sent["caec"], "sometimes");
    assert_eq!(sent["mtrans"], "public_transportation");

    // Fields the client does not model survive a round trip.
    assert_eq!(result.to_value()["model_version"], "2024-03");
}

#[test]
fn service_error_message_is_shown() {
    let backend = FakeBackend::start(
        Routes::new()
            .json("/quick-predict", 400, json!({"success": false, "error": "Invalid gender"}))
            .json("/predict", 200, json!({"success": false, "error": "Model not loaded"})),
    );
    let mut session = session_for(&backend);

    let outcome: Result<PredictionResult, ClientError> = session.quick(&quick_request()).cloned();
    let rendered = render::render_outcome(ResultKind::Quick, &outcome);
    assert_eq!(rendered.tone, Tone::Error);
    assert_eq!(rendered.html, "Error: Invalid gender");

    let outcome = session.full(&full_request()).cloned();
    assert!(matches!(&outcome, Err(ClientError::Api(msg)) if msg == "Model not loaded"));
    assert!(session.last().is_none());
}

#[test]
fn unreachable_service_renders_api_error() {
    let mut session =
        PredictionSession::open(ApiClient::new("http://127.0.0.1:9"), Box::new(MemoryStore::new()));
    let outcome = session.quick(&quick_request()).cloned();
    let rendered = render::render_outcome(ResultKind::Quick, &outcome);
    assert_eq!(rendered.tone, Tone::Error);
    assert!(rendered.html.starts_with("API error: "));
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[test]
fn recommendations_without_a_prediction_make_no_request() {
    let backend = FakeBackend::start(Routes::new());
    let session = session_for(&backend);

    assert!(matches!(session.recommendations(), Err(ClientError::MissingPrediction)));
    assert!(matches!(session.handoff_url("chat.html"), Err(ClientError::MissingPrediction)));
    assert!(backend.requests().is_empty());
}

#[test]
fn recommendations_send_prediction_and_input() {
    let backend = FakeBackend::start(
        Routes::new()
            .json("/quick-predict", 200, common::quick_result())
            .json(
                "/api/health-recommendations",
                200,
                json!({"success": true, "recommendations": "# Plan\n**Walk** daily\n- water\n- sleep"}),
            ),
    );
    let mut session = session_for(&backend);
    session.quick(&quick_request()).unwrap();

    let outcome = session.recommendations().unwrap();
    assert!(!outcome.fallback);

    let html = recommendations_html(&outcome.recommendations);
    assert!(html.starts_with("<h2>Plan</h2>"));
    assert!(html.contains("<strong>Walk</strong> daily"));
    assert!(html.contains("<ul><li>water</li><li>sleep</li></ul>"));

    let sent = backend.requests()[1].json();
    let expected = common::quick_result();
    assert_eq!(sent["prediction"], expected["prediction"]);
    assert_eq!(sent["user_input"], expected["input_data"]);
}

#[test]
fn structured_recommendations_are_preformatted() {
    let backend = FakeBackend::start(
        Routes::new()
            .json("/quick-predict", 200, common::quick_result())
            .json(
                "/api/health-recommendations",
                200,
                json!({"success": true, "recommendations": {"diet": ["less sugar"]}}),
            ),
    );
    let mut session = session_for(&backend);
    session.quick(&quick_request()).unwrap();

    let outcome = session.recommendations().unwrap();
    assert!(matches!(outcome.recommendations, Recommendations::Structured(_)));
    assert!(recommendations_html(&outcome.recommendations).starts_with("<pre>"));
}

#[test]
fn failed_recommendations_fall_back_to_built_in_advice() {
    let backend = FakeBackend::start(
        Routes::new()
            .json("/quick-predict", 200, common::quick_result())
            .json("/api/health-recommendations", 500, json!({"error": "Ollama not running"})),
    );
    let mut session = session_for(&backend);
    session.quick(&quick_request()).unwrap();

    let outcome = session.recommendations().unwrap();
    assert!(outcome.fallback);
    let Recommendations::Text(text) = &outcome.recommendations else {
        panic!("fallback advice is text");
    };
    assert!(text.contains("31.2"));
}

// ---------------------------------------------------------------------------
// Hand-off
// ---------------------------------------------------------------------------

#[test]
fn handoff_carries_the_last_result() {
    let backend =
        FakeBackend::start(Routes::new().json("/quick-predict", 200, common::quick_result()));
    let mut session = session_for(&backend);
    session.quick(&quick_request()).unwrap();

    let url = session.handoff_url("chat.html").unwrap();
    assert!(url.starts_with("chat.html?data="));
    assert_eq!(decode_handoff(&url).unwrap(), common::quick_result());
}
