/// HTTP client for the health-prediction service.
///
/// Wraps a synchronous `ureq` agent bound to one base URL. Every call is a
/// single attempt: no retry, no auth, and no timeout unless `api.timeout_ms`
/// is set. Failures are mapped onto [`ClientError`] so callers can turn
/// them into inline messages.
///
/// Endpoints:
///
/// - `GET  /`: health probe
/// - `POST /quick-predict`, `POST /predict`: predictions
/// - `POST /api/health-recommendations`
/// - `GET  /api/chat/status`
/// - `POST /api/chat`: non-streaming chat
/// - `POST /api/chat/stream`: `data: <json>` line stream
use std::io::Read;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod error;
pub mod types;

pub use error::ClientError;
use types::{
    ChatRequest, ChatResponse, ChatStatusResponse, ErrorBody, HealthProbe, PredictRequest,
    Prediction, PredictionResult, QuickPredictRequest, Recommendations, RecommendationsRequest,
    RecommendationsResponse,
};

use crate::config::schema::ApiConfig;

/// Byte stream returned by the streaming chat endpoint.
pub type ChatStream = Box<dyn Read + Send + Sync + 'static>;

/// Synchronous client for the prediction service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    agent: ureq::Agent,
}

impl ApiClient {
    /// Build a client for `base_url` with the HTTP stack's default timeouts.
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, None)
    }

    /// Build a client with an optional overall request timeout.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: builder.build(),
        }
    }

    /// Build a client from the resolved `[api]` config section.
    pub fn from_config(config: &ApiConfig) -> Self {
        let timeout = (config.timeout_ms > 0).then(|| Duration::from_millis(config.timeout_ms));
        Self::with_timeout(&config.base_url, timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // -- Prediction ---------------------------------------------------------

    /// `GET /`: is the service up and is the model loaded?
    pub fn health(&self) -> Result<HealthProbe, ClientError> {
        let resp = self.agent.get(&self.url("/")).call().map_err(map_ureq_error)?;
        decode(resp)
    }

    /// `POST /quick-predict` with the four basic fields.
    pub fn quick_predict(&self, req: &QuickPredictRequest) -> Result<PredictionResult, ClientError> {
        self.predict_at("/quick-predict", req)
    }

    /// `POST /predict` with the full feature set.
    pub fn predict(&self, req: &PredictRequest) -> Result<PredictionResult, ClientError> {
        self.predict_at("/predict", req)
    }

    fn predict_at<T: Serialize>(&self, path: &str, body: &T) -> Result<PredictionResult, ClientError> {
        let value: Value = self.post_json(path, body)?;
        if !value.get("success").and_then(Value::as_bool).unwrap_or(false) {
            return Err(ClientError::Api(error_message(&value, "prediction failed")));
        }
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// `POST /api/health-recommendations` for a prior prediction.
    pub fn recommendations(
        &self,
        prediction: &Prediction,
        user_input: &Option<Value>,
    ) -> Result<Recommendations, ClientError> {
        let body = RecommendationsRequest {
            prediction,
            user_input,
        };
        let parsed: RecommendationsResponse =
            self.post_json("/api/health-recommendations", &body)?;
        if !parsed.success {
            return Err(ClientError::Api(
                parsed
                    .error
                    .unwrap_or_else(|| "could not fetch recommendations".to_string()),
            ));
        }
        Ok(Recommendations::from(parsed.recommendations))
    }

    // -- Chat ---------------------------------------------------------------

    /// `GET /api/chat/status`.
    pub fn chat_status(&self) -> Result<ChatStatusResponse, ClientError> {
        let resp = self
            .agent
            .get(&self.url("/api/chat/status"))
            .call()
            .map_err(map_ureq_error)?;
        decode(resp)
    }

    /// `POST /api/chat`: one complete assistant reply.
    pub fn chat(&self, req: &ChatRequest<'_>) -> Result<String, ClientError> {
        let parsed: ChatResponse = self.post_json("/api/chat", req)?;
        match (parsed.success, parsed.response) {
            (true, Some(text)) => Ok(text),
            (true, None) => Err(ClientError::Decode("missing `response` field".to_string())),
            (false, _) => Err(ClientError::Api(
                parsed.error.unwrap_or_else(|| "API error".to_string()),
            )),
        }
    }

    /// `POST /api/chat/stream`: returns the raw response body once the
    /// status line says 2xx. Parsing is the caller's job.
    pub fn chat_stream(&self, req: &ChatRequest<'_>) -> Result<ChatStream, ClientError> {
        let resp = self
            .agent
            .post(&self.url("/api/chat/stream"))
            .set("Accept", "text/event-stream")
            .send_json(req)
            .map_err(map_ureq_error)?;
        Ok(resp.into_reader())
    }

    // -- Helpers ------------------------------------------------------------

    fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, ClientError> {
        let resp = self
            .agent
            .post(&self.url(path))
            .send_json(body)
            .map_err(map_ureq_error)?;
        decode(resp)
    }
}

fn decode<R: DeserializeOwned>(resp: ureq::Response) -> Result<R, ClientError> {
    resp.into_json()
        .map_err(|e| ClientError::Decode(e.to_string()))
}

/// Translate a ureq failure. Non-2xx bodies carrying `{"error": ...}` are
/// reported as application errors so the service's message reaches the user.
fn map_ureq_error(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(code, resp) => match resp.into_json::<ErrorBody>() {
            Ok(ErrorBody { error: Some(msg) }) if !msg.is_empty() => ClientError::Api(msg),
            _ => ClientError::Status(code),
        },
        ureq::Error::Transport(t) => ClientError::Transport(t.to_string()),
    }
}

fn error_message(value: &Value, fallback: &str) -> String {
    value
        .get("error")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
