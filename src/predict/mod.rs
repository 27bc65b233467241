/// Prediction session.
///
/// Holds the most recent [`PredictionResult`] for the actions that build on
/// it (recommendations, chat hand-off). The result is also written to the
/// `last_prediction` storage key so a later invocation can pick it up.
use serde_json::Value;
use tracing::{info, warn};

use crate::api::types::{PredictRequest, PredictionResult, QuickPredictRequest, Recommendations};
use crate::api::{ApiClient, ClientError};
use crate::render::recommendations::fallback_recommendations;
use crate::storage::KeyValueStore;

/// Storage key for the last successful prediction.
pub const LAST_PREDICTION_KEY: &str = "last_prediction";

/// Query parameter carrying the hand-off payload.
const HANDOFF_PARAM: &str = "data";

/// Where recommendations came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationsOutcome {
    pub recommendations: Recommendations,
    /// True when the service failed and canned advice is shown instead.
    pub fallback: bool,
}

pub struct PredictionSession {
    client: ApiClient,
    store: Box<dyn KeyValueStore>,
    last: Option<PredictionResult>,
}

impl PredictionSession {
    /// Open a session, restoring the last stored prediction if readable.
    pub fn open(client: ApiClient, store: Box<dyn KeyValueStore>) -> Self {
        let last = match store.get(LAST_PREDICTION_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .inspect_err(|e| warn!("discarding unreadable last prediction: {e}"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!("could not read last prediction: {e:#}");
                None
            }
        };
        Self {
            client,
            store,
            last,
        }
    }

    pub fn last(&self) -> Option<&PredictionResult> {
        self.last.as_ref()
    }

    /// `POST /quick-predict`. Incomplete input is rejected locally.
    pub fn quick(&mut self, req: &QuickPredictRequest) -> Result<&PredictionResult, ClientError> {
        if !req.is_complete() {
            return Err(ClientError::InvalidInput(
                "Please fill in the basic information (gender, age, height, weight)!".to_string(),
            ));
        }
        let result = self.client.quick_predict(req)?;
        Ok(self.remember(result))
    }

    /// `POST /predict` with the full feature set.
    pub fn full(&mut self, req: &PredictRequest) -> Result<&PredictionResult, ClientError> {
        let result = self.client.predict(req)?;
        Ok(self.remember(result))
    }

    fn remember(&mut self, result: PredictionResult) -> &PredictionResult {
        info!(
            class = %result.prediction.predicted_class,
            bmi = result.prediction.bmi,
            "prediction stored"
        );
        match serde_json::to_string(&result) {
            Ok(raw) => {
                if let Err(e) = self.store.set(LAST_PREDICTION_KEY, &raw) {
                    warn!("could not store last prediction: {e:#}");
                }
            }
            Err(e) => warn!("could not serialize last prediction: {e}"),
        }
        self.last.insert(result)
    }

    /// Recommendations for the last prediction, falling back to canned
    /// advice when the service call fails for any reason.
    pub fn recommendations(&self) -> Result<RecommendationsOutcome, ClientError> {
        let last = self.last.as_ref().ok_or(ClientError::MissingPrediction)?;

        match self
            .client
            .recommendations(&last.prediction, &last.input_data)
        {
            Ok(recommendations) => Ok(RecommendationsOutcome {
                recommendations,
                fallback: false,
            }),
            Err(e) => {
                warn!("recommendations unavailable, using built-in advice: {e}");
                Ok(RecommendationsOutcome {
                    recommendations: fallback_recommendations(
                        &last.prediction.predicted_class,
                        last.prediction.bmi,
                    ),
                    fallback: true,
                })
            }
        }
    }

    /// Link to the chat page carrying the last result as JSON.
    pub fn handoff_url(&self, chat_page: &str) -> Result<String, ClientError> {
        let last = self.last.as_ref().ok_or(ClientError::MissingPrediction)?;
        Ok(encode_handoff(chat_page, &last.to_value()))
    }
}

/// `<page>?data=<url-encoded json>`.
pub fn encode_handoff(chat_page: &str, payload: &Value) -> String {
    let json = payload.to_string();
    let sep = if chat_page.contains('?') { '&' } else { '?' };
    format!(
        "{chat_page}{sep}{HANDOFF_PARAM}={}",
        urlencoding::encode(&json)
    )
}

/// Recover the hand-off payload from a full link or a bare encoded value.
pub fn decode_handoff(input: &str) -> Result<Value, ClientError> {
    let input = input.trim();
    let encoded = match input.split_once('?') {
        Some((_, query)) => query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{HANDOFF_PARAM}=")))
            .ok_or_else(|| ClientError::InvalidInput("link has no `data` parameter".to_string()))?,
        None => input,
    };

    let json = urlencoding::decode(encoded)
        .map_err(|e| ClientError::InvalidInput(format!("hand-off data is not valid UTF-8: {e}")))?;
    serde_json::from_str(&json)
        .map_err(|e| ClientError::InvalidInput(format!("hand-off data is not valid JSON: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
