//! Request and response bodies for the prediction service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Prediction input
// ---------------------------------------------------------------------------

/// Body for `POST /quick-predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickPredictRequest {
    pub gender: String,
    pub age: u32,
    /// Height in centimetres.
    pub height: u32,
    /// Weight in kilograms.
    pub weight: f64,
}

impl QuickPredictRequest {
    /// Basic fields must all be present and non-zero.
    pub fn is_complete(&self) -> bool {
        !self.gender.trim().is_empty() && self.age > 0 && self.height > 0 && self.weight > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    Yes,
    No,
}

/// Answers for the "how often" questions (snacking, alcohol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    No,
    Sometimes,
    Frequently,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    PublicTransportation,
    Walking,
    Automobile,
    Motorbike,
    Bike,
}

/// Body for `POST /predict`: basic fields plus lifestyle features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub gender: String,
    pub age: u32,
    pub height: u32,
    pub weight: f64,
    pub family_history: YesNo,
    /// Frequent consumption of high-calorie food.
    pub favc: YesNo,
    /// Vegetable consumption, 1-3.
    pub fcvc: u8,
    /// Main meals per day, 1-4.
    pub ncp: u8,
    /// Eating between meals.
    pub caec: Frequency,
    pub smoke: YesNo,
    /// Daily water, 1-3.
    pub ch2o: u8,
    /// Calorie monitoring.
    pub scc: YesNo,
    /// Physical activity, 0-3.
    pub faf: u8,
    /// Time on devices, 0-2.
    pub tue: u8,
    /// Alcohol.
    pub calc: Frequency,
    pub mtrans: Transport,
}

// ---------------------------------------------------------------------------
// Prediction output
// ---------------------------------------------------------------------------

/// Model output for a single prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub bmi: f64,
    pub predicted_class: String,
    pub confidence: f64,
    /// Class name → percentage. Only present for full predictions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_probabilities: Option<BTreeMap<String, f64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A successful prediction response.
///
/// The typed fields are what the renderers need; everything else the
/// service sends is kept in `extra` so the result re-serializes unchanged
/// when handed to the recommendations call or the chat context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(default = "default_true")]
    pub success: bool,
    pub prediction: Prediction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl PredictionResult {
    /// The result as an opaque JSON value (used as chat context).
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Echoed input on a full prediction, read leniently for display.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputEcho {
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub gender: Option<Value>,
    #[serde(default)]
    pub height: Option<Value>,
    #[serde(default)]
    pub weight: Option<Value>,
}

// ---------------------------------------------------------------------------
// Service health
// ---------------------------------------------------------------------------

/// Response of `GET /`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthProbe {
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `GET /api/chat/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatStatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub status: ChatServiceStatus,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ChatServiceStatus {
    #[serde(default)]
    pub ollama_running: bool,
    #[serde(default)]
    pub model_available: bool,
}

// ---------------------------------------------------------------------------
// Recommendations and chat
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct RecommendationsRequest<'a> {
    pub prediction: &'a Prediction,
    pub user_input: &'a Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub recommendations: Value,
    #[serde(default)]
    pub error: Option<String>,
}

/// Recommendations payload: usually markup text, occasionally structured.
#[derive(Debug, Clone, PartialEq)]
pub enum Recommendations {
    Text(String),
    Structured(Value),
}

impl From<Value> for Recommendations {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }
}

/// Body for `POST /api/chat` and `POST /api/chat/stream`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub context: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Generic `{error}` body used when a request fails with a non-2xx status.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
