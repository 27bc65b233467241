/// Result rendering for the prediction surface.
///
/// Maps prediction payloads to HTML fragments (the form page's result box)
/// and to terminal text for the CLI. Numbers from the service are shown as
/// they arrive; class probabilities are always shown with one decimal place.
pub mod recommendations;

use colored::Colorize;
use serde_json::Value;

use crate::api::ClientError;
use crate::api::types::{InputEcho, PredictionResult};
use crate::markup::html::escape;

/// Which endpoint produced a result; decides the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Quick,
    Full,
}

/// Outcome class of a result box (`result success` / `result error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
}

/// A rendered result box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultBox {
    pub tone: Tone,
    pub html: String,
}

impl ResultBox {
    /// Wrap the fragment in its container element.
    pub fn to_container_html(&self) -> String {
        let class = match self.tone {
            Tone::Success => "result success",
            Tone::Error => "result error",
        };
        format!("<div id=\"result\" class=\"{class}\">{}</div>", self.html)
    }
}

/// Render a prediction outcome, success or failure.
pub fn render_outcome(kind: ResultKind, outcome: &Result<PredictionResult, ClientError>) -> ResultBox {
    match outcome {
        Ok(result) => ResultBox {
            tone: Tone::Success,
            html: match kind {
                ResultKind::Quick => quick_result_html(result),
                ResultKind::Full => full_result_html(result),
            },
        },
        Err(err) => ResultBox {
            tone: Tone::Error,
            html: escape(&error_text(err)),
        },
    }
}

/// User-facing text for a failed prediction call.
pub fn error_text(err: &ClientError) -> String {
    match err {
        ClientError::Api(msg) => format!("Error: {msg}"),
        ClientError::InvalidInput(msg) => msg.clone(),
        ClientError::MissingPrediction => err.to_string(),
        other => format!("API error: {other}"),
    }
}

/// Fragment for `/quick-predict`.
pub fn quick_result_html(result: &PredictionResult) -> String {
    let p = &result.prediction;
    format!(
        "<h3>🎯 Quick Prediction Result</h3>\
         <p><strong>BMI:</strong> {}</p>\
         <p><strong>Prediction:</strong> {}</p>\
         <p><strong>Confidence:</strong> %{}</p>\
         <p><em>This prediction uses basic information only. Use the detailed prediction for a more precise result.</em></p>",
        p.bmi,
        escape(&p.predicted_class),
        p.confidence,
    )
}

/// Fragment for `/predict`, including the probability list.
pub fn full_result_html(result: &PredictionResult) -> String {
    let p = &result.prediction;

    let mut html = format!(
        "<h3>🎯 Detailed Prediction Result</h3>\
         <p><strong>BMI:</strong> {}</p>\
         <p><strong>Main prediction:</strong> {}</p>\
         <p><strong>Confidence:</strong> %{}</p>",
        p.bmi,
        escape(&p.predicted_class),
        p.confidence,
    );

    html.push_str("<h4>All class probabilities:</h4><ul>");
    for (class, prob) in probability_rows(result) {
        html.push_str(&format!("<li>{}: %{prob}</li>", escape(&class)));
    }
    html.push_str("</ul>");

    if let Some(echo) = input_echo(result) {
        html.push_str(&format!(
            "<p><strong>Entered data:</strong></p><p>Age: {}, Gender: {}, Height: {}cm, Weight: {}kg</p>",
            escape(&echo_field(&echo.age)),
            escape(&echo_field(&echo.gender)),
            escape(&echo_field(&echo.height)),
            escape(&echo_field(&echo.weight)),
        ));
    }

    html
}

/// `(class, percentage)` pairs with the percentage fixed to one decimal.
pub fn probability_rows(result: &PredictionResult) -> Vec<(String, String)> {
    result
        .prediction
        .all_probabilities
        .iter()
        .flatten()
        .map(|(class, prob)| (class.clone(), format!("{prob:.1}")))
        .collect()
}

fn input_echo(result: &PredictionResult) -> Option<InputEcho> {
    result
        .input_data
        .as_ref()
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn echo_field(v: &Option<Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Terminal output
// ---------------------------------------------------------------------------

/// Terminal rendering of a successful prediction.
pub fn result_terminal(kind: ResultKind, result: &PredictionResult) -> String {
    let p = &result.prediction;
    let title = match kind {
        ResultKind::Quick => "Quick Prediction Result",
        ResultKind::Full => "Detailed Prediction Result",
    };

    let mut out = format!("{}\n{}\n", title.bold().cyan(), "=".repeat(40));
    out.push_str(&format!("  {} {}\n", "BMI:       ".bold(), p.bmi));
    out.push_str(&format!("  {} {}\n", "Prediction:".bold(), p.predicted_class));
    out.push_str(&format!("  {} %{}\n", "Confidence:".bold(), p.confidence));

    let rows = probability_rows(result);
    if !rows.is_empty() {
        out.push('\n');
        out.push_str(&format!("{}\n", "All class probabilities".bold().cyan()));
        for (class, prob) in rows {
            out.push_str(&format!("  {class:<22} %{prob:>5}\n"));
        }
    }

    if kind == ResultKind::Quick {
        out.push('\n');
        out.push_str(&format!(
            "  {}\n",
            "Quick predictions use default lifestyle values; run `vitalis predict` for more precision."
                .dimmed()
        ));
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_result() -> PredictionResult {
        serde_json::from_value(json!({
            "success": true,
            "prediction": {
                "bmi": 27.76,
                "predicted_class": "Overweight Level I",
                "confidence": 71.3,
                "all_probabilities": {
                    "Normal Weight": 12.0,
                    "Overweight Level I": 71.34,
                    "Obesity Type I": 16.66
                }
            },
            "input_data": {"age": 35, "gender": "Male", "height": 178, "weight": 88}
        }))
        .unwrap()
    }

    #[test]
    fn probabilities_use_one_decimal() {
        let rows = probability_rows(&full_result());
        assert_eq!(rows.len(), 3);
        assert!(rows.contains(&("Normal Weight".to_string(), "12.0".to_string())));
        assert!(rows.contains(&("Overweight Level I".to_string(), "71.3".to_string())));
        assert!(rows.contains(&("Obesity Type I".to_string(), "16.7".to_string())));
    }

    #[test]
    fn full_html_lists_every_class() {
        let html = full_result_html(&full_result());
        assert_eq!(html.matches("<li>").count(), 3);
        assert!(html.contains("<li>Normal Weight: %12.0</li>"));
        assert!(html.contains("Age: 35, Gender: Male, Height: 178cm, Weight: 88kg"));
    }

    #[test]
    fn error_outcomes_are_error_boxes() {
        let outcome = Err(ClientError::Api("Missing required fields: ['age']".to_string()));
        let rendered = render_outcome(ResultKind::Quick, &outcome);
        assert_eq!(rendered.tone, Tone::Error);
        assert_eq!(rendered.html, "Error: Missing required fields: [&#39;age&#39;]");
        assert!(rendered.to_container_html().starts_with("<div id=\"result\" class=\"result error\">"));

        let outcome = Err(ClientError::Transport("connection refused".to_string()));
        let rendered = render_outcome(ResultKind::Full, &outcome);
        assert_eq!(rendered.html, "API error: network error: connection refused");
    }
}
