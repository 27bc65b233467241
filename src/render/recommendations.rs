//! Recommendations formatting and the canned fallback shown when the
//! recommendations endpoint is unavailable.

use crate::api::types::Recommendations;
use crate::markup::html::escape;
use crate::markup::{self, HtmlOptions};

/// Recommendation headings sit one level below the modal title.
const HEADING_OFFSET: u8 = 1;

/// HTML for the recommendations modal body.
pub fn recommendations_html(recs: &Recommendations) -> String {
    match recs {
        Recommendations::Text(text) => markup::to_html(
            &markup::parse(text),
            HtmlOptions {
                heading_offset: HEADING_OFFSET,
            },
        ),
        Recommendations::Structured(value) => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            format!("<pre>{}</pre>", escape(&pretty))
        }
    }
}

/// Terminal text for recommendations.
pub fn recommendations_terminal(recs: &Recommendations) -> String {
    match recs {
        Recommendations::Text(text) => markup::to_terminal(&markup::parse(text)),
        Recommendations::Structured(value) => {
            let mut out = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            out.push('\n');
            out
        }
    }
}

/// Canned advice keyed by predicted class, in assistant markup.
pub fn fallback_recommendations(predicted_class: &str, bmi: f64) -> Recommendations {
    let text = match predicted_class {
        "Normal Weight" => format!(
            "### 🎉 Congratulations! Your weight is healthy
**BMI:** {bmi}
### 🥗 Nutrition
- Keep up your balanced eating habits
- Eat 5 portions of fruit and vegetables a day
- Drink plenty of water (2-3 litres a day)
- Avoid processed food
### 🏃 Physical activity
- 150 minutes of moderate exercise per week
- A daily 30 minute walk is ideal
- Add strength training"
        ),
        "Overweight Level I" => format!(
            "### ⚠️ You are slightly overweight
**BMI:** {bmi}
### 🥗 Nutrition strategy
- Control portion sizes
- Cut down on sugary drinks
- Prefer whole grains
- Favour protein-rich meals
- Eat small meals often (5-6 a day)
### 🏃 Exercise plan
- Brisk walking 45 minutes, 4-5 days a week
- Add strength training
- Take the stairs
- Aim to lose 1-2 kg per month"
        ),
        "Obesity Type I" => format!(
            "### 🚨 You are in the type 1 obesity range
**BMI:** {bmi}
### 🥗 Nutrition strategy
- Consult a dietitian
- Calorie restriction is necessary
- Avoid processed food completely
- Eat small meals often (6-7 a day)
- Increase your water intake
### 🏃 Exercise plan
- Get your doctor's approval first
- Start with low-impact exercise (swimming, walking)
- Increase gradually
- Ask a physiotherapist for support
### ⚠️ Important
**Act under medical supervision. Monitor blood sugar and blood pressure.**"
        ),
        _ => format!(
            "### Health recommendations
**BMI:** {bmi}
We recommend consulting a health professional for advice specific to your situation.
You can talk to the health assistant for general guidance."
        ),
    };
    Recommendations::Text(text)
}
