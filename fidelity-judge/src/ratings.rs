use crate::prompt::{RATING_KEYS, RATING_SCALE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ratings returned by the vision model for one screenshot pair.
///
/// A rating the model left out counts as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeRatings {
    #[serde(default)]
    pub layout_similarity: f64,
    #[serde(default)]
    pub visual_hierarchy: f64,
    #[serde(default)]
    pub color_scheme: f64,
    #[serde(default)]
    pub typography: f64,
    #[serde(default)]
    pub spacing: f64,
    #[serde(default)]
    pub component_placement: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_impression: Option<String>,
    #[serde(default)]
    pub notable_differences: Vec<String>,
}

impl JudgeRatings {
    pub fn ratings(&self) -> [f64; 6] {
        [
            self.layout_similarity,
            self.visual_hierarchy,
            self.color_scheme,
            self.typography,
            self.spacing,
            self.component_placement,
        ]
    }

    /// Mean of the six ratings mapped onto [0,1]. Each rating is clamped to
    /// the rubric scale first.
    pub fn score(&self) -> f64 {
        let ratings = self.ratings();
        let total: f64 = ratings
            .iter()
            .map(|r| if r.is_finite() { r.clamp(0.0, RATING_SCALE) } else { 0.0 })
            .sum();
        total / (ratings.len() as f64 * RATING_SCALE)
    }
}

/// Return the first balanced JSON object embedded in free text.
///
/// Brace matching skips over string literals, so `"}"` inside a value does
/// not end the object. A balanced candidate that is not valid JSON is
/// skipped and the search resumes at the next `{`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    text.match_indices('{').find_map(|(start, _)| {
        let candidate = balanced_object_at(text, start)?;
        serde_json::from_str::<Map<String, Value>>(candidate)
            .ok()
            .map(|_| candidate)
    })
}

/// Parse a model reply into ratings. Returns `None` when the reply holds no
/// JSON object, or when the object carries none of the rubric keys or has
/// ratings of the wrong type.
pub fn parse_ratings(reply: &str) -> Option<JudgeRatings> {
    let candidate = extract_json_object(reply)?;
    let object: Map<String, Value> = serde_json::from_str(candidate).ok()?;

    if !RATING_KEYS.iter().any(|key| object.contains_key(*key)) {
        return None;
    }

    serde_json::from_value(Value::Object(object)).ok()
}

fn balanced_object_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
