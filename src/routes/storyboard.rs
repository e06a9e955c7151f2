use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;
use crate::routes::validation::validate_http_url;

#[derive(Debug, Deserialize)]
pub struct StoryboardRequest {
    pub image_url: String,
    #[serde(default)]
    pub product_attrs: Value,
}

#[derive(Debug, Serialize)]
pub struct StoryboardResponse {
    pub beats: Vec<String>,
    pub copy: String,
    pub duration_estimate: usize,
}

/// Pure planning heuristic: no provider call, no cache, no history.
pub async fn storyboard(
    Json(payload): Json<StoryboardRequest>,
) -> Result<Json<StoryboardResponse>, ServiceError> {
    validate_http_url(&payload.image_url)?;
    Ok(Json(build_storyboard(&payload.product_attrs)))
}

fn build_storyboard(attrs: &Value) -> StoryboardResponse {
    let product_type = attrs
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("clothing");
    let color = attrs.get("color").and_then(Value::as_str).unwrap_or("");
    let style = attrs.get("style").and_then(Value::as_str).unwrap_or("");

    let mut beats = vec!["turn".to_string()];
    match product_type {
        "hoodie" | "jacket" | "coat" => {
            beats.extend(["wave".to_string(), "close_up".to_string()]);
        }
        "dress" | "skirt" => {
            beats.extend(["walk".to_string(), "turn".to_string()]);
        }
        _ => beats.push("wave".to_string()),
    }

    let copy = if !color.is_empty() {
        format!("Perfect fit in {color} - see how it moves with you!")
    } else if !style.is_empty() {
        format!("Style meets comfort in this {style} {product_type}!")
    } else {
        format!("Show off your new {product_type} with confidence!")
    };

    // Two seconds per beat.
    let duration_estimate = beats.len() * 2;
    StoryboardResponse {
        beats,
        copy,
        duration_estimate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outerwear_gets_a_close_up() {
        let plan = build_storyboard(&json!({"type": "hoodie", "color": "red"}));
        assert_eq!(plan.beats, vec!["turn", "wave", "close_up"]);
        assert_eq!(plan.duration_estimate, 6);
        assert!(plan.copy.contains("red"));
    }

    #[test]
    fn dresses_walk_and_turn() {
        let plan = build_storyboard(&json!({"type": "dress"}));
        assert_eq!(plan.beats, vec!["turn", "walk", "turn"]);
    }

    #[test]
    fn unknown_products_fall_back_to_the_default_plan() {
        let plan = build_storyboard(&json!({}));
        assert_eq!(plan.beats, vec!["turn", "wave"]);
        assert!(plan.copy.contains("clothing"));
    }
}
