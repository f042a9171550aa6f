//! Decoding of provider answers into scores and suggestions.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::BackendAnalysis;
use crate::domain::models::{RawScores, ScoreCategory, Suggestion};
use crate::error::{AppError, Result};

pub const MISSING_KEYWORD_MESSAGE: &str =
    "No target keyword defined - set a focus keyword for this page to enable keyword scoring";

/// Remove a surrounding markdown code fence (```json or plain ```), if any.
pub fn strip_code_fence(text: &str) -> &str {
    static JSON_FENCE: OnceLock<Regex> = OnceLock::new();
    static PLAIN_FENCE: OnceLock<Regex> = OnceLock::new();
    let json_fence =
        JSON_FENCE.get_or_init(|| Regex::new(r"(?s)```(?i:json)\s*(.*?)\s*```").unwrap());
    let plain_fence = PLAIN_FENCE.get_or_init(|| Regex::new(r"(?s)```\s*(.*?)\s*```").unwrap());

    for fence in [json_fence, plain_fence] {
        if let Some(inner) = fence.captures(text).and_then(|c| c.get(1)) {
            return inner.as_str();
        }
    }
    text.trim()
}

/// Parse answer text into scores and suggestions.
///
/// Requires a JSON object with a `scores` object and a `suggestions` array.
pub fn parse_analysis(text: &str) -> Result<BackendAnalysis> {
    let json = strip_code_fence(text);
    let value: Value = serde_json::from_str(json).map_err(|e| {
        AppError::malformed_response(format!("Failed to parse JSON from API response: {}", e))
    })?;

    let scores = value
        .get("scores")
        .and_then(RawScores::from_json)
        .ok_or_else(|| AppError::malformed_response("Invalid response structure: missing scores"))?;

    let suggestions = value
        .get("suggestions")
        .filter(|s| s.is_array())
        .ok_or_else(|| {
            AppError::malformed_response("Invalid response structure: missing suggestions")
        })?;
    let suggestions: Vec<Suggestion> = serde_json::from_value(suggestions.clone()).map_err(|e| {
        AppError::malformed_response(format!("Invalid response structure: suggestions: {}", e))
    })?;

    Ok(BackendAnalysis { scores, suggestions })
}

/// Without a target keyword the keyword score is 0 and the first suggestion
/// says so. Applying it twice changes nothing.
pub fn apply_keyword_policy(
    scores: &mut RawScores,
    suggestions: &mut Vec<Suggestion>,
    keyword: Option<&str>,
) {
    if keyword.map(str::trim).is_some_and(|k| !k.is_empty()) {
        return;
    }

    scores.insert(ScoreCategory::Keywords, 0);
    if suggestions.first().map(|s| s.message.as_str()) != Some(MISSING_KEYWORD_MESSAGE) {
        suggestions.insert(0, Suggestion::warning(MISSING_KEYWORD_MESSAGE));
    }
}
