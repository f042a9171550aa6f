//! Rich domain entities - behavior lives WITH data

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

// ====== Enums ======

/// The fixed set of scored categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreCategory {
    Geo,
    Performance,
    Semantics,
    Keywords,
    Accessibility,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 5] = [
        ScoreCategory::Geo,
        ScoreCategory::Performance,
        ScoreCategory::Semantics,
        ScoreCategory::Keywords,
        ScoreCategory::Accessibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreCategory::Geo => "geo",
            ScoreCategory::Performance => "performance",
            ScoreCategory::Semantics => "semantics",
            ScoreCategory::Keywords => "keywords",
            ScoreCategory::Accessibility => "accessibility",
        }
    }
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScoreCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown score category: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Success,
    Warning,
    #[serde(other)]
    Info,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Success => "success",
            SuggestionKind::Warning => "warning",
            SuggestionKind::Info => "info",
        }
    }
}

// ====== Scores ======

/// Scores exactly as a backend reported them: any category name, any integer.
///
/// Numeric strings and floats are accepted and rounded; everything else is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawScores(pub BTreeMap<String, i64>);

impl RawScores {
    pub fn get(&self, category: ScoreCategory) -> Option<i64> {
        self.0.get(category.as_str()).copied()
    }

    pub fn insert(&mut self, category: ScoreCategory, value: i64) {
        self.0.insert(category.as_str().to_string(), value);
    }

    /// Lenient conversion from an arbitrary JSON object.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let scores = object
            .iter()
            .filter_map(|(key, value)| numeric_score(value).map(|v| (key.to_lowercase(), v)))
            .collect();
        Some(Self(scores))
    }
}

impl<'de> Deserialize<'de> for RawScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        RawScores::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom("scores must be a JSON object"))
    }
}

impl<const N: usize> From<[(ScoreCategory, i64); N]> for RawScores {
    fn from(entries: [(ScoreCategory, i64); N]) -> Self {
        let mut raw = RawScores::default();
        for (category, value) in entries {
            raw.insert(category, value);
        }
        raw
    }
}

/// Read a score from a JSON value: integers, floats (rounded) and numeric strings.
pub(crate) fn numeric_score(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
        }
        _ => None,
    }
}

/// Normalized score set: every category present, every value in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSet {
    #[serde(default)]
    pub geo: u8,
    #[serde(default)]
    pub performance: u8,
    #[serde(default)]
    pub semantics: u8,
    #[serde(default)]
    pub keywords: u8,
    #[serde(default)]
    pub accessibility: u8,
}

impl ScoreSet {
    pub const MAX: i64 = 100;

    /// Clamp out-of-range values and default absent categories to 0.
    pub fn normalize(raw: &RawScores) -> Self {
        let mut scores = ScoreSet::default();
        for category in ScoreCategory::ALL {
            let value = raw.get(category).unwrap_or(0).clamp(0, Self::MAX) as u8;
            scores.set(category, value);
        }
        scores
    }

    pub fn get(&self, category: ScoreCategory) -> u8 {
        match category {
            ScoreCategory::Geo => self.geo,
            ScoreCategory::Performance => self.performance,
            ScoreCategory::Semantics => self.semantics,
            ScoreCategory::Keywords => self.keywords,
            ScoreCategory::Accessibility => self.accessibility,
        }
    }

    pub fn set(&mut self, category: ScoreCategory, value: u8) {
        let value = value.min(Self::MAX as u8);
        match category {
            ScoreCategory::Geo => self.geo = value,
            ScoreCategory::Performance => self.performance = value,
            ScoreCategory::Semantics => self.semantics = value,
            ScoreCategory::Keywords => self.keywords = value,
            ScoreCategory::Accessibility => self.accessibility = value,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScoreCategory, u8)> + '_ {
        ScoreCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

// ====== Suggestions ======

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type", alias = "kind")]
    pub kind: SuggestionKind,
    pub message: String,
}

impl Suggestion {
    pub fn new(kind: SuggestionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(SuggestionKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(SuggestionKind::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(SuggestionKind::Info, message)
    }
}

// ====== Requests and Records ======

/// One analysis request. Transient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub page_id: i64,
    pub language_id: i64,
    pub target_keyword: Option<String>,
}

impl AnalysisRequest {
    pub fn new(page_id: i64, language_id: i64) -> Self {
        Self {
            page_id,
            language_id: language_id.max(0),
            target_keyword: None,
        }
    }

    pub fn with_keyword(mut self, keyword: Option<String>) -> Self {
        self.target_keyword = keyword;
        self
    }

    /// The target keyword, if one is set and not blank.
    pub fn keyword(&self) -> Option<&str> {
        self.target_keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// The cached, single current result for one (page, language) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub page_id: i64,
    pub language_id: i64,
    pub scores: ScoreSet,
    pub suggestions: Vec<Suggestion>,
    pub analyzed_at: i64,
}

/// What a pipeline run hands back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisOutcome {
    pub record: AnalysisRecord,
    pub page_title: String,
}

// ====== Score Ranges ======

/// Display classification of a single score. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreRange {
    High,
    Medium,
    Low,
}

impl ScoreRange {
    const THRESHOLD_HIGH: u8 = 75;
    const THRESHOLD_MEDIUM: u8 = 50;

    pub fn from_score(score: i64) -> Self {
        if score >= Self::THRESHOLD_HIGH as i64 {
            ScoreRange::High
        } else if score >= Self::THRESHOLD_MEDIUM as i64 {
            ScoreRange::Medium
        } else {
            ScoreRange::Low
        }
    }

    pub fn all() -> [ScoreRange; 3] {
        [ScoreRange::High, ScoreRange::Medium, ScoreRange::Low]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreRange::High => "high",
            ScoreRange::Medium => "medium",
            ScoreRange::Low => "low",
        }
    }

    pub fn min_score(&self) -> u8 {
        match self {
            ScoreRange::High => Self::THRESHOLD_HIGH,
            ScoreRange::Medium => Self::THRESHOLD_MEDIUM,
            ScoreRange::Low => 0,
        }
    }

    pub fn max_score(&self) -> u8 {
        match self {
            ScoreRange::High => 100,
            ScoreRange::Medium => Self::THRESHOLD_HIGH - 1,
            ScoreRange::Low => Self::THRESHOLD_MEDIUM - 1,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            ScoreRange::High => "#28a745",
            ScoreRange::Medium => "#ffc107",
            ScoreRange::Low => "#dc3545",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            ScoreRange::High => "score-high",
            ScoreRange::Medium => "score-medium",
            ScoreRange::Low => "score-low",
        }
    }

    pub fn label(&self) -> String {
        match self {
            ScoreRange::High => format!("Excellent (≥{}%)", Self::THRESHOLD_HIGH),
            ScoreRange::Medium => format!(
                "Good ({}-{}%)",
                Self::THRESHOLD_MEDIUM,
                Self::THRESHOLD_HIGH - 1
            ),
            ScoreRange::Low => format!("Needs Improvement (<{}%)", Self::THRESHOLD_MEDIUM),
        }
    }
}

/// Count of records per score range for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl ScoreDistribution {
    pub fn record(&mut self, score: i64) {
        match ScoreRange::from_score(score) {
            ScoreRange::High => self.high += 1,
            ScoreRange::Medium => self.medium += 1,
            ScoreRange::Low => self.low += 1,
        }
    }

    pub fn get(&self, range: ScoreRange) -> u64 {
        match range {
            ScoreRange::High => self.high,
            ScoreRange::Medium => self.medium,
            ScoreRange::Low => self.low,
        }
    }

    pub fn total(&self) -> u64 {
        self.high + self.medium + self.low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_clamps_and_fills_missing_categories() {
        let raw = RawScores::from([
            (ScoreCategory::Geo, 140),
            (ScoreCategory::Performance, -20),
            (ScoreCategory::Semantics, 64),
        ]);

        let scores = ScoreSet::normalize(&raw);

        assert_eq!(scores.geo, 100);
        assert_eq!(scores.performance, 0);
        assert_eq!(scores.semantics, 64);
        assert_eq!(scores.keywords, 0);
        assert_eq!(scores.accessibility, 0);
        assert!(scores.iter().all(|(_, s)| s <= 100));
    }

    #[test]
    fn raw_scores_accept_strings_and_floats_and_drop_junk() {
        let raw = RawScores::from_json(&json!({
            "geo": "81",
            "Performance": 72.6,
            "semantics": null,
            "keywords": [1, 2],
            "marketing": 40
        }))
        .unwrap();

        assert_eq!(raw.get(ScoreCategory::Geo), Some(81));
        assert_eq!(raw.get(ScoreCategory::Performance), Some(73));
        assert_eq!(raw.get(ScoreCategory::Semantics), None);
        assert_eq!(raw.get(ScoreCategory::Keywords), None);
        assert_eq!(raw.0.get("marketing"), Some(&40));
    }

    #[test]
    fn suggestion_serializes_kind_as_type() {
        let s = Suggestion::warning("2x H1 found on page");
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v, json!({"type": "warning", "message": "2x H1 found on page"}));

        let parsed: Suggestion =
            serde_json::from_value(json!({"type": "critical", "message": "x"})).unwrap();
        assert_eq!(parsed.kind, SuggestionKind::Info);
    }

    #[test]
    fn score_range_boundaries() {
        assert_eq!(ScoreRange::from_score(100), ScoreRange::High);
        assert_eq!(ScoreRange::from_score(75), ScoreRange::High);
        assert_eq!(ScoreRange::from_score(74), ScoreRange::Medium);
        assert_eq!(ScoreRange::from_score(50), ScoreRange::Medium);
        assert_eq!(ScoreRange::from_score(49), ScoreRange::Low);
        assert_eq!(ScoreRange::from_score(0), ScoreRange::Low);
        assert_eq!(ScoreRange::Medium.max_score(), 74);
        assert_eq!(ScoreRange::Low.label(), "Needs Improvement (<50%)");
    }

    #[test]
    fn blank_keyword_counts_as_absent() {
        let request = AnalysisRequest::new(3, 0).with_keyword(Some("   ".into()));
        assert_eq!(request.keyword(), None);

        let request = AnalysisRequest::new(3, 0).with_keyword(Some(" typo3 ".into()));
        assert_eq!(request.keyword(), Some("typo3"));
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Keywords".parse::<ScoreCategory>(), Ok(ScoreCategory::Keywords));
        assert!("marketing".parse::<ScoreCategory>().is_err());
    }
}
