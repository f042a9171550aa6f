//! Transport-agnostic handlers for the analysis surface.
//!
//! Each function takes already-decoded parameters plus shared state and returns
//! a serializable response or an [`ApiError`]. `server` adapts them to HTTP.

use serde::{Deserialize, Serialize};

use crate::domain::models::*;
use crate::error::ApiError;
use crate::lifecycle::AppState;
use crate::repository::session::COLLAPSED_KEY;
use crate::service::fetcher::RequestContext;

// ====== Parameters ======

/// Integer parameter as sent by forms (string) or JSON (number).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IntParam {
    Int(i64),
    Float(f64),
    Str(String),
}

impl IntParam {
    /// Lenient conversion; anything unparseable is 0.
    pub fn value(&self) -> i64 {
        match self {
            IntParam::Int(v) => *v,
            IntParam::Float(v) if v.is_finite() => v.trunc() as i64,
            IntParam::Float(_) => 0,
            IntParam::Str(s) => s.trim().parse().unwrap_or(0),
        }
    }
}

fn int_or_zero(param: &Option<IntParam>) -> i64 {
    param.as_ref().map(IntParam::value).unwrap_or(0)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadAnalysisParams {
    pub page_id: Option<IntParam>,
    pub language: Option<IntParam>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeParams {
    pub page_id: Option<IntParam>,
    #[serde(alias = "language")]
    pub language_id: Option<IntParam>,
    pub keyword: Option<String>,
}

impl AnalyzeParams {
    /// Fill fields missing from the body with the query string's values.
    pub fn with_fallback(self, fallback: AnalyzeParams) -> Self {
        Self {
            page_id: self.page_id.or(fallback.page_id),
            language_id: self.language_id.or(fallback.language_id),
            keyword: self.keyword.or(fallback.keyword),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToggleParams {
    pub collapsed: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageParams {
    pub language: Option<IntParam>,
}

// ====== Responses ======

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadAnalysisResponse {
    pub success: bool,
    pub has_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<Suggestion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub scores: ScoreSet,
    pub suggestions: Vec<Suggestion>,
    pub page_title: String,
    pub language_id: i64,
    pub analyzed_at: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ToggleResponse {
    pub success: bool,
    pub collapsed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub success: bool,
    pub language_id: i64,
    pub analyzed_pages: i64,
    pub average_scores: ScoreSet,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub background_color: Vec<&'static str>,
    pub data: Vec<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionResponse {
    pub success: bool,
    pub category: ScoreCategory,
    pub language_id: i64,
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

// ====== Handlers ======

/// Read the cached analysis for a page.
pub async fn load_analysis(
    state: &AppState,
    params: &LoadAnalysisParams,
) -> Result<LoadAnalysisResponse, ApiError> {
    let page_id = int_or_zero(&params.page_id);
    if page_id <= 0 {
        return Err(ApiError::bad_request("Invalid page ID"));
    }
    let language_id = available_language(state, page_id, int_or_zero(&params.language).max(0));

    let record = state.store.find_latest(page_id, language_id).await?;
    Ok(match record {
        Some(record) => LoadAnalysisResponse {
            success: true,
            has_data: true,
            scores: Some(record.scores),
            suggestions: Some(record.suggestions),
            analyzed_at: Some(record.analyzed_at),
            language_id: Some(record.language_id),
        },
        None => LoadAnalysisResponse {
            success: false,
            has_data: false,
            scores: None,
            suggestions: None,
            analyzed_at: None,
            language_id: None,
        },
    })
}

/// Run the full pipeline for one page and return the fresh result.
pub async fn analyze_page(
    state: &AppState,
    params: &AnalyzeParams,
    context: Option<&RequestContext>,
) -> Result<AnalyzeResponse, ApiError> {
    let page_id = int_or_zero(&params.page_id);
    let language_id = int_or_zero(&params.language_id).max(0);
    let keyword = params
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| state.site.keyword(page_id))
        .map(str::to_string);

    let request = AnalysisRequest::new(page_id, language_id).with_keyword(keyword);
    let outcome = state
        .orchestrator
        .analyze_page(&request, context)
        .await
        .map_err(|e| {
            tracing::error!("Analysis of page {} failed: {} ({})", page_id, e, e.code());
            ApiError::from(e)
        })?;

    Ok(AnalyzeResponse {
        success: true,
        scores: outcome.record.scores,
        suggestions: outcome.record.suggestions,
        page_title: outcome.page_title,
        language_id: outcome.record.language_id,
        analyzed_at: outcome.record.analyzed_at,
    })
}

/// Store the collapsed state of the score panel for an operator.
pub fn set_collapsed(state: &AppState, operator: &str, params: &ToggleParams) -> ToggleResponse {
    let collapsed = params.collapsed.as_ref().map(parse_flag).unwrap_or(false);
    state.sessions.set_flag(operator, COLLAPSED_KEY, collapsed);
    ToggleResponse {
        success: true,
        collapsed,
    }
}

pub fn get_collapsed(state: &AppState, operator: &str) -> ToggleResponse {
    ToggleResponse {
        success: true,
        collapsed: state.sessions.get_flag(operator, COLLAPSED_KEY).unwrap_or(false),
    }
}

/// Analyzed page count and average scores for a language.
pub async fn summary(state: &AppState, params: &LanguageParams) -> Result<SummaryResponse, ApiError> {
    let language_id = int_or_zero(&params.language).max(0);
    Ok(SummaryResponse {
        success: true,
        language_id,
        analyzed_pages: state.store.count_analyzed_pages(language_id).await?,
        average_scores: state.store.average_scores(language_id).await?,
    })
}

/// Score-range chart data (HIGH, MEDIUM, LOW) for one category.
pub async fn distribution(
    state: &AppState,
    category: &str,
    params: &LanguageParams,
) -> Result<DistributionResponse, ApiError> {
    let category: ScoreCategory = category.parse().map_err(ApiError::bad_request)?;
    let language_id = int_or_zero(&params.language).max(0);
    let distribution = state.store.score_distribution(category, language_id).await?;

    let ranges = ScoreRange::all();
    Ok(DistributionResponse {
        success: true,
        category,
        language_id,
        labels: ranges.iter().map(ScoreRange::label).collect(),
        datasets: vec![ChartDataset {
            background_color: ranges.iter().map(ScoreRange::color).collect(),
            data: ranges.iter().map(|r| distribution.get(*r)).collect(),
        }],
    })
}

// ====== Helpers ======

/// Fall back to the default language when the page is not served in the requested one.
fn available_language(state: &AppState, page_id: i64, language_id: i64) -> i64 {
    if language_id == 0 || state.site.page(page_id).is_none() {
        return language_id;
    }
    if state.site.is_available_in_language(page_id, language_id) {
        language_id
    } else {
        0
    }
}

/// `false`, `"false"`, `0`, `"0"`, empty and null are false; everything else is true.
pub fn parse_flag(value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(s.as_str(), "" | "0" | "false"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_param_is_lenient() {
        assert_eq!(IntParam::Str(" 12 ".into()).value(), 12);
        assert_eq!(IntParam::Str("abc".into()).value(), 0);
        assert_eq!(IntParam::Int(-4).value(), -4);
        assert_eq!(IntParam::Float(3.9).value(), 3);
    }

    #[test]
    fn test_parse_flag_matches_form_semantics() {
        for falsy in [json!(false), json!("false"), json!(0), json!("0"), json!(""), json!(null)] {
            assert!(!parse_flag(&falsy), "{} should be false", falsy);
        }
        for truthy in [json!(true), json!("true"), json!(1), json!("1"), json!("yes")] {
            assert!(parse_flag(&truthy), "{} should be true", truthy);
        }
    }

    #[test]
    fn test_analyze_params_accept_form_strings_and_json_numbers() {
        let from_json: AnalyzeParams =
            serde_json::from_value(json!({"pageId": 5, "languageId": 1, "keyword": "tea"})).unwrap();
        assert_eq!(int_or_zero(&from_json.page_id), 5);
        assert_eq!(int_or_zero(&from_json.language_id), 1);

        let from_strings: AnalyzeParams =
            serde_json::from_value(json!({"pageId": "7", "language": "2"})).unwrap();
        assert_eq!(int_or_zero(&from_strings.page_id), 7);
        assert_eq!(int_or_zero(&from_strings.language_id), 2);
    }

    #[test]
    fn test_body_params_win_over_query_fallback() {
        let body: AnalyzeParams = serde_json::from_value(json!({"keyword": "tea"})).unwrap();
        let query: AnalyzeParams =
            serde_json::from_value(json!({"pageId": "14", "language": "1", "keyword": "coffee"})).unwrap();

        let merged = body.with_fallback(query);
        assert_eq!(int_or_zero(&merged.page_id), 14);
        assert_eq!(int_or_zero(&merged.language_id), 1);
        assert_eq!(merged.keyword.as_deref(), Some("tea"));

        let body: AnalyzeParams = serde_json::from_value(json!({"pageId": 3})).unwrap();
        let merged = body.with_fallback(AnalyzeParams::default());
        assert_eq!(int_or_zero(&merged.page_id), 3);
    }
}
