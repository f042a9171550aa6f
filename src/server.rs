use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::{header, HeaderMap},
    routing::{get, post},
    Form, Json, Router,
};
use serde::de::DeserializeOwned;

use crate::commands::analysis::{self, *};
use crate::error::ApiError;
use crate::lifecycle::AppState;
use crate::service::fetcher::RequestContext;

/// Header carrying the operator (backend user) id the toggle state is scoped to.
pub const OPERATOR_HEADER: &str = "x-sitescore-operator";
const ANONYMOUS_OPERATOR: &str = "anonymous";

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/sitescore/analysis", get(load_analysis_handler))
        .route("/sitescore/analyze", post(analyze_handler))
        .route("/sitescore/toggle", get(get_toggle_handler).post(set_toggle_handler))
        .route("/sitescore/summary", get(summary_handler))
        .route("/sitescore/distribution/:category", get(distribution_handler))
        .with_state(state)
}

pub async fn load_analysis_handler(
    State(state): State<AppState>,
    Query(params): Query<LoadAnalysisParams>,
) -> Result<Json<LoadAnalysisResponse>, ApiError> {
    analysis::load_analysis(&state, &params).await.map(Json)
}

pub async fn analyze_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let context = request_context(request.headers());
    let query = Query::<AnalyzeParams>::try_from_uri(request.uri())
        .map(|Query(params)| params)
        .unwrap_or_default();
    let params = decode_body::<AnalyzeParams>(request, &state)
        .await?
        .with_fallback(query);
    analysis::analyze_page(&state, &params, context.as_ref())
        .await
        .map(Json)
}

pub async fn get_toggle_handler(State(state): State<AppState>, headers: HeaderMap) -> Json<ToggleResponse> {
    Json(analysis::get_collapsed(&state, &operator(&headers)))
}

pub async fn set_toggle_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<ToggleResponse>, ApiError> {
    let operator = operator(request.headers());
    let params: ToggleParams = decode_body(request, &state).await?;
    Ok(Json(analysis::set_collapsed(&state, &operator, &params)))
}

pub async fn summary_handler(
    State(state): State<AppState>,
    Query(params): Query<LanguageParams>,
) -> Result<Json<SummaryResponse>, ApiError> {
    analysis::summary(&state, &params).await.map(Json)
}

pub async fn distribution_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<LanguageParams>,
) -> Result<Json<DistributionResponse>, ApiError> {
    analysis::distribution(&state, &category, &params).await.map(Json)
}

/// Decode a JSON or form-encoded body; an empty body decodes to the defaults.
async fn decode_body<T>(request: Request, state: &AppState) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        Json::<T>::from_request(request, state)
            .await
            .map(|Json(params)| params)
            .map_err(|e| ApiError::bad_request(e.body_text()))
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        Form::<T>::from_request(request, state)
            .await
            .map(|Form(params)| params)
            .map_err(|e| ApiError::bad_request(e.body_text()))
    } else {
        Ok(T::default())
    }
}

fn operator(headers: &HeaderMap) -> String {
    headers
        .get(OPERATOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_OPERATOR)
        .to_string()
}

/// Base URL of the incoming request, used to make relative page routes absolute.
fn request_context(headers: &HeaderMap) -> Option<RequestContext> {
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())?;
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    Some(RequestContext::with_base(format!("{}://{}", scheme, host)))
}
