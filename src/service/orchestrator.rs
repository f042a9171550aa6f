//! Analysis Orchestrator - the fetch, score, check, merge and persist pipeline.
//!
//! One `analyze_page` call runs every step in order in the calling task:
//! 1. Resolve the page URL (optionally against the current request's base URL)
//! 2. Check the backend's credentials, before any network call
//! 3. Fetch the rendered HTML
//! 4. Extract the page title
//! 5. Ask the active scoring backend for scores and suggestions
//! 6. Append the deterministic technical findings
//! 7. Normalize and replace the cached record for (page, language)
//!
//! Nothing is written unless every step succeeds.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::backend::{response, PromptInput, ScoringBackend};
use super::fetcher::{PageFetcher, RequestContext};
use super::technical::TechnicalAnalyzer;
use crate::domain::models::*;
use crate::error::{AppError, Result};
use crate::extractor::PageExtractor;
use crate::repository::AnalysisStore;

type KeyLocks = DashMap<(i64, i64), Arc<Mutex<()>>>;

/// Per-key lock held for one run. The map entry is dropped with the last holder.
struct FlightGuard<'a> {
    locks: &'a KeyLocks,
    key: (i64, i64),
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a> FlightGuard<'a> {
    async fn acquire(locks: &'a KeyLocks, key: (i64, i64)) -> FlightGuard<'a> {
        // Built before waiting so a cancelled wait still prunes the entry.
        let mut flight = FlightGuard {
            locks,
            key,
            guard: None,
        };
        let lock = locks.entry(key).or_default().clone();
        flight.guard = Some(lock.lock_owned().await);
        flight
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Release first: the map then holds the only reference unless another run is waiting.
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub struct AnalysisOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    backend: Arc<dyn ScoringBackend>,
    store: Arc<dyn AnalysisStore>,
    single_flight: Option<KeyLocks>,
}

impl AnalysisOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        backend: Arc<dyn ScoringBackend>,
        store: Arc<dyn AnalysisStore>,
    ) -> Self {
        Self {
            fetcher,
            backend,
            store,
            single_flight: None,
        }
    }

    /// Serialize concurrent runs for the same (page, language) key.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled.then(DashMap::new);
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn store(&self) -> &Arc<dyn AnalysisStore> {
        &self.store
    }

    pub async fn analyze_page(
        &self,
        request: &AnalysisRequest,
        context: Option<&RequestContext>,
    ) -> Result<AnalysisOutcome> {
        if request.page_id <= 0 {
            return Err(AppError::invalid_argument("No valid page identifier provided"));
        }

        let _flight = match &self.single_flight {
            Some(locks) => {
                Some(FlightGuard::acquire(locks, (request.page_id, request.language_id)).await)
            }
            None => None,
        };

        self.run_pipeline(request, context).await
    }

    async fn run_pipeline(
        &self,
        request: &AnalysisRequest,
        context: Option<&RequestContext>,
    ) -> Result<AnalysisOutcome> {
        let started = Instant::now();
        let (page_id, language_id) = (request.page_id, request.language_id);

        let url = self.fetcher.resolve_url(page_id, language_id, context)?;
        self.backend.check_availability()?;
        tracing::info!("Analyzing page {} (language {}) at {}", page_id, language_id, url);

        let page = self.fetcher.fetch(&url).await?;
        if page.status != 200 {
            return Err(AppError::fetch(format!(
                "Could not fetch page HTML: HTTP {}",
                page.status
            )));
        }
        tracing::debug!("Fetched {} bytes from {}", page.body.len(), url);

        let title = PageExtractor::extract_title(&page.body);
        let keyword = request.keyword();

        let analysis = self
            .backend
            .invoke(&PromptInput::new(&page.body, &title, keyword))
            .await?;

        let mut raw_scores = analysis.scores;
        let mut suggestions = analysis.suggestions;
        suggestions.extend(TechnicalAnalyzer::analyze(&page.body));
        response::apply_keyword_policy(&mut raw_scores, &mut suggestions, keyword);
        let scores = ScoreSet::normalize(&raw_scores);

        let record = self
            .store
            .save(page_id, language_id, &scores, &suggestions)
            .await?;

        tracing::info!(
            "Analysis of page {} (language {}) finished in {}ms via {}",
            page_id,
            language_id,
            started.elapsed().as_millis(),
            self.backend.name()
        );

        Ok(AnalysisOutcome {
            record,
            page_title: title,
        })
    }
}
