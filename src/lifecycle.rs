//! Application lifecycle management.
//!
//! Logging setup and construction of the shared state every surface (HTTP, CLI) uses.

use std::sync::Arc;
use sqlx::SqlitePool;

use crate::config::Settings;
use crate::error::Result;
use crate::repository::{AnalysisRepository, AnalysisStore, InMemorySessionStore, SessionStore};
use crate::service::backend::BackendSelector;
use crate::service::fetcher::HttpPageFetcher;
use crate::service::AnalysisOrchestrator;
use crate::site::SiteTree;

/// Shared, cheaply clonable application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub store: Arc<dyn AnalysisStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub site: Arc<SiteTree>,
}

/// Initialize logging with tracing_subscriber.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn,sitescore=debug"));

    // A second call (tests, embedding hosts) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(false)
        .with_ansi(true)
        .try_init();
}

/// Wire the production pipeline: HTTP fetcher, configured backend, SQLite store.
///
/// `selector` lets the host register extra backends before one is resolved.
pub fn build_state(settings: &Settings, pool: SqlitePool, selector: &BackendSelector) -> Result<AppState> {
    let site = Arc::new(SiteTree::new(settings.site.clone()));
    let backend = selector.resolve(&settings.backend)?;
    let fetcher = Arc::new(HttpPageFetcher::new(site.clone(), &settings.fetch)?);
    let store: Arc<dyn AnalysisStore> = Arc::new(AnalysisRepository::new(pool));

    let orchestrator = AnalysisOrchestrator::new(fetcher, backend, store.clone())
        .with_single_flight(settings.analysis.single_flight);

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        store,
        sessions: Arc::new(InMemorySessionStore::new()),
        site,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;

    #[tokio::test]
    async fn test_build_state_resolves_configured_backend() {
        let pool = fixtures::setup_test_db().await;
        let mut settings = Settings::default();
        settings.backend.provider = "mistral".into();

        let state = build_state(&settings, pool, &BackendSelector::with_builtins()).unwrap();
        assert_eq!(state.orchestrator.backend_name(), "mistral");
    }

    #[tokio::test]
    async fn test_build_state_rejects_unknown_backend() {
        let pool = fixtures::setup_test_db().await;
        let mut settings = Settings::default();
        settings.backend.provider = "nope".into();

        let result = build_state(&settings, pool, &BackendSelector::with_builtins());
        assert!(result.is_err());
    }
}
