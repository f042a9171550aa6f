//! Batch analysis over a page subtree and all its language variants.

use serde::Serialize;
use std::sync::Arc;

use super::orchestrator::AnalysisOrchestrator;
use crate::domain::models::AnalysisRequest;
use crate::site::SiteTree;

/// One (page, language) pair to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Combination {
    pub page_id: i64,
    pub language_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub page_id: i64,
    pub language_id: i64,
    pub kind: &'static str,
    pub code: u32,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BatchRunner {
    orchestrator: Arc<AnalysisOrchestrator>,
    site: Arc<SiteTree>,
}

impl BatchRunner {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>, site: Arc<SiteTree>) -> Self {
        Self { orchestrator, site }
    }

    /// Every available (page, language) pair under `root`, pages in tree order.
    pub fn combinations(&self, root: i64, depth: u32) -> Vec<Combination> {
        self.site
            .page_ids_recursive(root, depth)
            .into_iter()
            .filter(|page_id| self.site.page(*page_id).is_some())
            .flat_map(|page_id| {
                self.site
                    .languages()
                    .iter()
                    .filter(move |language| self.site.is_available_in_language(page_id, language.id))
                    .map(move |language| Combination {
                        page_id,
                        language_id: language.id,
                    })
            })
            .collect()
    }

    /// Analyze combinations one at a time. A failure is recorded and the run continues.
    ///
    /// `on_progress` is called once per combination, after it finished.
    pub async fn run<F>(&self, combinations: &[Combination], mut on_progress: F) -> BatchReport
    where
        F: FnMut(&Combination),
    {
        let mut report = BatchReport {
            total: combinations.len(),
            ..BatchReport::default()
        };

        for combination in combinations {
            let request = AnalysisRequest::new(combination.page_id, combination.language_id)
                .with_keyword(self.site.keyword(combination.page_id).map(str::to_string));

            match self.orchestrator.analyze_page(&request, None).await {
                Ok(_) => report.succeeded += 1,
                Err(e) => {
                    tracing::warn!(
                        "Analysis of page {} (language {}) failed: {}",
                        combination.page_id,
                        combination.language_id,
                        e
                    );
                    report.failures.push(BatchFailure {
                        page_id: combination.page_id,
                        language_id: combination.language_id,
                        kind: e.kind(),
                        code: e.code(),
                        message: e.to_string(),
                    });
                }
            }
            on_progress(combination);
        }

        tracing::info!(
            "Batch finished: {}/{} succeeded",
            report.succeeded,
            report.total
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{AnalysisRepository, AnalysisStore};
    use crate::site::{SiteConfig, SiteLanguage, SitePage, L18N_HIDE_DEFAULT};
    use crate::test_utils::{fixtures, mocks, stubs::*};

    fn site() -> Arc<SiteTree> {
        Arc::new(SiteTree::new(SiteConfig {
            base_url: "https://example.com".into(),
            languages: vec![
                SiteLanguage { id: 0, base: "/".into(), title: "English".into() },
                SiteLanguage { id: 1, base: "/fr/".into(), title: "Français".into() },
            ],
            pages: vec![
                SitePage { id: 10, slug: "".into(), keyword: Some("home".into()), translations: vec![1], ..Default::default() },
                SitePage { id: 11, parent: 10, slug: "a".into(), ..Default::default() },
                SitePage { id: 12, parent: 10, slug: "b".into(), l18n_cfg: L18N_HIDE_DEFAULT, translations: vec![1], ..Default::default() },
            ],
        }))
    }

    async fn runner(fetcher: StubFetcher) -> (BatchRunner, Arc<AnalysisRepository>) {
        let store = Arc::new(AnalysisRepository::new(fixtures::setup_test_db().await));
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            Arc::new(fetcher),
            Arc::new(StubBackend::scoring(60)),
            store.clone(),
        ));
        (BatchRunner::new(orchestrator, site()), store)
    }

    #[tokio::test]
    async fn test_combinations_follow_language_availability() {
        let (runner, _) = runner(StubFetcher::serving(mocks::good_page())).await;

        let combos: Vec<(i64, i64)> = runner
            .combinations(10, 1)
            .iter()
            .map(|c| (c.page_id, c.language_id))
            .collect();
        assert_eq!(combos, vec![(10, 0), (10, 1), (11, 0), (12, 1)]);

        assert_eq!(runner.combinations(10, 0).len(), 2);
        assert!(runner.combinations(999, 3).is_empty());
    }

    #[tokio::test]
    async fn test_run_continues_past_failures() {
        let fetcher = StubFetcher::serving(mocks::good_page()).failing_for(&[11]);
        let (runner, store) = runner(fetcher).await;
        let combos = runner.combinations(10, 1);

        let mut ticks = 0;
        let report = runner.run(&combos, |_| ticks += 1).await;

        assert_eq!(ticks, 4);
        assert_eq!(report.total, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].page_id, 11);
        assert_eq!(report.failures[0].kind, "fetch");
        assert!(!report.is_clean());

        assert_eq!(store.count_analyzed_pages(1).await.unwrap(), 2);
        let home = store.find_latest(10, 0).await.unwrap().unwrap();
        assert_eq!(home.scores.keywords, 60, "Page keyword is passed through");
    }
}
