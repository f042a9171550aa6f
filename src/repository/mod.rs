use async_trait::async_trait;

use crate::domain::models::*;
use crate::error::Result;

pub mod session;
pub mod sqlite;

pub use session::{InMemorySessionStore, SessionStore};
pub use sqlite::AnalysisRepository;

/// Cache of the latest analysis per (page, language).
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Replace whatever is stored for the record's key. Returns the stored record.
    async fn save(
        &self,
        page_id: i64,
        language_id: i64,
        scores: &ScoreSet,
        suggestions: &[Suggestion],
    ) -> Result<AnalysisRecord>;

    /// `None` is a cache miss, not an error.
    async fn find_latest(&self, page_id: i64, language_id: i64) -> Result<Option<AnalysisRecord>>;

    async fn truncate_all(&self) -> Result<u64>;

    async fn count_analyzed_pages(&self, language_id: i64) -> Result<i64>;

    async fn average_scores(&self, language_id: i64) -> Result<ScoreSet>;

    async fn score_distribution(
        &self,
        category: ScoreCategory,
        language_id: i64,
    ) -> Result<ScoreDistribution>;
}
