use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::domain::models::*;
use crate::error::{AppError, Result};
use crate::repository::AnalysisStore;

pub struct AnalysisRepository {
    pool: SqlitePool,
}

impl AnalysisRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn scores_for_language(&self, language_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT scores FROM analysis_cache WHERE language_id = ?",
        )
        .bind(language_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Stored scores as a JSON object, or `None` when the row is malformed.
fn stored_scores(raw: &str) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn stored_score(scores: &serde_json::Map<String, Value>, category: ScoreCategory) -> Option<i64> {
    scores.get(category.as_str()).and_then(numeric_score)
}

#[async_trait]
impl AnalysisStore for AnalysisRepository {
    async fn save(
        &self,
        page_id: i64,
        language_id: i64,
        scores: &ScoreSet,
        suggestions: &[Suggestion],
    ) -> Result<AnalysisRecord> {
        let scores_json = serde_json::to_string(scores)
            .map_err(|e| AppError::database(e.to_string()))?;
        let suggestions_json = serde_json::to_string(suggestions)
            .map_err(|e| AppError::database(e.to_string()))?;
        let analyzed_at = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM analysis_cache WHERE page_id = ? AND language_id = ?")
            .bind(page_id)
            .bind(language_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO analysis_cache (page_id, language_id, scores, suggestions, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(page_id)
        .bind(language_id)
        .bind(&scores_json)
        .bind(&suggestions_json)
        .bind(analyzed_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(
            "Saved analysis for page {} language {} ({} suggestions)",
            page_id,
            language_id,
            suggestions.len()
        );

        Ok(AnalysisRecord {
            page_id,
            language_id,
            scores: *scores,
            suggestions: suggestions.to_vec(),
            analyzed_at,
        })
    }

    async fn find_latest(&self, page_id: i64, language_id: i64) -> Result<Option<AnalysisRecord>> {
        let row = sqlx::query_as::<_, (String, String, i64)>(
            "SELECT scores, suggestions, created_at FROM analysis_cache
             WHERE page_id = ? AND language_id = ?
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(page_id)
        .bind(language_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((scores, suggestions, created_at)) = row else {
            return Ok(None);
        };

        let scores = serde_json::from_str::<Value>(&scores)
            .ok()
            .and_then(|v| RawScores::from_json(&v))
            .map(|raw| ScoreSet::normalize(&raw))
            .unwrap_or_else(|| {
                tracing::warn!("Malformed stored scores for page {} language {}", page_id, language_id);
                ScoreSet::default()
            });
        let suggestions = serde_json::from_str::<Vec<Suggestion>>(&suggestions).unwrap_or_else(|e| {
            tracing::warn!(
                "Malformed stored suggestions for page {} language {}: {}",
                page_id,
                language_id,
                e
            );
            Vec::new()
        });

        Ok(Some(AnalysisRecord {
            page_id,
            language_id,
            scores,
            suggestions,
            analyzed_at: created_at,
        }))
    }

    async fn truncate_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM analysis_cache")
            .execute(&self.pool)
            .await?;
        tracing::info!("Truncated analysis cache ({} rows)", result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn count_analyzed_pages(&self, language_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT page_id) FROM analysis_cache WHERE language_id = ?",
        )
        .bind(language_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn average_scores(&self, language_id: i64) -> Result<ScoreSet> {
        let rows = self.scores_for_language(language_id).await?;

        let mut sums = [0i64; ScoreCategory::ALL.len()];
        let mut valid = 0i64;
        for raw in &rows {
            let Some(scores) = stored_scores(raw) else {
                tracing::warn!("Skipping malformed stored scores");
                continue;
            };
            for (sum, category) in sums.iter_mut().zip(ScoreCategory::ALL) {
                *sum += stored_score(&scores, category).unwrap_or(0);
            }
            valid += 1;
        }

        let mut averages = ScoreSet::default();
        if valid == 0 {
            return Ok(averages);
        }
        for (sum, category) in sums.into_iter().zip(ScoreCategory::ALL) {
            let average = (sum as f64 / valid as f64).round() as i64;
            averages.set(category, average.clamp(0, ScoreSet::MAX) as u8);
        }
        Ok(averages)
    }

    async fn score_distribution(
        &self,
        category: ScoreCategory,
        language_id: i64,
    ) -> Result<ScoreDistribution> {
        let rows = self.scores_for_language(language_id).await?;

        let mut distribution = ScoreDistribution::default();
        for raw in &rows {
            if let Some(score) = stored_scores(raw).and_then(|s| stored_score(&s, category)) {
                distribution.record(score);
            }
        }
        Ok(distribution)
    }
}
