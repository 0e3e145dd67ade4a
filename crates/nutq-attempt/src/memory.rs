use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    error::PersistenceError,
    ports::{PersistenceGateway, ScoreSubmission, ScoreSummary},
};

/// Process-local score store with "latest score wins" per word.
///
/// Scores are grouped by category. Words saved without a category are kept
/// apart and never contribute to an overall score.
#[derive(Debug, Default)]
pub struct InMemoryScoreStore {
    categories: Mutex<HashMap<Option<String>, BTreeMap<String, u8>>>,
}

impl InMemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest score per word in `category`.
    pub fn scores(&self, category: Option<&str>) -> BTreeMap<String, u8> {
        self.categories
            .lock()
            .ok()
            .and_then(|categories| categories.get(&category.map(String::from)).cloned())
            .unwrap_or_default()
    }

    pub fn store(&self, submission: &ScoreSubmission) -> Result<ScoreSummary, PersistenceError> {
        if submission.score > 100 {
            return Err(PersistenceError::Rejected(format!(
                "score {} is out of range",
                submission.score
            )));
        }

        let mut categories = self
            .categories
            .lock()
            .map_err(|_| PersistenceError::Transport("score store lock poisoned".to_string()))?;

        let per_word = categories
            .entry(submission.category_id.clone())
            .or_default();
        per_word.insert(submission.word_id.clone(), submission.score);

        let overall = submission
            .category_id
            .as_ref()
            .map(|_| overall_score(per_word));

        Ok(ScoreSummary {
            overall,
            per_word: per_word.clone(),
        })
    }
}

/// Rounded mean of the per-word scores.
fn overall_score(per_word: &BTreeMap<String, u8>) -> u8 {
    if per_word.is_empty() {
        return 0;
    }
    let total: u32 = per_word.values().map(|&s| u32::from(s)).sum();
    (f64::from(total) / per_word.len() as f64).round() as u8
}

#[async_trait]
impl PersistenceGateway for InMemoryScoreStore {
    async fn save_score(
        &self,
        submission: ScoreSubmission,
    ) -> Result<ScoreSummary, PersistenceError> {
        let summary = self.store(&submission)?;
        tracing::debug!(
            word_id = %submission.word_id,
            category = ?submission.category_id,
            score = submission.score,
            overall = ?summary.overall,
            "score stored"
        );
        Ok(summary)
    }
}
