//! The results log together with the ranking views derived from it.
//!
//! [`Results`] is the only path by which records reach the log, so append
//! order and view application order are the same. Anything that removes
//! records is followed by a full rebuild.

use crate::error::CoreError;
use crate::persistence::test_data::{synthetic_results, test_player_filter};
use crate::persistence::traits::ResultsRepository;
use crate::persistence::{PersistenceError, RecordFilter};
use crate::ranking::{RankingEngine, RankingError};
use crate::record::{ResultRecord, Tally};

pub struct Results<R> {
    repo: R,
    ranking: RankingEngine,
}

impl<R: ResultsRepository> Results<R> {
    /// Wrap `repo` and build the views from its current contents.
    pub async fn open(repo: R) -> Result<Self, RankingError> {
        let mut results = Self {
            repo,
            ranking: RankingEngine::new(),
        };
        results.rebuild().await?;
        Ok(results)
    }

    /// Append a finished game and feed it to the views. Nothing reaches the
    /// views if the append fails.
    pub async fn record(&mut self, record: &ResultRecord) -> Result<(), PersistenceError> {
        self.repo.append(record).await?;
        self.ranking.on_result(record);
        Ok(())
    }

    pub async fn rebuild(&mut self) -> Result<u64, RankingError> {
        self.ranking.rebuild(&self.repo).await
    }

    /// Delete matching records, then rebuild. Returns the number deleted.
    pub async fn purge(&mut self, filter: &RecordFilter) -> Result<u64, CoreError> {
        let deleted = self.repo.purge_matching(filter).await?;
        self.rebuild().await?;
        Ok(deleted)
    }

    /// Replace all synthetic records with a fresh deterministic batch.
    pub async fn seed_test_data(
        &mut self,
        players: usize,
        games: usize,
        seed: u64,
        now: u64,
    ) -> Result<usize, CoreError> {
        self.repo.purge_matching(&test_player_filter()).await?;
        let batch = synthetic_results(players, games, seed, now);
        for record in &batch {
            self.repo.append(record).await?;
        }
        self.rebuild().await?;
        tracing::info!(players, games = batch.len(), seed, "Seeded test results");
        Ok(batch.len())
    }

    pub async fn purge_test_data(&mut self) -> Result<u64, CoreError> {
        self.purge(&test_player_filter()).await
    }

    pub async fn is_recorded(&self, session_name: &str) -> Result<bool, PersistenceError> {
        self.repo.contains(session_name).await
    }

    pub async fn stats(&self, participant: &str) -> Result<Tally, PersistenceError> {
        self.repo.stats(participant).await
    }

    pub async fn score(&self, participant: &str) -> Result<u32, PersistenceError> {
        self.repo.score(participant).await
    }

    pub fn ranking(&self) -> &RankingEngine {
        &self.ranking
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
}
