//! Derived ranking views over the results log.
//!
//! [`RankingEngine`] owns a [`Ladder`] and a [`League`]. Both are fed one
//! record at a time through [`RankingEngine::on_result`], in append order,
//! and can be rebuilt from scratch by replaying the log. Undecided results
//! (`*`) are skipped by both views.

pub mod ladder;
pub mod league;

pub use ladder::Ladder;
pub use league::League;

use futures::{Stream, StreamExt};
use serde::Serialize;

use crate::persistence::traits::ResultsRepository;
use crate::persistence::PersistenceError;
use crate::record::{ResultRecord, ResultTag, Tally};

#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    #[error("Unknown ranking view '{0}' (expected 'ladder' or 'league')")]
    UnknownView(String),
    #[error("Rebuild aborted: {0}")]
    Rebuild(#[from] PersistenceError),
}

/// One row of a view's standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    /// 1-based.
    pub rank: usize,
    pub participant: String,
    /// Only the league keeps per-participant counts.
    pub tally: Option<Tally>,
}

/// A ranking view fed by finished results.
pub trait RankingView: Send + Sync {
    fn name(&self) -> &'static str;
    fn on_result(&mut self, record: &ResultRecord);
    fn standings(&self) -> Vec<RankEntry>;
    /// `None` means "not ranked".
    fn rank_of(&self, participant: &str) -> Option<usize>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingEngine {
    ladder: Ladder,
    league: League,
    applied: u64,
}

impl RankingEngine {
    pub const VIEWS: [&'static str; 2] = ["ladder", "league"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one freshly appended record to both views.
    pub fn on_result(&mut self, record: &ResultRecord) {
        if record.tag() == ResultTag::Undecided {
            return;
        }
        self.ladder.on_result(record);
        self.league.on_result(record);
        self.applied += 1;
    }

    /// Number of records that changed the views.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn ladder(&self) -> &Ladder {
        &self.ladder
    }

    pub fn league(&self) -> &League {
        &self.league
    }

    pub fn view(&self, name: &str) -> Result<&dyn RankingView, RankingError> {
        match name.to_ascii_lowercase().as_str() {
            "ladder" => Ok(&self.ladder),
            "league" => Ok(&self.league),
            _ => Err(RankingError::UnknownView(name.to_string())),
        }
    }

    /// Fold a replay stream into a fresh engine. Stops at the first error.
    pub async fn replay<S>(records: S) -> Result<Self, PersistenceError>
    where
        S: Stream<Item = Result<ResultRecord, PersistenceError>>,
    {
        let mut engine = Self::new();
        let mut records = std::pin::pin!(records);
        while let Some(record) = records.next().await {
            engine.on_result(&record?);
        }
        Ok(engine)
    }

    /// Replace both views with a replay of the whole log. On failure the
    /// current views are left untouched.
    pub async fn rebuild<R: ResultsRepository>(&mut self, repo: &R) -> Result<u64, RankingError> {
        match Self::replay(repo.load_all()).await {
            Ok(fresh) => {
                *self = fresh;
                tracing::info!(records = self.applied, "Ranking views rebuilt");
                Ok(self.applied)
            }
            Err(e) => {
                tracing::error!(error = %e, "Ranking rebuild failed, keeping previous views");
                Err(RankingError::Rebuild(e))
            }
        }
    }
}
