//! Async repository trait for the results log.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send` for `tokio::spawn`.

use futures::stream::BoxStream;
use std::future::Future;

use super::{PersistenceError, RecordFilter};
use crate::record::{ResultRecord, Tally, Verdict};

/// Append-only log of finished sessions, queryable by participant.
///
/// Implementations must keep append order: `load_all` yields records in the
/// exact order they were appended, and `purge_matching` must not interleave
/// with `append`.
pub trait ResultsRepository: Send + Sync + 'static {
    /// Persist one record. Fails with [`PersistenceError::DuplicateRecord`]
    /// if the session name is already in the log.
    fn append(
        &self,
        record: &ResultRecord,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Lazily replay the whole log in append order. Each call starts over.
    fn load_all(&self) -> BoxStream<'_, Result<ResultRecord, PersistenceError>>;

    fn contains(
        &self,
        session_name: &str,
    ) -> impl Future<Output = Result<bool, PersistenceError>> + Send;

    /// Games `participant` finished with `verdict`, counted over both colours.
    fn count_where_result(
        &self,
        participant: &str,
        verdict: Verdict,
    ) -> impl Future<Output = Result<u32, PersistenceError>> + Send;

    /// Delete matching records and return how many were removed. Derived
    /// views are stale afterwards.
    fn purge_matching(
        &self,
        filter: &RecordFilter,
    ) -> impl Future<Output = Result<u64, PersistenceError>> + Send;

    fn stats(
        &self,
        participant: &str,
    ) -> impl Future<Output = Result<Tally, PersistenceError>> + Send {
        async move {
            Ok(Tally {
                wins: self.count_where_result(participant, Verdict::Win).await?,
                draws: self.count_where_result(participant, Verdict::Draw).await?,
                losses: self.count_where_result(participant, Verdict::Loss).await?,
            })
        }
    }

    fn score(
        &self,
        participant: &str,
    ) -> impl Future<Output = Result<u32, PersistenceError>> + Send {
        async move { Ok(self.stats(participant).await?.score()) }
    }
}
