//! SQLite-backed repository for the results log.

use async_stream::try_stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use super::helpers::{millis_column, verdict_tags, ResultRow};
use crate::persistence::traits::ResultsRepository;
use crate::persistence::{PersistenceError, RecordFilter};
use crate::record::{ResultRecord, Verdict};

/// Rows fetched per round-trip while replaying the log.
const REPLAY_PAGE: i64 = 256;

/// SQLite implementation of [`ResultsRepository`].
pub struct SqliteResultsRepository {
    pool: SqlitePool,
    /// Single-writer gate. Purges hold it for their whole transaction.
    writer: Mutex<()>,
}

impl SqliteResultsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writer: Mutex::new(()),
        }
    }

    pub async fn len(&self) -> Result<u64, PersistenceError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM results")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}

impl ResultsRepository for SqliteResultsRepository {
    async fn append(&self, record: &ResultRecord) -> Result<(), PersistenceError> {
        let started_at = millis_column(record, "started_at", record.started_at)?;
        let ended_at = millis_column(record, "ended_at", record.ended_at)?;
        let _guard = self.writer.lock().await;

        let inserted = sqlx::query(
            r#"
            INSERT INTO results
                (session_name, white, black, started_at, ended_at,
                 result, outcome_kind, movetext)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.session_name)
        .bind(&record.white)
        .bind(&record.black)
        .bind(started_at)
        .bind(ended_at)
        .bind(record.tag().as_str())
        .bind(record.kind().as_str())
        .bind(&record.movetext)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                PersistenceError::DuplicateRecord(record.session_name.clone()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    fn load_all(&self) -> BoxStream<'_, Result<ResultRecord, PersistenceError>> {
        // Keyset pages so no connection is held between yields.
        try_stream! {
            let mut after = 0i64;
            loop {
                let rows: Vec<ResultRow> = sqlx::query_as(
                    r#"
                    SELECT seq, session_name, white, black, started_at, ended_at,
                           result, outcome_kind, movetext
                    FROM results
                    WHERE seq > ?
                    ORDER BY seq ASC
                    LIMIT ?
                    "#,
                )
                .bind(after)
                .bind(REPLAY_PAGE)
                .fetch_all(&self.pool)
                .await?;

                let last_page = (rows.len() as i64) < REPLAY_PAGE;
                for row in rows {
                    after = row.seq;
                    yield row.into_record()?;
                }
                if last_page {
                    break;
                }
            }
        }
        .boxed()
    }

    async fn contains(&self, session_name: &str) -> Result<bool, PersistenceError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT seq FROM results WHERE session_name = ?")
            .bind(session_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn count_where_result(
        &self,
        participant: &str,
        verdict: Verdict,
    ) -> Result<u32, PersistenceError> {
        let (as_white, as_black) = verdict_tags(verdict);

        let (white_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM results WHERE white = ? AND result = ?")
                .bind(participant)
                .bind(as_white.as_str())
                .fetch_one(&self.pool)
                .await?;
        let (black_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM results WHERE black = ? AND result = ?")
                .bind(participant)
                .bind(as_black.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok((white_count + black_count) as u32)
    }

    async fn purge_matching(&self, filter: &RecordFilter) -> Result<u64, PersistenceError> {
        let _guard = self.writer.lock().await;

        let deleted = match filter {
            RecordFilter::ParticipantPrefix(prefix) => {
                let len = prefix.chars().count() as i64;
                sqlx::query(
                    "DELETE FROM results WHERE substr(white, 1, ?) = ? OR substr(black, 1, ?) = ?",
                )
                .bind(len)
                .bind(prefix)
                .bind(len)
                .bind(prefix)
                .execute(&self.pool)
                .await?
            }
            RecordFilter::SessionName(name) => {
                sqlx::query("DELETE FROM results WHERE session_name = ?")
                    .bind(name)
                    .execute(&self.pool)
                    .await?
            }
        };

        let n = deleted.rows_affected();
        tracing::info!(?filter, deleted = n, "Purged result records");
        Ok(n)
    }
}
