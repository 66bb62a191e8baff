//! Encode/decode helpers between result records and `results` rows.

use crate::persistence::PersistenceError;
use crate::record::{Outcome, OutcomeKind, ResultRecord, ResultTag, Verdict};

/// Row type for `results` queries, mapped via `sqlx::FromRow`.
#[derive(Debug, sqlx::FromRow)]
pub struct ResultRow {
    pub seq: i64,
    pub session_name: String,
    pub white: String,
    pub black: String,
    pub started_at: i64,
    pub ended_at: i64,
    pub result: String,
    pub outcome_kind: String,
    pub movetext: String,
}

impl ResultRow {
    pub fn into_record(self) -> Result<ResultRecord, PersistenceError> {
        let seq = self.seq;
        let malformed = |reason: String| PersistenceError::Malformed { seq, reason };

        let tag: ResultTag = self.result.parse().map_err(malformed)?;
        let kind: OutcomeKind = self.outcome_kind.parse().map_err(malformed)?;
        let outcome = Outcome::from_parts(tag, kind).ok_or_else(|| {
            malformed(format!(
                "outcome '{}' cannot carry result '{}'",
                kind.as_str(),
                tag
            ))
        })?;
        let started_at = timestamp(seq, "started_at", self.started_at)?;
        let ended_at = timestamp(seq, "ended_at", self.ended_at)?;

        Ok(ResultRecord {
            session_name: self.session_name,
            white: self.white,
            black: self.black,
            started_at,
            ended_at,
            outcome,
            movetext: self.movetext,
        })
    }
}

fn timestamp(seq: i64, column: &str, value: i64) -> Result<u64, PersistenceError> {
    u64::try_from(value).map_err(|_| PersistenceError::Malformed {
        seq,
        reason: format!("negative {}", column),
    })
}

/// Encode a unix-millis timestamp for an INTEGER column.
pub fn millis_column(
    record: &ResultRecord,
    column: &'static str,
    value: u64,
) -> Result<i64, PersistenceError> {
    i64::try_from(value).map_err(|_| PersistenceError::TimestampOutOfRange {
        session: record.session_name.clone(),
        column,
    })
}

/// The result tags that give `verdict` to the white and the black player.
pub fn verdict_tags(verdict: Verdict) -> (ResultTag, ResultTag) {
    match verdict {
        Verdict::Win => (ResultTag::WhiteWins, ResultTag::BlackWins),
        Verdict::Draw => (ResultTag::Draw, ResultTag::Draw),
        Verdict::Loss => (ResultTag::BlackWins, ResultTag::WhiteWins),
    }
}
