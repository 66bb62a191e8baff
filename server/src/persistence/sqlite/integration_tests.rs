use futures::TryStreamExt;

use super::{Database, SqliteResultsRepository};
use crate::persistence::traits::ResultsRepository;
use crate::persistence::{PersistenceError, RecordFilter};
use crate::record::{Outcome, ResultRecord, Side, Verdict};

fn record(name: &str, white: &str, black: &str, outcome: Outcome) -> ResultRecord {
    ResultRecord {
        session_name: name.to_string(),
        white: white.to_string(),
        black: black.to_string(),
        started_at: 1_000,
        ended_at: 2_000,
        outcome,
        movetext: format!("1. e4 e5 {}", outcome.tag()),
    }
}

async fn repo() -> SqliteResultsRepository {
    let db = Database::new_in_memory().await.unwrap();
    SqliteResultsRepository::new(db.pool().clone())
}

async fn names(repo: &SqliteResultsRepository) -> Vec<String> {
    repo.load_all()
        .map_ok(|r| r.session_name)
        .try_collect()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_load_all_replays_in_append_order() {
    let repo = repo().await;
    // Names deliberately out of alphabetical order
    for name in ["zulu", "alpha", "mike"] {
        repo.append(&record(name, "alice", "bob", Outcome::DrawAgreed))
            .await
            .unwrap();
    }
    assert_eq!(names(&repo).await, vec!["zulu", "alpha", "mike"]);
    // Restartable
    assert_eq!(names(&repo).await.len(), 3);
}

#[tokio::test]
async fn test_load_all_spans_pages() {
    let repo = repo().await;
    for i in 0..600 {
        repo.append(&record(&format!("g{i}"), "alice", "bob", Outcome::Stalemate))
            .await
            .unwrap();
    }
    let all = names(&repo).await;
    assert_eq!(all.len(), 600);
    assert_eq!(all[0], "g0");
    assert_eq!(all[599], "g599");
}

#[tokio::test]
async fn test_record_survives_storage() {
    let repo = repo().await;
    let original = record(
        "g1",
        "alice",
        "bob",
        Outcome::Abandonment {
            loser: Some(Side::Black),
        },
    );
    repo.append(&original).await.unwrap();
    let loaded: Vec<ResultRecord> = repo.load_all().try_collect().await.unwrap();
    assert_eq!(loaded, vec![original]);
}

#[tokio::test]
async fn test_duplicate_session_name_rejected() {
    let repo = repo().await;
    repo.append(&record("g1", "alice", "bob", Outcome::WhiteWinByCheckmate))
        .await
        .unwrap();
    let err = repo
        .append(&record("g1", "carol", "dave", Outcome::DrawAgreed))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::DuplicateRecord(ref n) if n == "g1"));
    assert!(repo.contains("g1").await.unwrap());
    assert!(!repo.contains("g2").await.unwrap());
    assert_eq!(repo.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_counts_cover_both_colours() {
    let repo = repo().await;
    let games = [
        ("g1", "alice", "bob", Outcome::WhiteWinByCheckmate),
        ("g2", "bob", "alice", Outcome::BlackWinByCheckmate),
        ("g3", "bob", "alice", Outcome::Resignation { loser: Side::White }),
        ("g4", "alice", "bob", Outcome::Stalemate),
        ("g5", "carol", "alice", Outcome::WhiteWinByCheckmate),
        ("g6", "alice", "bob", Outcome::Abandonment { loser: None }),
    ];
    for (name, white, black, outcome) in games {
        repo.append(&record(name, white, black, outcome)).await.unwrap();
    }

    assert_eq!(repo.count_where_result("alice", Verdict::Win).await.unwrap(), 3);
    assert_eq!(repo.count_where_result("alice", Verdict::Draw).await.unwrap(), 1);
    assert_eq!(repo.count_where_result("alice", Verdict::Loss).await.unwrap(), 1);
    assert_eq!(repo.score("alice").await.unwrap(), 10);

    let bob = repo.stats("bob").await.unwrap();
    assert_eq!((bob.wins, bob.draws, bob.losses), (0, 1, 3));
    assert_eq!(repo.score("nobody").await.unwrap(), 0);
}

#[tokio::test]
async fn test_purge_by_participant_prefix() {
    let repo = repo().await;
    repo.append(&record("g1", "testplayer1", "alice", Outcome::DrawAgreed))
        .await
        .unwrap();
    repo.append(&record("g2", "alice", "bob", Outcome::DrawAgreed))
        .await
        .unwrap();
    repo.append(&record("g3", "bob", "testplayer2", Outcome::DrawAgreed))
        .await
        .unwrap();
    // `%` and `_` are not wildcards here
    repo.append(&record("g4", "test_layer", "bob", Outcome::DrawAgreed))
        .await
        .unwrap();

    let deleted = repo
        .purge_matching(&RecordFilter::ParticipantPrefix("testplayer".to_string()))
        .await
        .unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(names(&repo).await, vec!["g2", "g4"]);

    let deleted = repo
        .purge_matching(&RecordFilter::SessionName("g4".to_string()))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(names(&repo).await, vec!["g2"]);
}

#[tokio::test]
async fn test_append_after_purge_keeps_order() {
    let repo = repo().await;
    repo.append(&record("g1", "alice", "bob", Outcome::DrawAgreed))
        .await
        .unwrap();
    repo.purge_matching(&RecordFilter::SessionName("g1".to_string()))
        .await
        .unwrap();
    repo.append(&record("g2", "alice", "bob", Outcome::DrawAgreed))
        .await
        .unwrap();
    repo.append(&record("g1", "alice", "bob", Outcome::DrawAgreed))
        .await
        .unwrap();
    assert_eq!(names(&repo).await, vec!["g2", "g1"]);
}

#[tokio::test]
async fn test_malformed_row_surfaces_as_error() {
    let db = Database::new_in_memory().await.unwrap();
    let repo = SqliteResultsRepository::new(db.pool().clone());
    repo.append(&record("g1", "alice", "bob", Outcome::DrawAgreed))
        .await
        .unwrap();
    // A stalemate cannot carry a decisive tag
    sqlx::query(
        "INSERT INTO results (session_name, white, black, started_at, ended_at, result, outcome_kind)
         VALUES ('bad', 'a', 'b', 0, 0, '1-0', 'stalemate')",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let replay: Result<Vec<ResultRecord>, _> = repo.load_all().try_collect().await;
    assert!(matches!(replay, Err(PersistenceError::Malformed { seq: 2, .. })));
}

#[tokio::test]
async fn test_file_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.db");
    {
        let db = Database::open(&path).await.unwrap();
        let repo = SqliteResultsRepository::new(db.pool().clone());
        repo.append(&record("g1", "alice", "bob", Outcome::WhiteWinByCheckmate))
            .await
            .unwrap();
        db.pool().close().await;
    }
    let db = Database::open(&path).await.unwrap();
    let repo = SqliteResultsRepository::new(db.pool().clone());
    assert_eq!(names(&repo).await, vec!["g1"]);
    assert_eq!(repo.score("alice").await.unwrap(), 3);
}

#[tokio::test]
async fn test_unrepresentable_timestamp_rejected() {
    let repo = repo().await;
    let mut late = record("late", "alice", "bob", Outcome::DrawAgreed);
    late.ended_at = u64::MAX;
    assert!(matches!(
        repo.append(&late).await,
        Err(PersistenceError::TimestampOutOfRange { column: "ended_at", .. })
    ));

    // Nothing was written, so later appends and replays still work
    repo.append(&record("g1", "alice", "bob", Outcome::DrawAgreed))
        .await
        .unwrap();
    assert_eq!(names(&repo).await, vec!["g1"]);
    assert!(!repo.contains("late").await.unwrap());
}
