//! SQLite-backed results log.
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**: one writer and multiple concurrent readers.
//! - **Embedded migrations**: `sqlx::migrate!` runs `migrations/001_results.sql`
//!   when [`Database::open`] is called. The schema is idempotent.
//!
//! [`SqliteResultsRepository`] implements
//! [`ResultsRepository`](crate::persistence::traits::ResultsRepository).
//! Result tags and outcome kinds are stored as `TEXT` and round-tripped
//! through the helpers in [`helpers`].

mod database;
mod results_repo;
#[cfg(test)]
mod integration_tests;
pub(crate) mod helpers;

pub use database::Database;
pub use results_repo::SqliteResultsRepository;
