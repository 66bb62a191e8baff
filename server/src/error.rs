use crate::persistence::PersistenceError;
use crate::ranking::RankingError;
use crate::registry::RegistryError;

/// Everything the coordinator can report back to a caller.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Results storage unavailable: {0}")]
    Storage(#[from] PersistenceError),
    #[error(transparent)]
    Ranking(#[from] RankingError),
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
