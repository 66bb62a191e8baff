//! Move search backends for computer-controlled participants.
//!
//! A backend is handed a board snapshot and the side it plays, and answers
//! with a move or a failure. Which backend a session uses is decided by
//! [`SearchConfig`] when the session is set up; [`AiEngine`] is the closed
//! set of variants.

pub mod minimax;
pub mod san;
pub mod uci;
pub mod uci_engine;

pub use minimax::MinimaxBackend;
pub use san::format_san;
pub use uci::{UciError, UciMessage};
pub use uci_engine::UciBackend;

use cozy_chess::{Board, Color, Move};
use std::future::Future;
use std::path::PathBuf;

/// Clock information for the side to move. Backends that cannot honour a
/// time control ignore it and search without a limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeControl {
    pub remaining_ms: Option<u64>,
    pub increment_ms: Option<u64>,
    pub movetime_ms: Option<u64>,
}

/// A single search job.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub board: Board,
    pub side: Color,
    pub time_control: Option<TimeControl>,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("No legal moves in position")]
    NoLegalMoves,
    #[error("It is not {0:?}'s turn to move")]
    WrongSide(Color),
    #[error("Engine process error: {0}")]
    Process(String),
    #[error("Timeout waiting for engine")]
    Timeout,
    #[error("UCI protocol error: {0}")]
    Protocol(#[from] UciError),
    #[error("Unknown search backend: {0}")]
    UnknownBackend(String),
}

/// Capability interface implemented by every backend.
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn search(
        &self,
        request: SearchRequest,
    ) -> impl Future<Output = Result<Move, SearchError>> + Send;
}

/// Backend selection, usually built from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchConfig {
    Minimax { depth: u8 },
    Uci { path: PathBuf, depth: Option<u8> },
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::Minimax { depth: 1 }
    }
}

impl SearchConfig {
    /// Build a config from a backend name plus its parameters.
    pub fn from_parts(backend: &str, depth: u8, uci_path: PathBuf) -> Result<Self, SearchError> {
        match backend.to_ascii_lowercase().as_str() {
            "minimax" => Ok(Self::Minimax { depth }),
            "uci" => Ok(Self::Uci {
                path: uci_path,
                depth: Some(depth),
            }),
            other => Err(SearchError::UnknownBackend(other.to_string())),
        }
    }
}

/// The closed set of search backends.
#[derive(Debug, Clone)]
pub enum AiEngine {
    Minimax(MinimaxBackend),
    Uci(UciBackend),
}

impl AiEngine {
    pub fn from_config(config: &SearchConfig) -> Self {
        match config {
            SearchConfig::Minimax { depth } => Self::Minimax(MinimaxBackend::new(*depth)),
            SearchConfig::Uci { path, depth } => Self::Uci(UciBackend::new(path.clone(), *depth)),
        }
    }
}

impl SearchBackend for AiEngine {
    fn name(&self) -> &'static str {
        match self {
            Self::Minimax(b) => b.name(),
            Self::Uci(b) => b.name(),
        }
    }

    async fn search(&self, request: SearchRequest) -> Result<Move, SearchError> {
        match self {
            Self::Minimax(b) => b.search(request).await,
            Self::Uci(b) => b.search(request).await,
        }
    }
}

/// Shared precondition check for backends.
pub(crate) fn check_side(request: &SearchRequest) -> Result<(), SearchError> {
    if request.board.side_to_move() != request.side {
        return Err(SearchError::WrongSide(request.side));
    }
    Ok(())
}
