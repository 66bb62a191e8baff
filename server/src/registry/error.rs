use super::session::SessionPhase;
use crate::record::Side;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("A {kind} named '{name}' already exists")]
    DuplicateName { kind: &'static str, name: String },
    #[error("No such {kind} '{name}'")]
    NotFound { kind: &'static str, name: String },
    #[error("There are no free boards to create a game on")]
    NoFreeBoard,
    #[error("'{participant}' is already attached to session '{session}'")]
    AlreadyAttached { participant: String, session: String },
    #[error("Session '{0}' has finished")]
    SessionFinished(String),
    #[error("The {side} side of session '{session}' is taken by '{occupant}'")]
    SideTaken {
        session: String,
        side: Side,
        occupant: String,
    },
    #[error("'{participant}' already plays {seated} in session '{session}'")]
    SelfPlay {
        session: String,
        participant: String,
        seated: Side,
    },
    #[error("Board '{board}' is in use by session '{session}'")]
    BoardInUse { board: String, session: String },
    #[error("Session '{session}' cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        session: String,
        from: SessionPhase,
        to: SessionPhase,
    },
}

impl RegistryError {
    pub(crate) fn session_not_found(name: &str) -> Self {
        Self::NotFound {
            kind: "session",
            name: name.to_string(),
        }
    }

    pub(crate) fn board_not_found(name: &str) -> Self {
        Self::NotFound {
            kind: "board",
            name: name.to_string(),
        }
    }
}
