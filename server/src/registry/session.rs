use serde::Serialize;
use uuid::Uuid;

use crate::record::Side;

/// Lifecycle of a session. `Unbound` only exists between allocation and
/// board reservation inside `create_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Unbound,
    Setup,
    Active,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Distinguishes incarnations of a reused name.
    pub(super) id: Uuid,
    pub(super) name: String,
    pub(super) board: Option<String>,
    pub(super) white: Option<String>,
    pub(super) black: Option<String>,
    pub(super) phase: SessionPhase,
    pub(super) moves: Vec<String>,
    pub(super) created_at: u64,
    pub(super) started_at: Option<u64>,
    pub(super) finished_at: Option<u64>,
}

impl Session {
    pub(super) fn new(name: String, created_at: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            board: None,
            white: None,
            black: None,
            phase: SessionPhase::Unbound,
            moves: Vec::new(),
            created_at,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn board(&self) -> Option<&str> {
        self.board.as_deref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn player(&self, side: Side) -> Option<&str> {
        match side {
            Side::White => self.white.as_deref(),
            Side::Black => self.black.as_deref(),
        }
    }

    /// Which side `participant` is seated on, if any.
    pub fn side_of(&self, participant: &str) -> Option<Side> {
        if self.white.as_deref() == Some(participant) {
            Some(Side::White)
        } else if self.black.as_deref() == Some(participant) {
            Some(Side::Black)
        } else {
            None
        }
    }

    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<u64> {
        self.finished_at
    }

    pub(super) fn seat_mut(&mut self, side: Side) -> &mut Option<String> {
        match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    pub(super) name: String,
    /// Name of the occupying session.
    pub(super) occupant: Option<String>,
}

impl Board {
    pub(super) fn new(name: String) -> Self {
        Self {
            name,
            occupant: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn occupant(&self) -> Option<&str> {
        self.occupant.as_deref()
    }

    pub fn is_free(&self) -> bool {
        self.occupant.is_none()
    }
}
