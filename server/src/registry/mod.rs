//! In-memory directory of live sessions, the boards they occupy and the
//! session each participant is currently attending.
//!
//! The registry is plain data with no interior locking: it is owned by the
//! coordinator task and every mutation happens there, one command at a time.
//! Each method either fully applies or returns an error without touching
//! state, so board release, attachment clearing and record creation in
//! [`SessionRegistry::finish_session`] are observed together.
//!
//! Session and board names are unique ignoring case. Listings are sorted by
//! the folded name so output (and "first free board") is deterministic.

pub mod error;
pub mod session;

pub use error::RegistryError;
pub use session::{Board, Session, SessionPhase};

use std::collections::HashMap;

use crate::record::{format_movetext, Outcome, ResultRecord, Side};

fn key(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
    boards: HashMap<String, Board>,
    /// participant -> session key
    attachments: HashMap<String, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Boards ─────────────────────────────────────────────────────────

    pub fn add_board(&mut self, name: &str) -> Result<&Board, RegistryError> {
        let k = key(name);
        if self.boards.contains_key(&k) {
            return Err(RegistryError::DuplicateName {
                kind: "board",
                name: name.to_string(),
            });
        }
        tracing::info!(board = %name, "Board added");
        Ok(self
            .boards
            .entry(k)
            .or_insert_with(|| Board::new(name.to_string())))
    }

    /// Remove an unoccupied board.
    pub fn remove_board(&mut self, name: &str) -> Result<(), RegistryError> {
        let k = key(name);
        let board = self
            .boards
            .get(&k)
            .ok_or_else(|| RegistryError::board_not_found(name))?;
        if let Some(session) = &board.occupant {
            return Err(RegistryError::BoardInUse {
                board: board.name.clone(),
                session: session.clone(),
            });
        }
        self.boards.remove(&k);
        tracing::info!(board = %name, "Board removed");
        Ok(())
    }

    pub fn board_by_name(&self, name: &str) -> Option<&Board> {
        self.boards.get(&key(name))
    }

    pub fn list_boards(&self) -> Vec<&Board> {
        sorted_values(&self.boards)
    }

    pub fn first_free_board(&self) -> Option<&Board> {
        self.list_boards().into_iter().find(|b| b.is_free())
    }

    // ── Session lifecycle ──────────────────────────────────────────────

    /// Create a session in `Setup` on `board`, or on the first free board
    /// by name when none is given.
    pub fn create_session(
        &mut self,
        name: &str,
        board: Option<&str>,
        now: u64,
    ) -> Result<&Session, RegistryError> {
        let k = key(name);
        if self.sessions.contains_key(&k) {
            return Err(RegistryError::DuplicateName {
                kind: "session",
                name: name.to_string(),
            });
        }

        let board_key = match board {
            Some(requested) => {
                let b = self
                    .boards
                    .get(&key(requested))
                    .ok_or_else(|| RegistryError::board_not_found(requested))?;
                if let Some(session) = &b.occupant {
                    return Err(RegistryError::BoardInUse {
                        board: b.name.clone(),
                        session: session.clone(),
                    });
                }
                key(requested)
            }
            None => key(self.first_free_board().ok_or(RegistryError::NoFreeBoard)?.name()),
        };

        let mut session = Session::new(name.to_string(), now);
        let board = self
            .boards
            .get_mut(&board_key)
            .ok_or(RegistryError::NoFreeBoard)?;
        board.occupant = Some(session.name.clone());
        session.board = Some(board.name.clone());
        session.phase = SessionPhase::Setup;

        tracing::info!(session = %name, board = %board.name, "Session created");
        Ok(self.sessions.entry(k).or_insert(session))
    }

    /// Seat `participant` on `side` and make this their current session.
    /// The session becomes `Active` once both seats are filled.
    pub fn attach_participant(
        &mut self,
        session: &str,
        participant: &str,
        side: Side,
        now: u64,
    ) -> Result<SessionPhase, RegistryError> {
        let k = key(session);
        let s = self.attachable(&k, session, participant)?;
        if let Some(seated) = s.side_of(participant).filter(|&seated| seated != side) {
            return Err(RegistryError::SelfPlay {
                session: s.name.clone(),
                participant: participant.to_string(),
                seated,
            });
        }
        if let Some(occupant) = s.player(side) {
            if occupant != participant {
                return Err(RegistryError::SideTaken {
                    session: s.name.clone(),
                    side,
                    occupant: occupant.to_string(),
                });
            }
        }

        let s = self
            .sessions
            .get_mut(&k)
            .ok_or_else(|| RegistryError::session_not_found(session))?;
        *s.seat_mut(side) = Some(participant.to_string());
        if s.phase == SessionPhase::Setup && s.white.is_some() && s.black.is_some() {
            s.phase = SessionPhase::Active;
            s.started_at = Some(now);
            tracing::info!(session = %s.name, "Session active");
        }
        let phase = s.phase;

        self.attachments.insert(participant.to_string(), k);
        Ok(phase)
    }

    /// Make `session` the participant's current session without seating them.
    pub fn watch_session(&mut self, session: &str, participant: &str) -> Result<(), RegistryError> {
        let k = key(session);
        self.attachable(&k, session, participant)?;
        self.attachments.insert(participant.to_string(), k);
        Ok(())
    }

    /// Clear the participant's current session. Returns the session name it
    /// pointed at, if any.
    pub fn detach_participant(&mut self, participant: &str) -> Option<String> {
        let k = self.attachments.remove(participant)?;
        self.sessions.get(&k).map(|s| s.name.clone())
    }

    /// Append a SAN move to an active session's movetext.
    pub fn record_move(&mut self, session: &str, san: &str) -> Result<usize, RegistryError> {
        let s = self
            .sessions
            .get_mut(&key(session))
            .ok_or_else(|| RegistryError::session_not_found(session))?;
        match s.phase {
            SessionPhase::Active => {
                s.moves.push(san.to_string());
                Ok(s.moves.len())
            }
            SessionPhase::Finished => Err(RegistryError::SessionFinished(s.name.clone())),
            from => Err(RegistryError::InvalidTransition {
                session: s.name.clone(),
                from,
                to: SessionPhase::Active,
            }),
        }
    }

    /// `Active -> Finished`. Releases the board, clears every attachment to
    /// the session and returns the result record for the log.
    pub fn finish_session(
        &mut self,
        name: &str,
        outcome: Outcome,
        now: u64,
    ) -> Result<ResultRecord, RegistryError> {
        let k = key(name);
        let s = self
            .sessions
            .get_mut(&k)
            .ok_or_else(|| RegistryError::session_not_found(name))?;

        let invalid = |s: &Session| RegistryError::InvalidTransition {
            session: s.name.clone(),
            from: s.phase,
            to: SessionPhase::Finished,
        };
        if s.phase != SessionPhase::Active {
            return Err(invalid(&*s));
        }
        let (Some(white), Some(black)) = (s.white.clone(), s.black.clone()) else {
            return Err(invalid(&*s));
        };

        let record = ResultRecord {
            session_name: s.name.clone(),
            white,
            black,
            started_at: s.started_at.unwrap_or(s.created_at),
            ended_at: now,
            outcome,
            movetext: format_movetext(&s.moves, outcome.tag()),
        };

        s.phase = SessionPhase::Finished;
        s.finished_at = Some(now);
        let board = s.board.take();

        if let Some(b) = board {
            self.release_board(&b);
        }
        self.clear_attachments(&k);

        tracing::info!(session = %record.session_name, result = %record.tag(), "Session finished");
        Ok(record)
    }

    /// Remove a session in any phase. An active session is first finished
    /// as an abandonment, and that record is returned.
    pub fn destroy_session(
        &mut self,
        name: &str,
        now: u64,
    ) -> Result<Option<ResultRecord>, RegistryError> {
        let k = key(name);
        let phase = self
            .sessions
            .get(&k)
            .map(|s| s.phase)
            .ok_or_else(|| RegistryError::session_not_found(name))?;

        let record = if phase == SessionPhase::Active {
            Some(self.finish_session(name, Outcome::Abandonment { loser: None }, now)?)
        } else {
            None
        };

        if let Some(session) = self.sessions.remove(&k) {
            if let Some(b) = &session.board {
                self.release_board(b);
            }
            tracing::info!(session = %session.name, "Session destroyed");
        }
        self.clear_attachments(&k);
        Ok(record)
    }

    /// Destroy finished sessions whose grace period has run out. Returns
    /// their names in listing order.
    pub fn reap_finished(&mut self, now: u64, grace_ms: u64) -> Vec<String> {
        let mut expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, s)| {
                s.phase == SessionPhase::Finished
                    && s.finished_at
                        .is_some_and(|t| now.saturating_sub(t) >= grace_ms)
            })
            .map(|(k, _)| k.clone())
            .collect();
        expired.sort();

        expired
            .into_iter()
            .filter_map(|k| self.sessions.remove(&k))
            .map(|s| {
                tracing::info!(session = %s.name, "Finished session expired");
                s.name
            })
            .collect()
    }

    // ── Lookups ────────────────────────────────────────────────────────

    pub fn session_by_name(&self, name: &str) -> Option<&Session> {
        self.sessions.get(&key(name))
    }

    pub fn session_for_participant(&self, participant: &str) -> Option<&Session> {
        self.attachments
            .get(participant)
            .and_then(|k| self.sessions.get(k))
    }

    pub fn list_sessions(&self) -> Vec<&Session> {
        sorted_values(&self.sessions)
    }

    /// `(participant, session name)` pairs sorted by participant.
    pub fn current_sessions(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .attachments
            .iter()
            .filter_map(|(p, k)| self.sessions.get(k).map(|s| (p.as_str(), s.name.as_str())))
            .collect();
        pairs.sort();
        pairs
    }

    // ── Internals ──────────────────────────────────────────────────────

    /// Shared checks for seating and watching.
    fn attachable(
        &self,
        k: &str,
        session: &str,
        participant: &str,
    ) -> Result<&Session, RegistryError> {
        let s = self
            .sessions
            .get(k)
            .ok_or_else(|| RegistryError::session_not_found(session))?;
        if s.phase == SessionPhase::Finished {
            return Err(RegistryError::SessionFinished(s.name.clone()));
        }
        if let Some(current) = self.attachments.get(participant) {
            if current != k {
                let current_name = self
                    .sessions
                    .get(current)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| current.clone());
                return Err(RegistryError::AlreadyAttached {
                    participant: participant.to_string(),
                    session: current_name,
                });
            }
        }
        Ok(s)
    }

    fn release_board(&mut self, board: &str) {
        if let Some(b) = self.boards.get_mut(&key(board)) {
            b.occupant = None;
        }
    }

    fn clear_attachments(&mut self, session_key: &str) {
        self.attachments.retain(|_, k| k != session_key);
    }
}

fn sorted_values<T>(map: &HashMap<String, T>) -> Vec<&T> {
    let mut entries: Vec<(&String, &T)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries.into_iter().map(|(_, v)| v).collect()
}

#[cfg(test)]
impl SessionRegistry {
    /// Cross-structure consistency checks used by the tests.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        for (bk, board) in &self.boards {
            if let Some(occupant) = &board.occupant {
                let s = self
                    .sessions
                    .get(&key(occupant))
                    .ok_or_else(|| format!("board {} held by missing session {}", bk, occupant))?;
                if s.board.as_deref().map(key) != Some(bk.clone()) {
                    return Err(format!("board {} and session {} disagree", bk, s.name));
                }
            }
        }
        for (sk, s) in &self.sessions {
            if let Some(b) = &s.board {
                let board = self
                    .boards
                    .get(&key(b))
                    .ok_or_else(|| format!("session {} on missing board {}", sk, b))?;
                if board.occupant.as_deref().map(key) != Some(sk.clone()) {
                    return Err(format!("session {} claims board {} it does not hold", sk, b));
                }
            }
            if s.white.is_some() && s.white == s.black {
                return Err(format!("session {} has the same player on both sides", sk));
            }
            if s.phase == SessionPhase::Finished && s.board.is_some() {
                return Err(format!("finished session {} still holds a board", sk));
            }
        }
        for (p, sk) in &self.attachments {
            let s = self
                .sessions
                .get(sk)
                .ok_or_else(|| format!("{} attached to missing session {}", p, sk))?;
            if s.phase == SessionPhase::Finished {
                return Err(format!("{} attached to finished session {}", p, sk));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ResultTag;
    use proptest::prelude::*;

    fn registry_with_boards(names: &[&str]) -> SessionRegistry {
        let mut reg = SessionRegistry::new();
        for name in names {
            reg.add_board(name).unwrap();
        }
        reg
    }

    fn active_session(reg: &mut SessionRegistry, name: &str, white: &str, black: &str) {
        reg.create_session(name, None, 100).unwrap();
        reg.attach_participant(name, white, Side::White, 100).unwrap();
        reg.attach_participant(name, black, Side::Black, 150).unwrap();
    }

    #[test]
    fn test_first_free_board_in_name_order() {
        let mut reg = registry_with_boards(&["B", "A"]);
        assert_eq!(reg.create_session("g1", None, 0).unwrap().board(), Some("A"));
        assert_eq!(reg.create_session("g2", None, 0).unwrap().board(), Some("B"));
        assert_eq!(
            reg.create_session("g3", None, 0).unwrap_err(),
            RegistryError::NoFreeBoard
        );
        reg.check_invariants().unwrap();
    }

    #[test]
    fn test_session_names_are_case_insensitive() {
        let mut reg = registry_with_boards(&["A", "B"]);
        reg.create_session("Game", None, 0).unwrap();
        assert!(matches!(
            reg.create_session("GAME", None, 0),
            Err(RegistryError::DuplicateName { kind: "session", .. })
        ));
        assert_eq!(reg.session_by_name("game").unwrap().name(), "Game");
    }

    #[test]
    fn test_explicit_board_must_exist_and_be_free() {
        let mut reg = registry_with_boards(&["A"]);
        assert!(matches!(
            reg.create_session("g1", Some("Z"), 0),
            Err(RegistryError::NotFound { kind: "board", .. })
        ));
        reg.create_session("g1", Some("a"), 0).unwrap();
        assert!(matches!(
            reg.create_session("g2", Some("A"), 0),
            Err(RegistryError::BoardInUse { .. })
        ));
    }

    #[test]
    fn test_both_seats_activate_session() {
        let mut reg = registry_with_boards(&["A"]);
        reg.create_session("g1", None, 0).unwrap();
        assert_eq!(
            reg.attach_participant("g1", "alice", Side::White, 10).unwrap(),
            SessionPhase::Setup
        );
        assert_eq!(
            reg.attach_participant("g1", "bob", Side::Black, 20).unwrap(),
            SessionPhase::Active
        );
        assert_eq!(reg.session_by_name("g1").unwrap().started_at(), Some(20));
    }

    #[test]
    fn test_attach_rejects_second_session() {
        let mut reg = registry_with_boards(&["A", "B"]);
        reg.create_session("g1", None, 0).unwrap();
        reg.create_session("g2", None, 0).unwrap();
        reg.attach_participant("g1", "alice", Side::White, 0).unwrap();
        assert_eq!(
            reg.attach_participant("g2", "alice", Side::Black, 0),
            Err(RegistryError::AlreadyAttached {
                participant: "alice".to_string(),
                session: "g1".to_string(),
            })
        );
        // Re-attaching to the same session is fine
        reg.attach_participant("g1", "alice", Side::White, 0).unwrap();
    }

    #[test]
    fn test_attach_rejects_taken_side() {
        let mut reg = registry_with_boards(&["A"]);
        reg.create_session("g1", None, 0).unwrap();
        reg.attach_participant("g1", "alice", Side::White, 0).unwrap();
        assert!(matches!(
            reg.attach_participant("g1", "bob", Side::White, 0),
            Err(RegistryError::SideTaken { side: Side::White, .. })
        ));
        assert!(reg.session_for_participant("bob").is_none());
    }

    #[test]
    fn test_attach_rejects_playing_both_sides() {
        let mut reg = registry_with_boards(&["A"]);
        reg.create_session("g1", None, 0).unwrap();
        reg.attach_participant("g1", "alice", Side::White, 0).unwrap();
        assert_eq!(
            reg.attach_participant("g1", "alice", Side::Black, 0),
            Err(RegistryError::SelfPlay {
                session: "g1".to_string(),
                participant: "alice".to_string(),
                seated: Side::White,
            })
        );
        let s = reg.session_by_name("g1").unwrap();
        assert_eq!(s.phase(), SessionPhase::Setup);
        assert_eq!(s.player(Side::Black), None);
        assert_eq!(s.side_of("alice"), Some(Side::White));
        reg.check_invariants().unwrap();
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut reg = registry_with_boards(&["A"]);
        reg.create_session("g1", None, 0).unwrap();
        reg.watch_session("g1", "carol").unwrap();
        assert_eq!(reg.detach_participant("carol"), Some("g1".to_string()));
        assert_eq!(reg.detach_participant("carol"), None);
        assert!(reg.session_for_participant("carol").is_none());
    }

    #[test]
    fn test_finish_releases_board_and_attachments() {
        let mut reg = registry_with_boards(&["A", "B"]);
        active_session(&mut reg, "g1", "alice", "bob");
        reg.watch_session("g1", "carol").unwrap();
        reg.record_move("g1", "e4").unwrap();
        reg.record_move("g1", "e5").unwrap();

        let record = reg
            .finish_session("g1", Outcome::WhiteWinByCheckmate, 500)
            .unwrap();
        assert_eq!(record.winner(), Some("alice"));
        assert_eq!(record.started_at, 150);
        assert_eq!(record.ended_at, 500);
        assert_eq!(record.movetext, "1. e4 e5 1-0");

        assert!(reg.board_by_name("A").unwrap().is_free());
        assert!(reg.session_for_participant("alice").is_none());
        assert!(reg.session_for_participant("bob").is_none());
        assert!(reg.session_for_participant("carol").is_none());
        assert_eq!(
            reg.session_by_name("g1").unwrap().phase(),
            SessionPhase::Finished
        );
        reg.check_invariants().unwrap();
    }

    #[test]
    fn test_finish_twice_is_invalid_transition() {
        let mut reg = registry_with_boards(&["A"]);
        active_session(&mut reg, "g1", "alice", "bob");
        reg.finish_session("g1", Outcome::DrawAgreed, 1).unwrap();
        assert!(matches!(
            reg.finish_session("g1", Outcome::DrawAgreed, 2),
            Err(RegistryError::InvalidTransition {
                from: SessionPhase::Finished,
                to: SessionPhase::Finished,
                ..
            })
        ));
    }

    #[test]
    fn test_finish_during_setup_is_invalid() {
        let mut reg = registry_with_boards(&["A"]);
        reg.create_session("g1", None, 0).unwrap();
        assert!(matches!(
            reg.finish_session("g1", Outcome::Stalemate, 1),
            Err(RegistryError::InvalidTransition {
                from: SessionPhase::Setup,
                ..
            })
        ));
        assert!(!reg.board_by_name("A").unwrap().is_free());
    }

    #[test]
    fn test_finished_session_rejects_attach_and_moves() {
        let mut reg = registry_with_boards(&["A"]);
        active_session(&mut reg, "g1", "alice", "bob");
        reg.finish_session("g1", Outcome::BlackWinByCheckmate, 1).unwrap();
        assert_eq!(
            reg.attach_participant("g1", "alice", Side::White, 2),
            Err(RegistryError::SessionFinished("g1".to_string()))
        );
        assert_eq!(
            reg.watch_session("g1", "carol"),
            Err(RegistryError::SessionFinished("g1".to_string()))
        );
        assert_eq!(
            reg.record_move("g1", "Nf3"),
            Err(RegistryError::SessionFinished("g1".to_string()))
        );
    }

    #[test]
    fn test_destroy_active_session_abandons() {
        let mut reg = registry_with_boards(&["A"]);
        active_session(&mut reg, "g1", "alice", "bob");
        let record = reg.destroy_session("g1", 10).unwrap().unwrap();
        assert_eq!(record.outcome, Outcome::Abandonment { loser: None });
        assert_eq!(record.tag(), ResultTag::Undecided);
        assert!(reg.session_by_name("g1").is_none());
        assert!(reg.board_by_name("A").unwrap().is_free());
        assert!(matches!(
            reg.destroy_session("g1", 11),
            Err(RegistryError::NotFound { kind: "session", .. })
        ));
        reg.check_invariants().unwrap();
    }

    #[test]
    fn test_destroy_setup_session_releases_board() {
        let mut reg = registry_with_boards(&["A"]);
        reg.create_session("g1", None, 0).unwrap();
        reg.attach_participant("g1", "alice", Side::White, 0).unwrap();
        assert_eq!(reg.destroy_session("g1", 1).unwrap(), None);
        assert!(reg.board_by_name("A").unwrap().is_free());
        assert!(reg.session_for_participant("alice").is_none());
        // The name is free again
        reg.create_session("g1", None, 2).unwrap();
    }

    #[test]
    fn test_remove_board_refused_while_occupied() {
        let mut reg = registry_with_boards(&["A"]);
        reg.create_session("g1", None, 0).unwrap();
        assert!(matches!(
            reg.remove_board("A"),
            Err(RegistryError::BoardInUse { .. })
        ));
        reg.destroy_session("g1", 0).unwrap();
        reg.remove_board("a").unwrap();
        assert!(reg.board_by_name("A").is_none());
    }

    #[test]
    fn test_reap_respects_grace_period() {
        let mut reg = registry_with_boards(&["A", "B"]);
        active_session(&mut reg, "g1", "alice", "bob");
        active_session(&mut reg, "g2", "carol", "dave");
        reg.finish_session("g1", Outcome::DrawByRule, 1_000).unwrap();
        reg.finish_session("g2", Outcome::DrawByRule, 20_000).unwrap();

        assert!(reg.reap_finished(30_000, 30_000).is_empty());
        assert_eq!(reg.reap_finished(31_000, 30_000), vec!["g1".to_string()]);
        assert!(reg.session_by_name("g1").is_none());
        assert!(reg.session_by_name("g2").is_some());
    }

    #[test]
    fn test_listings_are_sorted() {
        let mut reg = registry_with_boards(&["b2", "A1", "c3"]);
        reg.create_session("zeta", None, 0).unwrap();
        reg.create_session("Alpha", None, 0).unwrap();
        let boards: Vec<&str> = reg.list_boards().iter().map(|b| b.name()).collect();
        assert_eq!(boards, vec!["A1", "b2", "c3"]);
        let sessions: Vec<&str> = reg.list_sessions().iter().map(|s| s.name()).collect();
        assert_eq!(sessions, vec!["Alpha", "zeta"]);

        reg.watch_session("zeta", "yan").unwrap();
        reg.watch_session("Alpha", "bea").unwrap();
        assert_eq!(
            reg.current_sessions(),
            vec![("bea", "Alpha"), ("yan", "zeta")]
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create(u8),
        Attach(u8, u8, bool),
        /// Same participant tries both seats.
        SeatTwice(u8, u8),
        Watch(u8, u8),
        Detach(u8),
        Finish(u8),
        Destroy(u8),
        Reap,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..5).prop_map(Op::Create),
            (0u8..5, 0u8..6, any::<bool>()).prop_map(|(s, p, w)| Op::Attach(s, p, w)),
            (0u8..5, 0u8..6).prop_map(|(s, p)| Op::SeatTwice(s, p)),
            (0u8..5, 0u8..6).prop_map(|(s, p)| Op::Watch(s, p)),
            (0u8..6).prop_map(Op::Detach),
            (0u8..5).prop_map(Op::Finish),
            (0u8..5).prop_map(Op::Destroy),
            Just(Op::Reap),
        ]
    }

    proptest! {
        #[test]
        fn prop_boards_and_attachments_stay_consistent(ops in prop::collection::vec(op_strategy(), 1..60)) {
            let mut reg = registry_with_boards(&["A", "B", "C"]);
            for (now, op) in ops.into_iter().enumerate() {
                let now = now as u64;
                match op {
                    Op::Create(s) => { let _ = reg.create_session(&format!("g{}", s), None, now); }
                    Op::Attach(s, p, white) => {
                        let side = if white { Side::White } else { Side::Black };
                        let _ = reg.attach_participant(&format!("g{}", s), &format!("p{}", p), side, now);
                    }
                    Op::SeatTwice(s, p) => {
                        let (name, who) = (format!("g{}", s), format!("p{}", p));
                        let _ = reg.attach_participant(&name, &who, Side::White, now);
                        let _ = reg.attach_participant(&name, &who, Side::Black, now);
                    }
                    Op::Watch(s, p) => { let _ = reg.watch_session(&format!("g{}", s), &format!("p{}", p)); }
                    Op::Detach(p) => { reg.detach_participant(&format!("p{}", p)); }
                    Op::Finish(s) => { let _ = reg.finish_session(&format!("g{}", s), Outcome::DrawAgreed, now); }
                    Op::Destroy(s) => { let _ = reg.destroy_session(&format!("g{}", s), now); }
                    Op::Reap => { reg.reap_finished(now, 5); }
                }
                prop_assert!(reg.check_invariants().is_ok(), "{:?}", reg.check_invariants());

                let mut held: Vec<&str> = reg.list_sessions().iter().filter_map(|s| s.board()).collect();
                let total = held.len();
                held.sort();
                held.dedup();
                prop_assert_eq!(held.len(), total);
            }
        }
    }
}
