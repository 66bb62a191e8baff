use cozy_chess::{Board as Position, Move};
use engine::{SearchError, TimeControl};
use tokio::sync::{broadcast, oneshot};
use uuid::Uuid;

use super::events::CoreEvent;
use crate::error::CoreError;
use crate::ranking::RankEntry;
use crate::record::{Outcome, ResultRecord, Side, Tally};
use crate::registry::{Board, Session};

/// Identifies one AI search. Only the newest ticket of a live session
/// incarnation may change that session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AiTicket {
    pub session_id: Uuid,
    pub seq: u64,
}

type Reply<T> = oneshot::Sender<Result<T, CoreError>>;

/// Commands sent to the coordinator. Each embeds a oneshot for the reply.
pub enum CoordinatorCommand {
    AddBoard {
        name: String,
        reply: Reply<Board>,
    },
    RemoveBoard {
        name: String,
        reply: Reply<()>,
    },
    ListBoards {
        reply: oneshot::Sender<Vec<Board>>,
    },
    GetBoard {
        name: String,
        reply: oneshot::Sender<Option<Board>>,
    },
    CreateSession {
        name: String,
        board: Option<String>,
        reply: Reply<Session>,
    },
    AttachParticipant {
        session: String,
        participant: String,
        side: Side,
        reply: Reply<Session>,
    },
    WatchSession {
        session: String,
        participant: String,
        reply: Reply<()>,
    },
    DetachParticipant {
        participant: String,
        reply: oneshot::Sender<Option<String>>,
    },
    RecordMove {
        session: String,
        san: String,
        reply: Reply<usize>,
    },
    FinishSession {
        session: String,
        outcome: Outcome,
        reply: Reply<ResultRecord>,
    },
    DestroySession {
        session: String,
        reply: Reply<Option<ResultRecord>>,
    },
    GetSession {
        name: String,
        reply: oneshot::Sender<Option<Session>>,
    },
    SessionForParticipant {
        participant: String,
        reply: oneshot::Sender<Option<Session>>,
    },
    ListSessions {
        reply: oneshot::Sender<Vec<Session>>,
    },
    CurrentSessions {
        reply: oneshot::Sender<Vec<(String, String)>>,
    },
    RequestAiMove {
        session: String,
        fen: String,
        side: Side,
        time_control: Option<TimeControl>,
        reply: Reply<AiTicket>,
    },
    /// Posted back by a finished search task.
    AiMoveReady {
        ticket: AiTicket,
        session: String,
        position: Position,
        result: Result<Move, SearchError>,
    },
    Standings {
        view: String,
        reply: Reply<Vec<RankEntry>>,
    },
    RankOf {
        view: String,
        participant: String,
        reply: Reply<Option<usize>>,
    },
    Stats {
        participant: String,
        reply: Reply<Tally>,
    },
    Rebuild {
        reply: Reply<u64>,
    },
    SeedTestData {
        players: usize,
        games: usize,
        seed: u64,
        reply: Reply<usize>,
    },
    PurgeTestData {
        reply: Reply<u64>,
    },
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<CoreEvent>>,
    },
    Shutdown,
}
