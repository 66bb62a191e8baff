use engine::TimeControl;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::*;
use super::events::CoreEvent;
use crate::error::CoreError;
use crate::ranking::RankEntry;
use crate::record::{Outcome, ResultRecord, Side, Tally};
use crate::registry::{Board, Session};

/// Cheap, cloneable handle to the coordinator task.
#[derive(Clone)]
pub struct CoordinatorHandle {
    cmd_tx: mpsc::Sender<CoordinatorCommand>,
}

fn reply_dropped() -> CoreError {
    CoreError::Internal("Reply dropped".into())
}

impl CoordinatorHandle {
    pub(crate) fn new(cmd_tx: mpsc::Sender<CoordinatorCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Send a command whose reply carries its own result.
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, CoreError>>) -> CoordinatorCommand,
    ) -> Result<T, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| reply_dropped())?
    }

    /// Send a read-only query.
    async fn query<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CoordinatorCommand,
    ) -> Result<T, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx)).await?;
        rx.await.map_err(|_| reply_dropped())
    }

    // ── Boards ─────────────────────────────────────────────────────────

    pub async fn add_board(&self, name: &str) -> Result<Board, CoreError> {
        let name = name.to_string();
        self.request(|reply| CoordinatorCommand::AddBoard { name, reply })
            .await
    }

    pub async fn remove_board(&self, name: &str) -> Result<(), CoreError> {
        let name = name.to_string();
        self.request(|reply| CoordinatorCommand::RemoveBoard { name, reply })
            .await
    }

    pub async fn list_boards(&self) -> Result<Vec<Board>, CoreError> {
        self.query(|reply| CoordinatorCommand::ListBoards { reply })
            .await
    }

    pub async fn board_by_name(&self, name: &str) -> Result<Option<Board>, CoreError> {
        let name = name.to_string();
        self.query(|reply| CoordinatorCommand::GetBoard { name, reply })
            .await
    }

    // ── Sessions ───────────────────────────────────────────────────────

    pub async fn create_session(
        &self,
        name: &str,
        board: Option<&str>,
    ) -> Result<Session, CoreError> {
        let name = name.to_string();
        let board = board.map(str::to_string);
        self.request(|reply| CoordinatorCommand::CreateSession { name, board, reply })
            .await
    }

    pub async fn attach_participant(
        &self,
        session: &str,
        participant: &str,
        side: Side,
    ) -> Result<Session, CoreError> {
        let session = session.to_string();
        let participant = participant.to_string();
        self.request(|reply| CoordinatorCommand::AttachParticipant {
            session,
            participant,
            side,
            reply,
        })
        .await
    }

    pub async fn watch_session(&self, session: &str, participant: &str) -> Result<(), CoreError> {
        let session = session.to_string();
        let participant = participant.to_string();
        self.request(|reply| CoordinatorCommand::WatchSession {
            session,
            participant,
            reply,
        })
        .await
    }

    pub async fn detach_participant(&self, participant: &str) -> Result<Option<String>, CoreError> {
        let participant = participant.to_string();
        self.query(|reply| CoordinatorCommand::DetachParticipant { participant, reply })
            .await
    }

    pub async fn record_move(&self, session: &str, san: &str) -> Result<usize, CoreError> {
        let session = session.to_string();
        let san = san.to_string();
        self.request(|reply| CoordinatorCommand::RecordMove { session, san, reply })
            .await
    }

    pub async fn finish_session(
        &self,
        session: &str,
        outcome: Outcome,
    ) -> Result<ResultRecord, CoreError> {
        let session = session.to_string();
        self.request(|reply| CoordinatorCommand::FinishSession {
            session,
            outcome,
            reply,
        })
        .await
    }

    pub async fn destroy_session(&self, session: &str) -> Result<Option<ResultRecord>, CoreError> {
        let session = session.to_string();
        self.request(|reply| CoordinatorCommand::DestroySession { session, reply })
            .await
    }

    pub async fn session_by_name(&self, name: &str) -> Result<Option<Session>, CoreError> {
        let name = name.to_string();
        self.query(|reply| CoordinatorCommand::GetSession { name, reply })
            .await
    }

    pub async fn session_for_participant(
        &self,
        participant: &str,
    ) -> Result<Option<Session>, CoreError> {
        let participant = participant.to_string();
        self.query(|reply| CoordinatorCommand::SessionForParticipant { participant, reply })
            .await
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>, CoreError> {
        self.query(|reply| CoordinatorCommand::ListSessions { reply })
            .await
    }

    pub async fn current_sessions(&self) -> Result<Vec<(String, String)>, CoreError> {
        self.query(|reply| CoordinatorCommand::CurrentSessions { reply })
            .await
    }

    /// Start a search for `side` in the position given by `fen`. The move
    /// arrives later as [`CoreEvent::AiMoved`] or [`CoreEvent::AiFailed`].
    pub async fn request_ai_move(
        &self,
        session: &str,
        fen: &str,
        side: Side,
        time_control: Option<TimeControl>,
    ) -> Result<AiTicket, CoreError> {
        let session = session.to_string();
        let fen = fen.to_string();
        self.request(|reply| CoordinatorCommand::RequestAiMove {
            session,
            fen,
            side,
            time_control,
            reply,
        })
        .await
    }

    // ── Results ────────────────────────────────────────────────────────

    pub async fn standings(&self, view: &str) -> Result<Vec<RankEntry>, CoreError> {
        let view = view.to_string();
        self.request(|reply| CoordinatorCommand::Standings { view, reply })
            .await
    }

    pub async fn rank_of(&self, view: &str, participant: &str) -> Result<Option<usize>, CoreError> {
        let view = view.to_string();
        let participant = participant.to_string();
        self.request(|reply| CoordinatorCommand::RankOf {
            view,
            participant,
            reply,
        })
        .await
    }

    pub async fn stats(&self, participant: &str) -> Result<Tally, CoreError> {
        let participant = participant.to_string();
        self.request(|reply| CoordinatorCommand::Stats { participant, reply })
            .await
    }

    pub async fn rebuild(&self) -> Result<u64, CoreError> {
        self.request(|reply| CoordinatorCommand::Rebuild { reply })
            .await
    }

    pub async fn seed_test_data(
        &self,
        players: usize,
        games: usize,
        seed: u64,
    ) -> Result<usize, CoreError> {
        self.request(|reply| CoordinatorCommand::SeedTestData {
            players,
            games,
            seed,
            reply,
        })
        .await
    }

    pub async fn purge_test_data(&self) -> Result<u64, CoreError> {
        self.request(|reply| CoordinatorCommand::PurgeTestData { reply })
            .await
    }

    pub async fn subscribe(&self) -> Result<broadcast::Receiver<CoreEvent>, CoreError> {
        self.query(|reply| CoordinatorCommand::Subscribe { reply })
            .await
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(CoordinatorCommand::Shutdown).await;
    }

    async fn send(&self, cmd: CoordinatorCommand) -> Result<(), CoreError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| CoreError::Internal("Coordinator closed".into()))
    }
}
