use std::collections::HashMap;

use cozy_chess::{Board as Position, Move};
use engine::uci::format_uci_move;
use engine::{format_san, AiEngine, SearchBackend, SearchError, SearchRequest, TimeControl};
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::Instrument;
use uuid::Uuid;

use super::commands::*;
use super::events::CoreEvent;
use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::persistence::now_millis;
use crate::persistence::traits::ResultsRepository;
use crate::record::{Outcome, ResultRecord, Side};
use crate::registry::{RegistryError, Session, SessionPhase, SessionRegistry};
use crate::results::Results;

/// Owns the registry and the results. Every mutation of either happens on
/// the coordinator task, one command at a time.
pub(crate) struct Coordinator<R> {
    registry: SessionRegistry,
    results: Results<R>,
    engine: AiEngine,
    config: CoordinatorConfig,
    events: broadcast::Sender<CoreEvent>,
    /// For search tasks to post results back. Weak so that dropping every
    /// handle still stops the loop.
    self_tx: mpsc::WeakSender<CoordinatorCommand>,
    /// Session incarnation -> newest outstanding search.
    ai_requests: HashMap<Uuid, u64>,
    next_ticket: u64,
}

/// The main coordinator loop.
pub(crate) async fn run_coordinator<R: ResultsRepository>(
    coordinator: Coordinator<R>,
    cmd_rx: mpsc::Receiver<CoordinatorCommand>,
) {
    run_coordinator_inner(coordinator, cmd_rx)
        .instrument(tracing::info_span!("coordinator"))
        .await;
}

async fn run_coordinator_inner<R: ResultsRepository>(
    mut coordinator: Coordinator<R>,
    mut cmd_rx: mpsc::Receiver<CoordinatorCommand>,
) {
    tracing::info!("Coordinator started");

    let reaping = coordinator.config.finished_grace.is_some();
    let mut reap_interval = time::interval(coordinator.config.reap_interval);
    reap_interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(CoordinatorCommand::Shutdown) | None => {
                        tracing::info!("Coordinator shutting down");
                        break;
                    }
                    Some(cmd) => coordinator.handle_command(cmd).await,
                }
            }

            _ = reap_interval.tick(), if reaping => {
                coordinator.reap_expired(now_millis());
            }
        }
    }

    tracing::info!("Coordinator exited");
}

impl<R: ResultsRepository> Coordinator<R> {
    pub(crate) fn new(
        results: Results<R>,
        config: CoordinatorConfig,
        events: broadcast::Sender<CoreEvent>,
        self_tx: mpsc::WeakSender<CoordinatorCommand>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            results,
            engine: AiEngine::from_config(&config.search),
            config,
            events,
            self_tx,
            ai_requests: HashMap::new(),
            next_ticket: 0,
        }
    }

    async fn handle_command(&mut self, cmd: CoordinatorCommand) {
        match cmd {
            CoordinatorCommand::AddBoard { name, reply } => {
                let result = self.registry.add_board(&name).cloned();
                let _ = reply.send(result.map_err(Into::into));
            }
            CoordinatorCommand::RemoveBoard { name, reply } => {
                let _ = reply.send(self.registry.remove_board(&name).map_err(Into::into));
            }
            CoordinatorCommand::ListBoards { reply } => {
                let _ = reply.send(self.registry.list_boards().into_iter().cloned().collect());
            }
            CoordinatorCommand::GetBoard { name, reply } => {
                let _ = reply.send(self.registry.board_by_name(&name).cloned());
            }
            CoordinatorCommand::CreateSession { name, board, reply } => {
                let result = self.create_session(&name, board.as_deref()).await;
                let _ = reply.send(result);
            }
            CoordinatorCommand::AttachParticipant {
                session,
                participant,
                side,
                reply,
            } => {
                let _ = reply.send(self.attach_participant(&session, &participant, side));
            }
            CoordinatorCommand::WatchSession {
                session,
                participant,
                reply,
            } => {
                let result = self.registry.watch_session(&session, &participant);
                let _ = reply.send(result.map_err(Into::into));
            }
            CoordinatorCommand::DetachParticipant { participant, reply } => {
                let _ = reply.send(self.registry.detach_participant(&participant));
            }
            CoordinatorCommand::RecordMove { session, san, reply } => {
                let result = self.registry.record_move(&session, &san);
                let _ = reply.send(result.map_err(Into::into));
            }
            CoordinatorCommand::FinishSession {
                session,
                outcome,
                reply,
            } => {
                let result = self.finish_session(&session, outcome).await;
                let _ = reply.send(result);
            }
            CoordinatorCommand::DestroySession { session, reply } => {
                let result = self.destroy_session(&session).await;
                let _ = reply.send(result);
            }
            CoordinatorCommand::GetSession { name, reply } => {
                let _ = reply.send(self.registry.session_by_name(&name).cloned());
            }
            CoordinatorCommand::SessionForParticipant { participant, reply } => {
                let _ = reply.send(self.registry.session_for_participant(&participant).cloned());
            }
            CoordinatorCommand::ListSessions { reply } => {
                let _ = reply.send(self.registry.list_sessions().into_iter().cloned().collect());
            }
            CoordinatorCommand::CurrentSessions { reply } => {
                let pairs = self
                    .registry
                    .current_sessions()
                    .into_iter()
                    .map(|(p, s)| (p.to_string(), s.to_string()))
                    .collect();
                let _ = reply.send(pairs);
            }
            CoordinatorCommand::RequestAiMove {
                session,
                fen,
                side,
                time_control,
                reply,
            } => {
                let _ = reply.send(self.request_ai_move(&session, &fen, side, time_control));
            }
            CoordinatorCommand::AiMoveReady {
                ticket,
                session,
                position,
                result,
            } => {
                self.apply_ai_result(ticket, &session, &position, result);
            }
            CoordinatorCommand::Standings { view, reply } => {
                let result = self.results.ranking().view(&view).map(|v| v.standings());
                let _ = reply.send(result.map_err(Into::into));
            }
            CoordinatorCommand::RankOf {
                view,
                participant,
                reply,
            } => {
                let result = self
                    .results
                    .ranking()
                    .view(&view)
                    .map(|v| v.rank_of(&participant));
                let _ = reply.send(result.map_err(Into::into));
            }
            CoordinatorCommand::Stats { participant, reply } => {
                let result = self.results.stats(&participant).await;
                let _ = reply.send(result.map_err(Into::into));
            }
            CoordinatorCommand::Rebuild { reply } => {
                let _ = reply.send(self.results.rebuild().await.map_err(Into::into));
            }
            CoordinatorCommand::SeedTestData {
                players,
                games,
                seed,
                reply,
            } => {
                let result = self
                    .results
                    .seed_test_data(players, games, seed, now_millis())
                    .await;
                let _ = reply.send(result);
            }
            CoordinatorCommand::PurgeTestData { reply } => {
                let _ = reply.send(self.results.purge_test_data().await);
            }
            CoordinatorCommand::Subscribe { reply } => {
                let _ = reply.send(self.events.subscribe());
            }
            // Handled by the loop
            CoordinatorCommand::Shutdown => {}
        }
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ── Session lifecycle ──────────────────────────────────────────────

    async fn create_session(
        &mut self,
        name: &str,
        board: Option<&str>,
    ) -> Result<Session, CoreError> {
        match self.results.is_recorded(name).await {
            Ok(true) => {
                return Err(RegistryError::DuplicateName {
                    kind: "session",
                    name: name.to_string(),
                }
                .into())
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(session = %name, error = %e, "Could not check results log for name reuse");
            }
        }

        let session = self
            .registry
            .create_session(name, board, now_millis())?
            .clone();
        self.emit(CoreEvent::SessionCreated {
            session: session.name().to_string(),
            board: session.board().unwrap_or_default().to_string(),
        });
        Ok(session)
    }

    fn attach_participant(
        &mut self,
        session: &str,
        participant: &str,
        side: Side,
    ) -> Result<Session, CoreError> {
        let before = self.registry.session_by_name(session).map(Session::phase);
        let phase = self
            .registry
            .attach_participant(session, participant, side, now_millis())?;
        let attached = self
            .registry
            .session_by_name(session)
            .cloned()
            .ok_or_else(|| RegistryError::session_not_found(session))?;

        if before == Some(SessionPhase::Setup) && phase == SessionPhase::Active {
            self.emit(CoreEvent::SessionActive {
                session: attached.name().to_string(),
            });
        }
        Ok(attached)
    }

    async fn finish_session(
        &mut self,
        name: &str,
        outcome: Outcome,
    ) -> Result<ResultRecord, CoreError> {
        let id = self.registry.session_by_name(name).map(Session::id);
        let record = self.registry.finish_session(name, outcome, now_millis())?;
        if let Some(id) = id {
            self.ai_requests.remove(&id);
        }

        self.emit(CoreEvent::SessionFinished {
            session: record.session_name.clone(),
            result: record.tag(),
        });
        self.commit(&record).await;
        Ok(record)
    }

    async fn destroy_session(&mut self, name: &str) -> Result<Option<ResultRecord>, CoreError> {
        let (id, display) = self
            .registry
            .session_by_name(name)
            .map(|s| (s.id(), s.name().to_string()))
            .ok_or_else(|| RegistryError::session_not_found(name))?;

        let record = self.registry.destroy_session(name, now_millis())?;
        self.ai_requests.remove(&id);

        if let Some(record) = &record {
            self.emit(CoreEvent::SessionFinished {
                session: record.session_name.clone(),
                result: record.tag(),
            });
            self.commit(record).await;
        }
        self.emit(CoreEvent::SessionDestroyed { session: display });
        Ok(record)
    }

    /// Hand a finished game to the results log. Registry cleanup has already
    /// happened and stands even if storage fails.
    async fn commit(&mut self, record: &ResultRecord) {
        match self.results.record(record).await {
            Ok(()) => {
                tracing::info!(session = %record.session_name, result = %record.tag(), "Result recorded");
                if self.config.broadcast_results {
                    self.emit(CoreEvent::ResultRecorded(record.clone()));
                }
            }
            Err(e) => {
                tracing::warn!(
                    session = %record.session_name,
                    error = %e,
                    "Result not recorded, it will be missing from rankings"
                );
            }
        }
    }

    fn reap_expired(&mut self, now: u64) -> Vec<String> {
        let Some(grace) = self.config.finished_grace else {
            return Vec::new();
        };
        let reaped = self
            .registry
            .reap_finished(now, grace.as_millis() as u64);
        for session in &reaped {
            self.emit(CoreEvent::SessionDestroyed {
                session: session.clone(),
            });
        }
        reaped
    }

    // ── AI moves ───────────────────────────────────────────────────────

    fn request_ai_move(
        &mut self,
        session: &str,
        fen: &str,
        side: Side,
        time_control: Option<TimeControl>,
    ) -> Result<AiTicket, CoreError> {
        let s = self
            .registry
            .session_by_name(session)
            .ok_or_else(|| RegistryError::session_not_found(session))?;
        match s.phase() {
            SessionPhase::Active => {}
            SessionPhase::Finished => {
                return Err(RegistryError::SessionFinished(s.name().to_string()).into())
            }
            from => {
                return Err(RegistryError::InvalidTransition {
                    session: s.name().to_string(),
                    from,
                    to: SessionPhase::Active,
                }
                .into())
            }
        }
        let (id, name) = (s.id(), s.name().to_string());

        let position: Position = fen
            .parse()
            .map_err(|_| CoreError::InvalidPosition(format!("unparseable FEN '{}'", fen)))?;
        if position.side_to_move() != cozy_chess::Color::from(side) {
            return Err(CoreError::InvalidPosition(format!(
                "{} is not to move in '{}'",
                side, fen
            )));
        }

        let tx = self
            .self_tx
            .upgrade()
            .ok_or_else(|| CoreError::Internal("Coordinator closing".into()))?;
        let ticket = self.issue_ticket(id);
        let engine = self.engine.clone();

        tokio::spawn(
            async move {
                let request = SearchRequest {
                    board: position.clone(),
                    side: side.into(),
                    time_control,
                };
                let result = engine.search(request).await;
                let _ = tx
                    .send(CoordinatorCommand::AiMoveReady {
                        ticket,
                        session: name,
                        position,
                        result,
                    })
                    .await;
            }
            .instrument(tracing::debug_span!("ai_search", seq = ticket.seq)),
        );

        Ok(ticket)
    }

    /// Newer tickets supersede older ones for the same incarnation.
    fn issue_ticket(&mut self, session_id: Uuid) -> AiTicket {
        self.next_ticket += 1;
        self.ai_requests.insert(session_id, self.next_ticket);
        AiTicket {
            session_id,
            seq: self.next_ticket,
        }
    }

    /// Apply a finished search if it is still wanted. Returns whether the
    /// move was recorded.
    fn apply_ai_result(
        &mut self,
        ticket: AiTicket,
        session: &str,
        position: &Position,
        result: Result<Move, SearchError>,
    ) -> bool {
        let live = self
            .registry
            .session_by_name(session)
            .filter(|s| s.id() == ticket.session_id && s.phase() == SessionPhase::Active)
            .map(|s| s.name().to_string());
        let latest = self.ai_requests.get(&ticket.session_id) == Some(&ticket.seq);

        let Some(name) = live.filter(|_| latest) else {
            tracing::debug!(%session, seq = ticket.seq, "Discarding stale AI result");
            return false;
        };
        self.ai_requests.remove(&ticket.session_id);

        let mv = match result {
            Ok(mv) => mv,
            Err(e) => {
                tracing::warn!(session = %name, error = %e, "AI search failed");
                self.emit(CoreEvent::AiFailed {
                    session: name,
                    error: e.to_string(),
                });
                return false;
            }
        };

        let uci = format_uci_move(&mv);
        let recorded = format_san(position, mv)
            .ok_or_else(|| format!("illegal move {}", uci))
            .and_then(|san| {
                self.registry
                    .record_move(&name, &san)
                    .map(|_| san)
                    .map_err(|e| e.to_string())
            });

        match recorded {
            Ok(san) => {
                tracing::debug!(session = %name, %san, "AI move applied");
                self.emit(CoreEvent::AiMoved {
                    session: name,
                    uci,
                    san,
                });
                true
            }
            Err(error) => {
                tracing::warn!(session = %name, %error, "AI move rejected");
                self.emit(CoreEvent::AiFailed {
                    session: name,
                    error,
                });
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::{Database, SqliteResultsRepository};
    use crate::persistence::{PersistenceError, RecordFilter};
    use crate::record::Verdict;
    use engine::uci::parse_uci_move;
    use futures::stream::{self, BoxStream, StreamExt};

    struct FailingRepo;

    fn disk_gone() -> PersistenceError {
        PersistenceError::Io(std::io::Error::other("disk gone"))
    }

    impl ResultsRepository for FailingRepo {
        async fn append(&self, _record: &ResultRecord) -> Result<(), PersistenceError> {
            Err(disk_gone())
        }

        fn load_all(&self) -> BoxStream<'_, Result<ResultRecord, PersistenceError>> {
            stream::empty().boxed()
        }

        async fn contains(&self, _session_name: &str) -> Result<bool, PersistenceError> {
            Err(disk_gone())
        }

        async fn count_where_result(
            &self,
            _participant: &str,
            _verdict: Verdict,
        ) -> Result<u32, PersistenceError> {
            Err(disk_gone())
        }

        async fn purge_matching(&self, _filter: &RecordFilter) -> Result<u64, PersistenceError> {
            Err(disk_gone())
        }
    }

    fn build<R: ResultsRepository>(
        results: Results<R>,
    ) -> (Coordinator<R>, broadcast::Receiver<CoreEvent>) {
        let (event_tx, event_rx) = broadcast::channel(64);
        // No search tasks are spawned in these tests
        let (cmd_tx, _cmd_rx) = mpsc::channel(1);
        let coordinator = Coordinator::new(
            results,
            CoordinatorConfig::default(),
            event_tx,
            cmd_tx.downgrade(),
        );
        (coordinator, event_rx)
    }

    async fn sqlite_coordinator() -> (
        Coordinator<SqliteResultsRepository>,
        broadcast::Receiver<CoreEvent>,
    ) {
        let db = Database::new_in_memory().await.unwrap();
        let results = Results::open(SqliteResultsRepository::new(db.pool().clone()))
            .await
            .unwrap();
        build(results)
    }

    async fn active_game<R: ResultsRepository>(c: &mut Coordinator<R>, name: &str) -> Uuid {
        let _ = c.registry.add_board("A");
        let session = c.create_session(name, None).await.unwrap();
        c.attach_participant(name, "alice", Side::White).unwrap();
        c.attach_participant(name, "bob", Side::Black).unwrap();
        session.id()
    }

    fn e2e4() -> Move {
        parse_uci_move("e2e4").unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<CoreEvent>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[tokio::test]
    async fn test_ai_result_discarded_after_finish() {
        let (mut c, _events) = sqlite_coordinator().await;
        let id = active_game(&mut c, "g1").await;
        let ticket = c.issue_ticket(id);

        c.finish_session("g1", Outcome::DrawAgreed).await.unwrap();
        assert!(!c.apply_ai_result(ticket, "g1", &Position::default(), Ok(e2e4())));
        assert!(c.registry.session_by_name("g1").unwrap().moves().is_empty());
    }

    #[tokio::test]
    async fn test_only_latest_ticket_applies() {
        let (mut c, mut events) = sqlite_coordinator().await;
        let id = active_game(&mut c, "g1").await;
        let first = c.issue_ticket(id);
        let second = c.issue_ticket(id);
        drain(&mut events);

        assert!(!c.apply_ai_result(first, "g1", &Position::default(), Ok(e2e4())));
        assert!(c.apply_ai_result(second, "g1", &Position::default(), Ok(e2e4())));
        // A ticket is consumed once
        assert!(!c.apply_ai_result(second, "g1", &Position::default(), Ok(e2e4())));

        assert_eq!(c.registry.session_by_name("g1").unwrap().moves(), ["e4"]);
        assert_eq!(
            drain(&mut events),
            vec![CoreEvent::AiMoved {
                session: "g1".to_string(),
                uci: "e2e4".to_string(),
                san: "e4".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_ai_result_for_old_incarnation_discarded() {
        let (mut c, _events) = sqlite_coordinator().await;
        c.registry.add_board("A").unwrap();
        let old = c.create_session("g1", None).await.unwrap();
        let stale = c.issue_ticket(old.id());
        // Never played, so the name is free again
        c.destroy_session("g1").await.unwrap();

        let new_id = active_game(&mut c, "g1").await;
        assert_ne!(new_id, old.id());
        assert!(!c.apply_ai_result(stale, "g1", &Position::default(), Ok(e2e4())));
    }

    #[tokio::test]
    async fn test_ai_failure_and_illegal_move_reported() {
        let (mut c, mut events) = sqlite_coordinator().await;
        let id = active_game(&mut c, "g1").await;
        drain(&mut events);

        let t = c.issue_ticket(id);
        assert!(!c.apply_ai_result(t, "g1", &Position::default(), Err(SearchError::Timeout)));
        let t = c.issue_ticket(id);
        let illegal = parse_uci_move("e2e5").unwrap();
        assert!(!c.apply_ai_result(t, "g1", &Position::default(), Ok(illegal)));

        let events = drain(&mut events);
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| matches!(e, CoreEvent::AiFailed { session, .. } if session == "g1")));
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_cleanup() {
        let results = Results::open(FailingRepo).await.unwrap();
        let (mut c, mut events) = build(results);
        // The name-reuse check fails too, creation still goes ahead
        active_game(&mut c, "g1").await;

        let record = c
            .finish_session("g1", Outcome::WhiteWinByCheckmate)
            .await
            .unwrap();
        assert_eq!(record.winner(), Some("alice"));
        assert!(c.registry.board_by_name("A").unwrap().is_free());
        assert!(c.registry.session_for_participant("alice").is_none());
        assert_eq!(c.results.ranking().applied(), 0);
        assert!(!drain(&mut events)
            .iter()
            .any(|e| matches!(e, CoreEvent::ResultRecorded(_))));
    }

    #[tokio::test]
    async fn test_recorded_name_cannot_be_reused() {
        let (mut c, _events) = sqlite_coordinator().await;
        active_game(&mut c, "g1").await;
        c.destroy_session("g1").await.unwrap();

        let err = c.create_session("G1", None).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Registry(RegistryError::DuplicateName { .. })
        ));
    }

    #[tokio::test]
    async fn test_request_ai_move_validates() {
        let (mut c, _events) = sqlite_coordinator().await;
        c.registry.add_board("A").unwrap();
        c.create_session("g1", None).await.unwrap();
        let start = Position::default().to_string();

        assert!(matches!(
            c.request_ai_move("g1", &start, Side::White, None),
            Err(CoreError::Registry(RegistryError::InvalidTransition {
                from: SessionPhase::Setup,
                ..
            }))
        ));

        c.attach_participant("g1", "alice", Side::White).unwrap();
        c.attach_participant("g1", "bot", Side::Black).unwrap();
        assert!(matches!(
            c.request_ai_move("g1", "not a fen", Side::Black, None),
            Err(CoreError::InvalidPosition(_))
        ));
        assert!(matches!(
            c.request_ai_move("g1", &start, Side::Black, None),
            Err(CoreError::InvalidPosition(_))
        ));
        assert!(matches!(
            c.request_ai_move("nope", &start, Side::White, None),
            Err(CoreError::Registry(RegistryError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reap_respects_config() {
        let (mut c, mut events) = sqlite_coordinator().await;
        active_game(&mut c, "g1").await;
        c.finish_session("g1", Outcome::Stalemate).await.unwrap();
        drain(&mut events);

        let finished_at = c
            .registry
            .session_by_name("g1")
            .and_then(Session::finished_at)
            .unwrap();
        assert!(c.reap_expired(finished_at + 1_000).is_empty());
        assert_eq!(c.reap_expired(finished_at + 30_000), vec!["g1".to_string()]);
        assert_eq!(
            drain(&mut events),
            vec![CoreEvent::SessionDestroyed {
                session: "g1".to_string()
            }]
        );
    }
}
