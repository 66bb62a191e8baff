use crate::uci::{convert_uci_castling, parse_uci_message, UciError, UciMessage};
use crate::{check_side, SearchBackend, SearchError, SearchRequest, TimeControl};
use cozy_chess::{Color, Move};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MOVETIME_MS: u64 = 1000;

/// Runs one external UCI engine process per search. The process is started,
/// asked for a single move and shut down again, so no engine state outlives
/// the session that requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UciBackend {
    path: PathBuf,
    depth: Option<u8>,
}

impl UciBackend {
    pub fn new(path: PathBuf, depth: Option<u8>) -> Self {
        Self { path, depth }
    }

    /// Build the `go` line for this search.
    ///
    /// Priority: explicit movetime, then clock times, then fixed depth,
    /// then a one second default.
    pub fn go_command(&self, side: Color, time_control: Option<&TimeControl>) -> String {
        if let Some(tc) = time_control {
            if let Some(movetime) = tc.movetime_ms {
                return format!("go movetime {}", movetime);
            }
            if let Some(remaining) = tc.remaining_ms {
                let (time_key, inc_key) = match side {
                    Color::White => ("wtime", "winc"),
                    Color::Black => ("btime", "binc"),
                };
                let mut cmd = format!("go {} {}", time_key, remaining);
                if let Some(inc) = tc.increment_ms {
                    cmd.push_str(&format!(" {} {}", inc_key, inc));
                }
                return cmd;
            }
        }
        match self.depth {
            Some(depth) => format!("go depth {}", depth),
            None => format!("go movetime {}", DEFAULT_MOVETIME_MS),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, request), fields(engine = %self.path.display()))]
    async fn run_search(&self, request: &SearchRequest) -> Result<Move, SearchError> {
        let mut process = tokio::process::Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn UCI engine: {}", e);
                SearchError::Process(format!("Failed to spawn {}: {}", self.path.display(), e))
            })?;

        let result = self.converse(&mut process, request).await;

        let _ = tokio::time::timeout(Duration::from_secs(1), process.wait()).await;
        let _ = process.kill().await;
        result
    }

    async fn converse(
        &self,
        process: &mut Child,
        request: &SearchRequest,
    ) -> Result<Move, SearchError> {
        let mut stdin = process.stdin.take().ok_or(UciError::MissingPipe("stdin"))?;
        let stdout = process.stdout.take().ok_or(UciError::MissingPipe("stdout"))?;
        let mut lines = BufReader::new(stdout).lines();

        send(&mut stdin, "uci").await?;
        wait_for(&mut lines, HANDSHAKE_TIMEOUT, |m| matches!(m, UciMessage::UciOk)).await?;
        send(&mut stdin, "isready").await?;
        wait_for(&mut lines, HANDSHAKE_TIMEOUT, |m| matches!(m, UciMessage::ReadyOk)).await?;

        send(&mut stdin, &format!("position fen {}", request.board)).await?;
        send(
            &mut stdin,
            &self.go_command(request.side, request.time_control.as_ref()),
        )
        .await?;

        let best = wait_for(&mut lines, SEARCH_TIMEOUT, |m| {
            matches!(m, UciMessage::BestMove { .. })
        })
        .await?;
        let _ = send(&mut stdin, "quit").await;

        match best {
            UciMessage::BestMove { mv: Some(mv), .. } => {
                let mv = convert_uci_castling(mv, &request.board);
                if !request.board.is_legal(mv) {
                    return Err(SearchError::Process(format!("Engine returned illegal move {}", mv)));
                }
                Ok(mv)
            }
            _ => Err(SearchError::NoLegalMoves),
        }
    }
}

impl SearchBackend for UciBackend {
    fn name(&self) -> &'static str {
        "uci"
    }

    async fn search(&self, request: SearchRequest) -> Result<Move, SearchError> {
        check_side(&request)?;
        self.run_search(&request).await
    }
}

async fn send(stdin: &mut ChildStdin, line: &str) -> Result<(), UciError> {
    tracing::trace!("UCI >> {}", line);
    stdin.write_all(line.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await?;
    Ok(())
}

/// Read engine output until a message matching `pred` arrives.
async fn wait_for<F>(
    lines: &mut Lines<BufReader<ChildStdout>>,
    timeout: Duration,
    pred: F,
) -> Result<UciMessage, SearchError>
where
    F: Fn(&UciMessage) -> bool,
{
    let read = async {
        while let Some(line) = lines.next_line().await.map_err(UciError::from)? {
            let trimmed = line.trim();
            tracing::trace!("UCI << {}", trimmed);
            match parse_uci_message(trimmed) {
                Ok(msg) if pred(&msg) => return Ok(msg),
                Ok(UciMessage::Info { depth, score_cp, .. }) => {
                    tracing::trace!(?depth, ?score_cp, "Engine info");
                }
                _ => {}
            }
        }
        Err(SearchError::Process("Engine closed its output".to_string()))
    };

    tokio::time::timeout(timeout, read)
        .await
        .map_err(|_| SearchError::Timeout)?
}
