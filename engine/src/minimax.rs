//! In-process fixed-depth search. Material-only evaluation, alpha-beta
//! pruned negamax. Cheap enough for casual opponents at depth 1-3.

use cozy_chess::{Board, Color, GameStatus, Move, Piece};

use crate::{check_side, SearchBackend, SearchError, SearchRequest};

const MATE_SCORE: i32 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimaxBackend {
    depth: u8,
}

impl MinimaxBackend {
    pub fn new(depth: u8) -> Self {
        Self {
            depth: depth.max(1),
        }
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Best move for the side to move, or `None` if the game is over.
    /// Ties keep the first move in generation order.
    pub fn best_move(&self, board: &Board) -> Option<Move> {
        let mut best: Option<(Move, i32)> = None;
        let mut alpha = -MATE_SCORE - 1;
        let beta = MATE_SCORE + 1;

        for mv in legal_moves(board) {
            let mut child = board.clone();
            child.play_unchecked(mv);
            let score = -negamax(&child, self.depth - 1, -beta, -alpha, 1);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((mv, score));
            }
            alpha = alpha.max(score);
        }

        best.map(|(mv, _)| mv)
    }
}

impl SearchBackend for MinimaxBackend {
    fn name(&self) -> &'static str {
        "minimax"
    }

    async fn search(&self, request: SearchRequest) -> Result<Move, SearchError> {
        check_side(&request)?;
        if request.time_control.is_some() {
            tracing::debug!("Minimax backend has no clock support, searching without a limit");
        }

        let backend = self.clone();
        let board = request.board;
        tokio::task::spawn_blocking(move || backend.best_move(&board))
            .await
            .map_err(|e| SearchError::Process(format!("Search task failed: {}", e)))?
            .ok_or(SearchError::NoLegalMoves)
    }
}

fn negamax(board: &Board, depth: u8, mut alpha: i32, beta: i32, ply: i32) -> i32 {
    match board.status() {
        // Side to move has been mated; prefer quicker mates.
        GameStatus::Won => return -(MATE_SCORE - ply),
        GameStatus::Drawn => return 0,
        GameStatus::Ongoing => {}
    }
    if depth == 0 {
        return evaluate(board);
    }

    for mv in legal_moves(board) {
        let mut child = board.clone();
        child.play_unchecked(mv);
        let score = -negamax(&child, depth - 1, -beta, -alpha, ply + 1);
        if score >= beta {
            return beta;
        }
        alpha = alpha.max(score);
    }
    alpha
}

fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|piece_moves| {
        moves.extend(piece_moves);
        false
    });
    moves
}

/// Material balance from the perspective of the side to move.
fn evaluate(board: &Board) -> i32 {
    let us = board.side_to_move();
    material(board, us) - material(board, !us)
}

fn material(board: &Board, color: Color) -> i32 {
    Piece::ALL
        .iter()
        .map(|&piece| board.colored_pieces(color, piece).len() as i32 * piece_value(piece))
        .sum()
}

fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 0,
    }
}
