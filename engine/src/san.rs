//! Standard Algebraic Notation for moves chosen by a backend, so they can
//! be appended to a game's movetext.

use cozy_chess::{Board, GameStatus, Move, Piece, Square};

fn file_char(sq: Square) -> char {
    (b'a' + sq.file() as u8) as char
}

fn rank_char(sq: Square) -> char {
    (b'1' + sq.rank() as u8) as char
}

fn piece_char(piece: Piece) -> char {
    match piece {
        Piece::King => 'K',
        Piece::Queen => 'Q',
        Piece::Rook => 'R',
        Piece::Bishop => 'B',
        Piece::Knight => 'N',
        Piece::Pawn => 'P',
    }
}

/// Format a legal move (cozy-chess encoding, castling as king-takes-rook)
/// as SAN, including `+`/`#` suffixes. Returns `None` if the move is not
/// legal on `board`.
pub fn format_san(board: &Board, mv: Move) -> Option<String> {
    if !board.is_legal(mv) {
        return None;
    }
    let piece = board.piece_on(mv.from)?;
    let us = board.side_to_move();

    let mut san = String::new();
    if piece == Piece::King && board.color_on(mv.to) == Some(us) {
        san.push_str(if mv.to.file() > mv.from.file() {
            "O-O"
        } else {
            "O-O-O"
        });
    } else {
        // En passant lands on an empty square
        let capture = board.color_on(mv.to).is_some()
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        if piece == Piece::Pawn {
            if capture {
                san.push(file_char(mv.from));
            }
        } else {
            san.push(piece_char(piece));
            san.push_str(&disambiguation(board, mv, piece));
        }
        if capture {
            san.push('x');
        }
        san.push(file_char(mv.to));
        san.push(rank_char(mv.to));
        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(piece_char(promo));
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if after.status() == GameStatus::Won {
        san.push('#');
    } else if !after.checkers().is_empty() {
        san.push('+');
    }
    Some(san)
}

/// File, rank or full square of the origin when another piece of the same
/// kind could reach the same destination.
fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let mut rivals = Vec::new();
    board.generate_moves(|moves| {
        if moves.piece == piece && moves.from != mv.from && moves.to.has(mv.to) {
            rivals.push(moves.from);
        }
        false
    });
    if rivals.is_empty() {
        return String::new();
    }

    let same_file = rivals.iter().any(|sq| sq.file() == mv.from.file());
    let same_rank = rivals.iter().any(|sq| sq.rank() == mv.from.rank());
    match (same_file, same_rank) {
        (false, _) => file_char(mv.from).to_string(),
        (true, false) => rank_char(mv.from).to_string(),
        (true, true) => mv.from.to_string(),
    }
}
