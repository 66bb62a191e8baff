use super::UciError;
use cozy_chess::{Board, File, Move, Piece, Rank, Square};

/// Incoming message from a UCI engine. Only the lines a one-shot search
/// cares about are modelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `bestmove (none)` is reported as `mv: None`.
    BestMove { mv: Option<Move>, ponder: Option<Move> },
    Info { depth: Option<u8>, score_cp: Option<i32>, mate: Option<i8> },
}

/// Parse a single line of engine output.
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(UciError::MalformedMessage(line.to_string()));
            }
            Ok(UciMessage::Id {
                name: tokens[1].to_string(),
                value: tokens[2..].join(" "),
            })
        }

        Some(&"bestmove") => {
            let Some(&mv_token) = tokens.get(1) else {
                return Err(UciError::MalformedMessage(line.to_string()));
            };
            let mv = match mv_token {
                "(none)" | "0000" => None,
                s => Some(parse_uci_move(s)?),
            };
            let ponder = match (tokens.get(2), tokens.get(3)) {
                (Some(&"ponder"), Some(p)) => parse_uci_move(p).ok(),
                _ => None,
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }

        Some(&"info") => Ok(parse_info_line(&tokens[1..])),

        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

fn parse_info_line(tokens: &[&str]) -> UciMessage {
    let mut depth = None;
    let mut score_cp = None;
    let mut mate = None;
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                depth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "score" => {
                let kind = tokens.get(i + 1).copied();
                let value = tokens.get(i + 2).copied();
                match (kind, value) {
                    (Some("cp"), Some(v)) => score_cp = v.parse().ok(),
                    (Some("mate"), Some(v)) => mate = v.parse().ok(),
                    _ => {}
                }
                i += 2;
            }
            // Everything after `pv` is a move list we don't track.
            "pv" => break,
            _ => {}
        }
        i += 1;
    }

    UciMessage::Info {
        depth,
        score_cp,
        mate,
    }
}

/// Parse UCI move format (e2e4, e7e8q)
pub fn parse_uci_move(s: &str) -> Result<Move, UciError> {
    if !(4..=5).contains(&s.len()) || !s.is_ascii() {
        return Err(UciError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;

    let promotion = match s.get(4..5) {
        None => None,
        Some("q") => Some(Piece::Queen),
        Some("r") => Some(Piece::Rook),
        Some("b") => Some(Piece::Bishop),
        Some("n") => Some(Piece::Knight),
        Some(_) => return Err(UciError::InvalidPromotion(s.to_string())),
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

fn parse_square(s: &str) -> Result<Square, UciError> {
    let mut chars = s.chars();
    let file = match chars.next() {
        Some('a') => File::A,
        Some('b') => File::B,
        Some('c') => File::C,
        Some('d') => File::D,
        Some('e') => File::E,
        Some('f') => File::F,
        Some('g') => File::G,
        Some('h') => File::H,
        _ => return Err(UciError::InvalidSquare(s.to_string())),
    };
    let rank = match chars.next() {
        Some('1') => Rank::First,
        Some('2') => Rank::Second,
        Some('3') => Rank::Third,
        Some('4') => Rank::Fourth,
        Some('5') => Rank::Fifth,
        Some('6') => Rank::Sixth,
        Some('7') => Rank::Seventh,
        Some('8') => Rank::Eighth,
        _ => return Err(UciError::InvalidSquare(s.to_string())),
    };
    Ok(Square::new(file, rank))
}

/// Format a move for UCI (e2e4, e7e8q).
pub fn format_uci_move(mv: &Move) -> String {
    let mut s = format!("{}{}", mv.from, mv.to);
    match mv.promotion {
        Some(Piece::Queen) => s.push('q'),
        Some(Piece::Rook) => s.push('r'),
        Some(Piece::Bishop) => s.push('b'),
        Some(Piece::Knight) => s.push('n'),
        _ => {}
    }
    s
}

/// UCI engines castle as "king moves two squares" (e1g1); cozy-chess encodes
/// castling as "king captures own rook" (e1h1). Rewrites the former into the
/// latter when the rewritten move is legal on `board`.
pub fn convert_uci_castling(mv: Move, board: &Board) -> Move {
    let castling_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let from_e_file = mv.from.file() == File::E && mv.to.rank() == mv.from.rank();
    if !castling_rank || !from_e_file || mv.promotion.is_some() {
        return mv;
    }
    if board.piece_on(mv.from) != Some(Piece::King) {
        return mv;
    }

    let rook_file = match mv.to.file() {
        File::G => File::H,
        File::C => File::A,
        _ => return mv,
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if board.is_legal(converted) {
        converted
    } else {
        mv
    }
}
