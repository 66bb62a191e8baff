//! Finished-game records and the outcome vocabulary shared by the registry,
//! the results log and the ranking views.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::White => f.write_str("white"),
            Side::Black => f.write_str("black"),
        }
    }
}

impl From<Side> for cozy_chess::Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => cozy_chess::Color::White,
            Side::Black => cozy_chess::Color::Black,
        }
    }
}

/// How a game ended, as reported by the rules component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Outcome {
    WhiteWinByCheckmate,
    BlackWinByCheckmate,
    DrawAgreed,
    DrawByRule,
    Stalemate,
    Resignation { loser: Side },
    /// `loser: None` when nobody can be blamed, e.g. the session was
    /// destroyed mid-game.
    Abandonment { loser: Option<Side> },
}

/// PGN-style result tag stored with each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultTag {
    WhiteWins,
    BlackWins,
    Draw,
    Undecided,
}

/// The structured half of an outcome once the winning side is factored out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Checkmate,
    DrawAgreed,
    DrawByRule,
    Stalemate,
    Resignation,
    Abandonment,
}

/// A result seen from one participant's chair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn tag(&self) -> ResultTag {
        match self {
            Outcome::WhiteWinByCheckmate => ResultTag::WhiteWins,
            Outcome::BlackWinByCheckmate => ResultTag::BlackWins,
            Outcome::DrawAgreed | Outcome::DrawByRule | Outcome::Stalemate => ResultTag::Draw,
            Outcome::Resignation { loser } | Outcome::Abandonment { loser: Some(loser) } => {
                ResultTag::won_by(loser.opposite())
            }
            Outcome::Abandonment { loser: None } => ResultTag::Undecided,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::WhiteWinByCheckmate | Outcome::BlackWinByCheckmate => OutcomeKind::Checkmate,
            Outcome::DrawAgreed => OutcomeKind::DrawAgreed,
            Outcome::DrawByRule => OutcomeKind::DrawByRule,
            Outcome::Stalemate => OutcomeKind::Stalemate,
            Outcome::Resignation { .. } => OutcomeKind::Resignation,
            Outcome::Abandonment { .. } => OutcomeKind::Abandonment,
        }
    }

    /// Reassemble an outcome from its persisted halves. `None` for pairs that
    /// no outcome produces, e.g. a stalemate tagged as a white win.
    pub fn from_parts(tag: ResultTag, kind: OutcomeKind) -> Option<Self> {
        let outcome = match (kind, tag) {
            (OutcomeKind::Checkmate, ResultTag::WhiteWins) => Outcome::WhiteWinByCheckmate,
            (OutcomeKind::Checkmate, ResultTag::BlackWins) => Outcome::BlackWinByCheckmate,
            (OutcomeKind::DrawAgreed, ResultTag::Draw) => Outcome::DrawAgreed,
            (OutcomeKind::DrawByRule, ResultTag::Draw) => Outcome::DrawByRule,
            (OutcomeKind::Stalemate, ResultTag::Draw) => Outcome::Stalemate,
            (OutcomeKind::Resignation, ResultTag::WhiteWins) => Outcome::Resignation {
                loser: Side::Black,
            },
            (OutcomeKind::Resignation, ResultTag::BlackWins) => Outcome::Resignation {
                loser: Side::White,
            },
            (OutcomeKind::Abandonment, ResultTag::WhiteWins) => Outcome::Abandonment {
                loser: Some(Side::Black),
            },
            (OutcomeKind::Abandonment, ResultTag::BlackWins) => Outcome::Abandonment {
                loser: Some(Side::White),
            },
            (OutcomeKind::Abandonment, ResultTag::Undecided) => Outcome::Abandonment { loser: None },
            _ => return None,
        };
        Some(outcome)
    }
}

impl ResultTag {
    fn won_by(side: Side) -> Self {
        match side {
            Side::White => ResultTag::WhiteWins,
            Side::Black => ResultTag::BlackWins,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultTag::WhiteWins => "1-0",
            ResultTag::BlackWins => "0-1",
            ResultTag::Draw => "1/2-1/2",
            ResultTag::Undecided => "*",
        }
    }
}

impl fmt::Display for ResultTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1-0" => Ok(ResultTag::WhiteWins),
            "0-1" => Ok(ResultTag::BlackWins),
            "1/2-1/2" => Ok(ResultTag::Draw),
            "*" => Ok(ResultTag::Undecided),
            other => Err(format!("Unknown result tag '{}'", other)),
        }
    }
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Checkmate => "checkmate",
            OutcomeKind::DrawAgreed => "draw_agreed",
            OutcomeKind::DrawByRule => "draw_by_rule",
            OutcomeKind::Stalemate => "stalemate",
            OutcomeKind::Resignation => "resignation",
            OutcomeKind::Abandonment => "abandonment",
        }
    }
}

impl FromStr for OutcomeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checkmate" => Ok(OutcomeKind::Checkmate),
            "draw_agreed" => Ok(OutcomeKind::DrawAgreed),
            "draw_by_rule" => Ok(OutcomeKind::DrawByRule),
            "stalemate" => Ok(OutcomeKind::Stalemate),
            "resignation" => Ok(OutcomeKind::Resignation),
            "abandonment" => Ok(OutcomeKind::Abandonment),
            other => Err(format!("Unknown outcome kind '{}'", other)),
        }
    }
}

/// Immutable record of one finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub session_name: String,
    pub white: String,
    pub black: String,
    /// Unix millis.
    pub started_at: u64,
    /// Unix millis.
    pub ended_at: u64,
    pub outcome: Outcome,
    pub movetext: String,
}

impl ResultRecord {
    pub fn tag(&self) -> ResultTag {
        self.outcome.tag()
    }

    pub fn kind(&self) -> OutcomeKind {
        self.outcome.kind()
    }

    pub fn winner(&self) -> Option<&str> {
        match self.tag() {
            ResultTag::WhiteWins => Some(&self.white),
            ResultTag::BlackWins => Some(&self.black),
            ResultTag::Draw | ResultTag::Undecided => None,
        }
    }

    pub fn loser(&self) -> Option<&str> {
        match self.tag() {
            ResultTag::WhiteWins => Some(&self.black),
            ResultTag::BlackWins => Some(&self.white),
            ResultTag::Draw | ResultTag::Undecided => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.tag() == ResultTag::Draw
    }

    /// The result from `participant`'s point of view. `None` if they did not
    /// play or the game was undecided.
    pub fn verdict_for(&self, participant: &str) -> Option<Verdict> {
        let side = if self.white == participant {
            Side::White
        } else if self.black == participant {
            Side::Black
        } else {
            return None;
        };

        match (self.tag(), side) {
            (ResultTag::Draw, _) => Some(Verdict::Draw),
            (ResultTag::Undecided, _) => None,
            (ResultTag::WhiteWins, Side::White) | (ResultTag::BlackWins, Side::Black) => {
                Some(Verdict::Win)
            }
            _ => Some(Verdict::Loss),
        }
    }
}

/// Points for a win and a draw. Losses score nothing.
pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;

/// Win/draw/loss counts for one participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tally {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl Tally {
    pub fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Win => self.wins += 1,
            Verdict::Draw => self.draws += 1,
            Verdict::Loss => self.losses += 1,
        }
    }

    pub fn score(&self) -> u32 {
        WIN_POINTS * self.wins + DRAW_POINTS * self.draws
    }

    pub fn played(&self) -> u32 {
        self.wins + self.draws + self.losses
    }
}

/// Render a SAN move list as numbered movetext followed by the result tag,
/// e.g. `1. f3 e5 2. g4 Qh4# 0-1`.
pub fn format_movetext(moves: &[String], tag: ResultTag) -> String {
    let mut out = String::new();
    for (i, pair) in moves.chunks(2).enumerate() {
        out.push_str(&format!("{}. {}", i + 1, pair[0]));
        if let Some(reply) = pair.get(1) {
            out.push(' ');
            out.push_str(reply);
        }
        out.push(' ');
    }
    out.push_str(tag.as_str());
    out
}
