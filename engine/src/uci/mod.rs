//! The subset of the UCI protocol needed to ask an engine for one move.

pub mod parser;

pub use parser::{
    convert_uci_castling, format_uci_move, parse_uci_message, parse_uci_move, UciMessage,
};

#[derive(Debug, thiserror::Error)]
pub enum UciError {
    #[error("Engine pipe error: {0}")]
    Io(#[from] std::io::Error),
    /// The child was spawned without the named stdio pipe.
    #[error("Engine process has no {0} pipe")]
    MissingPipe(&'static str),
    #[error("Malformed UCI line: {0}")]
    MalformedMessage(String),
    #[error("Unrecognised UCI line: {0}")]
    UnknownMessage(String),
    #[error("Bad UCI move '{0}'")]
    InvalidMove(String),
    #[error("Bad square '{0}'")]
    InvalidSquare(String),
    #[error("Bad promotion piece '{0}'")]
    InvalidPromotion(String),
}
