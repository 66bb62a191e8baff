use crate::record::{ResultRecord, ResultTag};

/// Events broadcast from the coordinator to all subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    SessionCreated { session: String, board: String },
    SessionActive { session: String },
    SessionFinished { session: String, result: ResultTag },
    SessionDestroyed { session: String },
    /// Only sent when result broadcasting is enabled.
    ResultRecorded(ResultRecord),
    AiMoved {
        session: String,
        uci: String,
        san: String,
    },
    AiFailed { session: String, error: String },
}
