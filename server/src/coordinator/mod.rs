//! Single owner of all live state.
//!
//! The coordinator task owns the [`SessionRegistry`](crate::registry::SessionRegistry)
//! and the [`Results`] (log plus ranking views). Callers talk to it through a
//! [`CoordinatorHandle`]; every command is applied in queue order. AI
//! searches run on their own tasks and post their move back into the same
//! queue, where it is applied only if the session is still the same live
//! game and no newer search was requested.
//!
//! Finishing a session releases its board and attachments first, then
//! appends the record, then updates the views. A storage failure is logged
//! and the cleanup stands.

pub mod actor;
pub mod commands;
pub mod events;
pub mod handle;

pub use commands::AiTicket;
pub use events::CoreEvent;
pub use handle::CoordinatorHandle;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::CoordinatorConfig;
use crate::persistence::traits::ResultsRepository;
use crate::results::Results;
use actor::{run_coordinator, Coordinator};

const COMMAND_QUEUE: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// Start the coordinator task.
pub fn spawn_coordinator<R: ResultsRepository>(
    results: Results<R>,
    config: CoordinatorConfig,
) -> (CoordinatorHandle, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
    let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

    let coordinator = Coordinator::new(results, config, event_tx, cmd_tx.downgrade());
    let task = tokio::spawn(run_coordinator(coordinator, cmd_rx));
    (CoordinatorHandle::new(cmd_tx), task)
}
