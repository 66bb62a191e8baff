//! Chess hall coordinator: named boards, sessions on them, a durable
//! results log and ranking views derived from it.
//!
//! All live state is owned by one coordinator task; see [`coordinator`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod persistence;
pub mod ranking;
pub mod record;
pub mod registry;
pub mod results;

pub use coordinator::{spawn_coordinator, CoordinatorHandle, CoreEvent};
pub use error::CoreError;
pub use results::Results;
