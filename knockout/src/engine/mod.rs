//! Actor-based contest engine.
//!
//! One [`ContestActor`] per contest owns every mutation of that contest.
//! [`ContestManager`] spawns actors on demand and is what callers talk to.

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;

pub use actor::{ContestActor, ContestHandle};
pub use config::{EngineConfig, RngSource};
pub use manager::ContestManager;
pub use messages::{ContestMessage, RoundStarted};
