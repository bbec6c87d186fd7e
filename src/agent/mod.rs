//! The BDI coordination layer: agents, their messages, and the manager that
//! partitions the level and drives the rounds.

mod agent;
mod manager;
mod message;

pub use agent::Agent;
pub use manager::{Manager, SolveOutcome};
pub use message::{Message, Status};
