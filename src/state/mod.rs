//! World snapshots, puzzle mechanics and time-indexed overlays.

mod action;
mod overlay;
mod state;

pub use action::{Action, Plan};
pub use overlay::{Overlay, Timeline};
pub use state::{Key, State};
