//! Level fixtures shared across the test modules.

use crate::level::parse_level;
use crate::state::State;

/// One blue agent, its box already on the goal.
pub const TRIVIAL_LEVEL: &str = include_str!("../levels/trivial.lvl");

/// One blue agent that has to walk up to its box and push it one cell.
pub const CORRIDOR_PUSH_LEVEL: &str = include_str!("../levels/corridor_push.lvl");

/// A red agent whose box is blocked by a blue box that the blue agent has
/// to move out of the corridor first.
pub const HELP_CORRIDOR_LEVEL: &str = include_str!("../levels/help_corridor.lvl");

/// A red agent alone with an unmovable blue box in the way.
pub const RED_BLOCKED_LEVEL: &str = include_str!("../levels/red_blocked.lvl");

/// A blue agent with a pushable box, used to exercise the helper side.
pub const BLUE_HELPER_LEVEL: &str = include_str!("../levels/blue_helper.lvl");

/// The box is walled in on all four sides; nobody can help.
pub const ENCLOSED_LEVEL: &str = include_str!("../levels/enclosed.lvl");

pub fn initial_state(text: &str) -> State {
    parse_level(text).expect("test level must parse").initial
}
