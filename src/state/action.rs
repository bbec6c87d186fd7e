use crate::level::Direction;
use std::fmt;

/// A single-agent action. Pushes move the box one cell in the agent's
/// direction of motion; pulls drag the box from the cell directly behind the
/// agent into the cell the agent vacates, so the box travels in the agent's
/// direction for both. `NoOp` exists so an agent can wait out another agent's
/// committed moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    NoOp,
    Move(Direction),
    Push(Direction),
    Pull(Direction),
}

/// The action sequence of a single agent, root to goal.
pub type Plan = Vec<Action>;

impl fmt::Display for Action {
    /// Server wire format; box direction is spelled out explicitly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::NoOp => write!(f, "NoOp"),
            Action::Move(direction) => write!(f, "Move({direction})"),
            Action::Push(direction) => write!(f, "Push({direction},{direction})"),
            Action::Pull(direction) => write!(f, "Pull({direction},{direction})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        assert_eq!(Action::NoOp.to_string(), "NoOp");
        assert_eq!(Action::Move(Direction::North).to_string(), "Move(N)");
        assert_eq!(Action::Push(Direction::East).to_string(), "Push(E,E)");
        assert_eq!(Action::Pull(Direction::West).to_string(), "Pull(W,W)");
    }
}
