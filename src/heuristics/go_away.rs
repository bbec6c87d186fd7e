use crate::heuristics::Heuristic;
use crate::state::State;
use ordered_float::OrderedFloat;

/// Inverted estimator that rewards states whose agents are far away from
/// the remaining boxes. Meant for shooing an idle agent out of a corridor;
/// no manager policy triggers it yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoAway;

impl GoAway {
    pub fn new() -> Self {
        Self
    }
}

impl Heuristic for GoAway {
    fn evaluate(&mut self, state: &mut State) {
        let mut box_goal_cost = 0.0;
        let mut agent_box_cost = 0.0;
        for (key, goals) in state.goals() {
            for (goal_position, _) in goals {
                let mut best: Option<f64> = None;
                for (box_position, _) in state.boxes_by_key(*key) {
                    let distance = f64::from(box_position.manhattan(goal_position));
                    if distance == 0.0 {
                        continue;
                    }
                    for entries in state.agents().values() {
                        for (agent_position, _) in entries {
                            agent_box_cost -=
                                10.0 * f64::from(agent_position.manhattan(box_position));
                        }
                    }
                    best = Some(best.map_or(distance, |b: f64| b.min(distance)));
                }
                if let Some(cost) = best {
                    box_goal_cost += cost;
                }
            }
        }
        let h = box_goal_cost + agent_box_cost;
        state.h = OrderedFloat(h);
        state.f = OrderedFloat(h * 25.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Direction;
    use crate::state::Action;
    use crate::test_utils::{initial_state, CORRIDOR_PUSH_LEVEL};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn rewards_distance_from_boxes() {
        let mut state = initial_state(CORRIDOR_PUSH_LEVEL);
        GoAway::new().evaluate(&mut state);
        // Box term 1, agent term -10 * 2.
        assert_approx_eq!(state.h.into_inner(), -19.0);
        assert_approx_eq!(state.f.into_inner(), -475.0);
    }

    #[test]
    fn approaching_a_box_scores_worse() {
        let state = initial_state(CORRIDOR_PUSH_LEVEL);
        let (agent, _, _) = state.first_agent().unwrap();
        let mut closer = state.apply(agent, Action::Move(Direction::East)).unwrap();
        let mut start = state;
        let mut rule = GoAway::new();
        rule.evaluate(&mut start);
        rule.evaluate(&mut closer);
        assert!(closer.h > start.h);
    }
}
