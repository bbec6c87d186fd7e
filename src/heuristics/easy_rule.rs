use crate::heuristics::Heuristic;
use crate::state::{Key, State};
use ordered_float::OrderedFloat;

/// Shared core of the Manhattan-distance rules: for every goal, the minimum
/// box-to-goal distance of its key (zero-distance pairs are settled and
/// skipped), plus the distance from every same-colour agent to every box
/// that still needs help. Goals matching `weight_key` (case-insensitively)
/// count their box term tenfold.
pub(crate) fn manhattan_rule(state: &State, weight_key: Option<Key>) -> f64 {
    let mut box_goal_cost = 0.0;
    let mut agent_box_cost = 0.0;
    for (key, goals) in state.goals() {
        for (goal_position, goal_color) in goals {
            let mut best: Option<f64> = None;
            for (box_position, _) in state.boxes_by_key(*key) {
                let distance = f64::from(box_position.manhattan(goal_position));
                if distance == 0.0 {
                    continue;
                }
                for entries in state.agents().values() {
                    for (agent_position, agent_color) in entries {
                        if agent_color == goal_color {
                            agent_box_cost +=
                                f64::from(agent_position.manhattan(box_position));
                        }
                    }
                }
                best = Some(best.map_or(distance, |b: f64| b.min(distance)));
            }
            if let Some(mut cost) = best {
                if weight_key.is_some_and(|weight| weight.eq_ignore_ascii_case(key)) {
                    cost *= 10.0;
                }
                box_goal_cost += cost;
            }
        }
    }
    box_goal_cost + agent_box_cost
}

/// Plain Manhattan estimator: boxes to goals plus agents to boxes.
#[derive(Debug, Default, Clone, Copy)]
pub struct EasyRule;

impl EasyRule {
    pub fn new() -> Self {
        Self
    }
}

impl Heuristic for EasyRule {
    fn evaluate(&mut self, state: &mut State) {
        let h = manhattan_rule(state, None);
        state.h = OrderedFloat(h);
        state.f = OrderedFloat(h * 5.0 + f64::from(state.g));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{initial_state, CORRIDOR_PUSH_LEVEL, TRIVIAL_LEVEL};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn corridor_costs() {
        let mut state = initial_state(CORRIDOR_PUSH_LEVEL);
        EasyRule::new().evaluate(&mut state);
        // Box to goal: 1, agent to box: 2.
        assert_approx_eq!(state.h.into_inner(), 3.0);
        assert_approx_eq!(state.f.into_inner(), 15.0);
    }

    #[test]
    fn settled_goals_cost_nothing() {
        let mut state = initial_state(TRIVIAL_LEVEL);
        EasyRule::new().evaluate(&mut state);
        assert_approx_eq!(state.h.into_inner(), 0.0);
        assert_approx_eq!(state.f.into_inner(), 0.0);
    }

    #[test]
    fn scoring_twice_is_idempotent() {
        let mut state = initial_state(CORRIDOR_PUSH_LEVEL);
        let mut rule = EasyRule::new();
        rule.evaluate(&mut state);
        let (h, f) = (state.h, state.f);
        rule.evaluate(&mut state);
        assert_eq!(state.h, h);
        assert_eq!(state.f, f);
    }

    #[test]
    fn batch_scoring_matches_individual_scoring() {
        let state = initial_state(CORRIDOR_PUSH_LEVEL);
        let mut batch: Vec<State> = state
            .successors()
            .into_iter()
            .map(|(_, _, child)| child)
            .collect();
        assert!(!batch.is_empty());
        let mut rule = EasyRule::new();
        rule.evaluate_batch(&mut batch);
        for child in &batch {
            let mut alone = child.clone();
            rule.evaluate(&mut alone);
            assert_eq!(alone.h, child.h);
            assert_eq!(alone.f, child.f);
        }
    }
}
