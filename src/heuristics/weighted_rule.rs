use crate::heuristics::easy_rule::manhattan_rule;
use crate::heuristics::Heuristic;
use crate::state::{Key, State};
use ordered_float::OrderedFloat;

/// [`crate::heuristics::EasyRule`] with the box-to-goal term of one key
/// weighted tenfold. Installed on a helper after an SOS so its search clears
/// the named blocker first.
#[derive(Debug, Clone, Copy)]
pub struct WeightedRule {
    weight_key: Key,
}

impl WeightedRule {
    pub fn new(weight_key: Key) -> Self {
        Self { weight_key }
    }
}

impl Heuristic for WeightedRule {
    fn evaluate(&mut self, state: &mut State) {
        let h = manhattan_rule(state, Some(self.weight_key));
        state.h = OrderedFloat(h);
        state.f = OrderedFloat(h * 5.0 + f64::from(state.g));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::EasyRule;
    use crate::test_utils::{initial_state, CORRIDOR_PUSH_LEVEL};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn weighs_the_named_key_tenfold() {
        let mut plain = initial_state(CORRIDOR_PUSH_LEVEL);
        let mut weighted = plain.clone();
        EasyRule::new().evaluate(&mut plain);
        WeightedRule::new('a').evaluate(&mut weighted);
        // Box term 1 becomes 10, agent term 2 is untouched.
        assert_approx_eq!(plain.h.into_inner(), 3.0);
        assert_approx_eq!(weighted.h.into_inner(), 12.0);
        assert_approx_eq!(weighted.f.into_inner(), 60.0);
    }

    #[test]
    fn other_keys_are_unaffected() {
        let mut state = initial_state(CORRIDOR_PUSH_LEVEL);
        WeightedRule::new('Z').evaluate(&mut state);
        assert_approx_eq!(state.h.into_inner(), 3.0);
    }
}
