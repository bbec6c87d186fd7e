use crate::state::State;
use ordered_float::OrderedFloat;

pub type HeuristicValue = OrderedFloat<f64>;

/// A pluggable cost estimator. Implementations write both `h` and the queue
/// priority `f` on states in place; scoring the same state twice must yield
/// identical values.
pub trait Heuristic: std::fmt::Debug {
    fn evaluate(&mut self, state: &mut State);

    /// Score a batch of freshly generated states. The default implementation
    /// calls [`Heuristic::evaluate`] sequentially; override when a batch can
    /// be scored more cheaply.
    fn evaluate_batch(&mut self, states: &mut [State]) {
        for state in states {
            self.evaluate(state);
        }
    }
}
