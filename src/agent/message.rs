use crate::errors::SolverError;
use crate::level::Color;
use crate::state::{Key, Timeline};

/// Lifecycle of an agent: `Init` before the first `solve`, `Ok` with a
/// cached plan, `Fail` after an exhausted or aborted search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Init,
    Ok,
    Fail,
}

/// One message on the coordination bus. `Fail` messages are SOS requests
/// naming the box believed to be blocking; `Ok` messages answer them with
/// the trajectory the box will follow.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub object_problem: Option<Key>,
    pub color: Option<Color>,
    pub requester: Key,
    pub status: Status,
    pub timeline: Option<Timeline>,
}

impl Message {
    /// A request for help. The problem is `None` when the failed search
    /// never came near a foreign box.
    pub fn sos(problem: Option<(Key, Color)>, requester: Key) -> Self {
        Self {
            object_problem: problem.map(|(key, _)| key),
            color: problem.map(|(_, color)| color),
            requester,
            status: Status::Fail,
            timeline: None,
        }
    }

    /// A response to an SOS. Solutions require a timeline.
    pub fn response(
        object_problem: Key,
        color: Color,
        requester: Key,
        timeline: Timeline,
    ) -> Result<Self, SolverError> {
        if timeline.is_empty() {
            return Err(SolverError::IncorrectTask(
                "solutions to SOS messages require a timeline".to_string(),
            ));
        }
        Ok(Self {
            object_problem: Some(object_problem),
            color: Some(color),
            requester,
            status: Status::Ok,
            timeline: Some(timeline),
        })
    }
}
