use thiserror::Error;

/// Error kinds surfaced by the planning core. Higher layers decide whether to
/// retry, broadcast a request for help, or abort the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// Inconsistent input, e.g. a help response without a timeline or a
    /// helper asked to solve an off-colour task. Fatal to the current agent.
    #[error("inconsistent task: {0}")]
    IncorrectTask(String),

    /// The memory ceiling was breached during search. The current search
    /// returns no plan and the agent transitions to `Fail`.
    #[error("memory usage of {used_mb} MB exceeded the ceiling of {limit_mb} MB")]
    ResourceLimit { used_mb: usize, limit_mb: usize },

    /// The time limit was breached during search. Treated like a resource
    /// breach by the agents.
    #[error("search exceeded the time limit of {limit_secs} s")]
    TimeLimit { limit_secs: u64 },

    /// No plan exists from the current state, or coordination stalled
    /// without every agent reaching its goals.
    #[error("unable to solve level")]
    NoPlan,

    /// Malformed level input.
    #[error("malformed level: {0}")]
    Parse(String),
}
