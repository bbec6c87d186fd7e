//! The per-agent BDI loop: plan for the assigned subtask, diagnose a failed
//! search, and trade messages with other agents through the manager's bus.

use crate::agent::{Message, Status};
use crate::errors::SolverError;
use crate::heuristics::{Heuristic, HeuristicValue, WeightedRule};
use crate::level::{Color, Position};
use crate::search::{BestFirst, MemoryGovernor, Strategy};
use crate::state::{Key, Overlay, Plan, State, Timeline};
use ordered_float::OrderedFloat;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Agent {
    task: State,
    init_task: State,
    strategy: Strategy,
    heuristic: Rc<RefCell<dyn Heuristic>>,
    name: Key,
    color: Color,
    status: Status,
    /// The help request currently being served, if any.
    helping: Option<Message>,
    saved_solution: Option<Plan>,
    /// Trajectory of the helped box from the last successful search.
    saved_timeline: Option<Timeline>,
    /// Own positions across the expanded states of the last failed search.
    failure_trace: Vec<Position>,
    memory_limit_mb: usize,
    time_limit: Option<Duration>,
    nodes_explored: u64,
}

impl Agent {
    pub fn new(
        task: State,
        strategy: Strategy,
        heuristic: Rc<RefCell<dyn Heuristic>>,
        memory_limit_mb: usize,
        time_limit: Option<Duration>,
    ) -> Result<Self, SolverError> {
        let (name, _, color) = task
            .first_agent()
            .ok_or_else(|| SolverError::IncorrectTask("task has no agent".to_string()))?;
        Ok(Self {
            init_task: task.clone(),
            task,
            strategy,
            heuristic,
            name,
            color,
            status: Status::Init,
            helping: None,
            saved_solution: None,
            saved_timeline: None,
            failure_trace: Vec::new(),
            memory_limit_mb,
            time_limit,
            nodes_explored: 0,
        })
    }

    pub fn name(&self) -> Key {
        self.name
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_helping(&self) -> bool {
        self.helping.is_some()
    }

    pub fn nodes_explored(&self) -> u64 {
        self.nodes_explored
    }

    /// Merge a one-goal subtask into this agent's assignment.
    pub fn add_task(&mut self, task: &State) -> Result<(), SolverError> {
        let color = task.goals().values().flatten().next().map(|(_, c)| *c);
        if color != Some(self.color) {
            return Err(SolverError::IncorrectTask(format!(
                "agent {}: I'm {}, not {}",
                self.name,
                self.color,
                color.map_or_else(|| "goalless".to_string(), |c| c.to_string()),
            )));
        }
        self.task.merge_goals(task);
        self.init_task.merge_goals(task);
        self.status = Status::Init;
        Ok(())
    }

    /// Cost of taking on a new one-goal subtask: the heuristic value of the
    /// merged assignment minus the subtask's own, or infinite when the
    /// colours do not match. Both bids are scored on scratch copies.
    pub fn marginal_task_cost(&self, subtask: &State) -> HeuristicValue {
        let color = subtask.goals().values().flatten().next().map(|(_, c)| *c);
        if color != Some(self.color) {
            return OrderedFloat(f64::INFINITY);
        }
        let mut alone = subtask.clone();
        self.heuristic.borrow_mut().evaluate(&mut alone);
        let mut joint = self.task.clone();
        joint.merge_goals(subtask);
        self.heuristic.borrow_mut().evaluate(&mut joint);
        joint.f - alone.f
    }

    /// One deliberation step: update beliefs from the inbox, search, and
    /// report the plan plus at most one outgoing message.
    pub fn solve(
        &mut self,
        inbox: &mut Vec<Message>,
    ) -> Result<(Option<Plan>, Option<Message>), SolverError> {
        if self.status == Status::Ok && self.helping.is_none() {
            // Nothing changed since the last round, reuse the cached plan.
            let message = self.broadcast()?;
            return Ok((self.saved_solution.clone(), message));
        }
        if self.status == Status::Fail {
            if let Some(i) = inbox
                .iter()
                .position(|message| message.requester == self.name && message.status == Status::Ok)
            {
                let message = inbox.remove(i);
                self.consume_message(message)?;
            }
        }

        let mut kernel = BestFirst::new(
            self.task.clone(),
            self.strategy,
            Rc::clone(&self.heuristic),
        );
        debug!(agent = %self.name, task = %self.task);
        let path = match self.search(&mut kernel) {
            Ok(path) => path,
            Err(
                error @ (SolverError::ResourceLimit { .. } | SolverError::TimeLimit { .. }),
            ) => {
                warn!(agent = %self.name, %error, "search aborted");
                None
            }
            Err(error) => return Err(error),
        };
        self.nodes_explored += kernel.nodes_explored();
        kernel.statistics().finalise();

        if path.is_some() {
            if let Some(request) = &self.helping {
                if let Some(key) = request.object_problem {
                    self.saved_timeline = Some(kernel.timeline_of(key));
                }
            }
            self.task = kernel.leaf().clone();
            self.status = Status::Ok;
        } else {
            self.failure_trace = kernel.position_trace(self.name);
            self.status = Status::Fail;
        }
        self.saved_solution = path.clone();
        let message = self.broadcast()?;
        Ok((path, message))
    }

    /// Emit at most one message describing what this agent wants the others
    /// to know.
    fn broadcast(&mut self) -> Result<Option<Message>, SolverError> {
        if self.status == Status::Fail {
            let problem = self.identify_problem();
            // The next re-plan runs under new constraints; do not let the
            // old branch memory dead-end it immediately.
            self.task.forget_exploration();
            return Ok(Some(Message::sos(problem, self.name)));
        }
        if let Some(request) = self.helping.take() {
            let object_problem = request.object_problem.ok_or_else(|| {
                SolverError::IncorrectTask("help request names no object".to_string())
            })?;
            let color = request.color.ok_or_else(|| {
                SolverError::IncorrectTask("help request names no colour".to_string())
            })?;
            let timeline = self.saved_timeline.take().ok_or_else(|| {
                SolverError::IncorrectTask(
                    "no trajectory recorded for the helped box".to_string(),
                )
            })?;
            let message =
                Message::response(object_problem, color, request.requester, timeline)?;
            return Ok(Some(message));
        }
        Ok(None)
    }

    /// Digest a routed message. A waiting requester folds the helper's
    /// timeline into its world model; anyone else is being asked to help and
    /// re-plans from scratch with the blocker's key weighted up.
    pub fn consume_message(&mut self, message: Message) -> Result<(), SolverError> {
        if self.status == Status::Fail {
            let key = message.object_problem.ok_or_else(|| {
                SolverError::IncorrectTask("response names no object".to_string())
            })?;
            let timeline = message.timeline.ok_or_else(|| {
                SolverError::IncorrectTask(
                    "solutions to SOS messages require a timeline".to_string(),
                )
            })?;
            let overlay = Overlay::from_timeline(key, &timeline);
            self.task = self.task.clone().with_overlay(overlay);
            self.task.forget_exploration();
        } else {
            info!(agent = %self.name, requester = %message.requester, "received a request for help");
            if message.color != Some(self.color) {
                return Err(SolverError::IncorrectTask(format!(
                    "agent {} is {}, it cannot move the problem box",
                    self.name, self.color,
                )));
            }
            let weight_key = message.object_problem.ok_or_else(|| {
                SolverError::IncorrectTask("help request names no object".to_string())
            })?;
            self.task = self.init_task.clone();
            self.heuristic = Rc::new(RefCell::new(WeightedRule::new(weight_key)));
            self.helping = Some(message);
        }
        Ok(())
    }

    /// Why did the frontier empty? Scan the boxes this agent cannot move and
    /// return the first one some expanded state stood next to.
    fn identify_problem(&self) -> Option<(Key, Color)> {
        for (key, entries) in self.task.boxes() {
            for (position, color) in entries {
                if *color == self.color {
                    continue;
                }
                if self
                    .failure_trace
                    .iter()
                    .any(|agent_position| agent_position.is_adjacent(position))
                {
                    return Some((*key, *color));
                }
            }
        }
        None
    }

    /// The memory-bounded search loop.
    fn search(&self, kernel: &mut BestFirst) -> Result<Option<Plan>, SolverError> {
        let mut governor = MemoryGovernor::new(self.memory_limit_mb, self.time_limit);
        if kernel.is_leaf_goal() {
            info!(agent = %self.name, "state is a goal state, nothing to do");
            return Ok(Some(vec![]));
        }
        loop {
            governor.check()?;
            kernel.explore_and_add();
            if kernel.frontier_empty() {
                info!(
                    agent = %self.name,
                    nodes_explored = kernel.nodes_explored(),
                    "frontier empty"
                );
                governor.finalise();
                return Ok(None);
            }
            kernel.get_and_remove_leaf();
            if kernel.is_leaf_goal() {
                info!(
                    agent = %self.name,
                    nodes_explored = kernel.nodes_explored(),
                    "solution found"
                );
                governor.finalise();
                return Ok(Some(kernel.walk_best_path()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::EasyRule;
    use crate::test_utils::{
        initial_state, BLUE_HELPER_LEVEL, CORRIDOR_PUSH_LEVEL, RED_BLOCKED_LEVEL,
    };
    use crate::search::DEFAULT_MEMORY_LIMIT_MB;

    fn agent(level: &str) -> Agent {
        Agent::new(
            initial_state(level),
            Strategy::AStar,
            Rc::new(RefCell::new(EasyRule::new())),
            DEFAULT_MEMORY_LIMIT_MB,
            None,
        )
        .unwrap()
    }

    #[test]
    fn caches_a_found_plan() {
        let mut agent = agent(CORRIDOR_PUSH_LEVEL);
        let mut inbox = Vec::new();
        let (plan, message) = agent.solve(&mut inbox).unwrap();
        assert_eq!(plan.as_ref().map(Vec::len), Some(2));
        assert!(message.is_none());
        assert_eq!(agent.status(), Status::Ok);
        let explored = agent.nodes_explored();
        let (again, _) = agent.solve(&mut inbox).unwrap();
        assert_eq!(again, plan);
        // The cached round ran no search.
        assert_eq!(agent.nodes_explored(), explored);
    }

    #[test]
    fn blocked_agent_fails_and_names_the_blocker() {
        let mut agent = agent(RED_BLOCKED_LEVEL);
        let mut inbox = Vec::new();
        let (plan, message) = agent.solve(&mut inbox).unwrap();
        assert!(plan.is_none());
        assert_eq!(agent.status(), Status::Fail);
        let message = message.unwrap();
        assert_eq!(message.status, Status::Fail);
        assert_eq!(message.object_problem, Some('B'));
        assert_eq!(message.color, Some(Color::Blue));
        assert_eq!(message.requester, '0');
    }

    #[test]
    fn a_response_lets_the_requester_replan() {
        let mut agent = agent(RED_BLOCKED_LEVEL);
        let mut inbox = Vec::new();
        let (plan, _) = agent.solve(&mut inbox).unwrap();
        assert!(plan.is_none());
        // The blue box clears the corridor at t=1.
        let response = Message::response(
            'B',
            Color::Blue,
            '0',
            vec![(0, Position::new(1, 4)), (1, Position::new(1, 6))],
        )
        .unwrap();
        inbox.push(response);
        let (plan, message) = agent.solve(&mut inbox).unwrap();
        assert!(inbox.is_empty());
        assert!(plan.is_some());
        assert_eq!(agent.status(), Status::Ok);
        assert!(message.is_none());
    }

    #[test]
    fn helper_replans_and_answers_with_a_timeline() {
        let mut agent = agent(BLUE_HELPER_LEVEL);
        agent
            .consume_message(Message::sos(Some(('B', Color::Blue)), '0'))
            .unwrap();
        assert!(agent.is_helping());
        let (plan, message) = agent.solve(&mut Vec::new()).unwrap();
        assert!(plan.is_some());
        let message = message.unwrap();
        assert_eq!(message.status, Status::Ok);
        assert_eq!(message.requester, '0');
        assert_eq!(message.object_problem, Some('B'));
        let timeline = message.timeline.unwrap();
        assert_eq!(timeline.first().map(|(t, _)| *t), Some(0));
        assert!(timeline.len() > 1);
        assert!(!agent.is_helping());
    }

    #[test]
    fn refuses_off_colour_help_requests() {
        let mut agent = agent(BLUE_HELPER_LEVEL);
        let result = agent.consume_message(Message::sos(Some(('C', Color::Red)), '0'));
        assert!(matches!(result, Err(SolverError::IncorrectTask(_))));
    }

    #[test]
    fn marginal_cost_is_infinite_across_colours() {
        let agent = agent(CORRIDOR_PUSH_LEVEL);
        let mut subtask = State::new(Rc::clone(initial_state(CORRIDOR_PUSH_LEVEL).map()));
        subtask.add_goal('Z', Position::new(1, 1), Color::Red);
        assert!(agent.marginal_task_cost(&subtask).into_inner().is_infinite());
    }

    #[test]
    fn marginal_cost_prefers_the_nearby_agent() {
        let agent = agent(CORRIDOR_PUSH_LEVEL);
        let initial = initial_state(CORRIDOR_PUSH_LEVEL);
        let mut subtask = State::new(Rc::clone(initial.map()));
        for (key, entries) in initial.boxes() {
            for (position, color) in entries {
                subtask.add_box(*key, *position, *color);
            }
        }
        subtask.add_goal('A', Position::new(1, 4), Color::Blue);
        let cost = agent.marginal_task_cost(&subtask);
        assert!(cost.into_inner().is_finite());
    }

    #[test]
    fn memory_ceiling_aborts_into_fail() {
        let mut agent = Agent::new(
            initial_state(CORRIDOR_PUSH_LEVEL),
            Strategy::AStar,
            Rc::new(RefCell::new(EasyRule::new())),
            0,
            None,
        )
        .unwrap();
        let (plan, message) = agent.solve(&mut Vec::new()).unwrap();
        assert!(plan.is_none());
        assert_eq!(agent.status(), Status::Fail);
        assert_eq!(message.unwrap().status, Status::Fail);
    }
}
