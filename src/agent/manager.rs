//! Top-level coordination: partition the level into one-goal subtasks,
//! auction them off, then drive solve/broadcast rounds over the message bus
//! until every agent holds a plan or progress halts.

use crate::agent::{Agent, Message, Status};
use crate::errors::SolverError;
use crate::heuristics::Heuristic;
use crate::search::Strategy;
use crate::state::{Action, Key, Plan, State};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::{info, warn};

/// Coordination gives up after this many rounds even if progress continues.
const ROUND_BUDGET: usize = 16;

/// The per-agent plans, time-aligned, plus the summed search effort.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub plans: BTreeMap<Key, Plan>,
    pub nodes_explored: u64,
}

impl SolveOutcome {
    /// Joint actions for the server, one line per step with the agents in
    /// key order. Agents whose plan already finished fill in with NoOp.
    pub fn joint_actions(&self) -> Vec<String> {
        let horizon = self.plans.values().map(Vec::len).max().unwrap_or(0);
        (0..horizon)
            .map(|t| {
                self.plans
                    .values()
                    .map(|plan| plan.get(t).copied().unwrap_or(Action::NoOp).to_string())
                    .collect::<Vec<_>>()
                    .join(";")
            })
            .collect()
    }

    pub fn makespan(&self) -> usize {
        self.plans.values().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct Manager {
    agents: Vec<Agent>,
    inbox: Vec<Message>,
    nodes_explored: u64,
}

impl Manager {
    /// Split the level into per-agent tasks. Every agent keeps the full box
    /// context (foreign boxes are obstacles); each one-goal subtask goes to
    /// the same-colour agent bidding the lowest marginal cost. Goalless
    /// agents stay around as potential helpers.
    pub fn new(
        initial: &State,
        strategy: Strategy,
        heuristic: Rc<RefCell<dyn Heuristic>>,
        memory_limit_mb: usize,
        time_limit: Option<Duration>,
    ) -> Result<Self, SolverError> {
        let mut agents = Vec::new();
        for (key, entries) in initial.agents() {
            let Some((position, color)) = entries.first() else {
                continue;
            };
            let mut task = State::new(Rc::clone(initial.map()));
            task.add_agent(*key, *position, *color);
            for (box_key, box_entries) in initial.boxes() {
                for (box_position, box_color) in box_entries {
                    task.add_box(*box_key, *box_position, *box_color);
                }
            }
            agents.push(Agent::new(
                task,
                strategy,
                Rc::clone(&heuristic),
                memory_limit_mb,
                time_limit,
            )?);
        }
        if agents.is_empty() {
            return Err(SolverError::IncorrectTask(
                "level has no agents".to_string(),
            ));
        }

        for (goal_key, goal_entries) in initial.goals() {
            for (goal_position, goal_color) in goal_entries {
                let mut subtask = State::new(Rc::clone(initial.map()));
                for (box_key, box_entries) in initial.boxes() {
                    for (box_position, box_color) in box_entries {
                        subtask.add_box(*box_key, *box_position, *box_color);
                    }
                }
                subtask.add_goal(*goal_key, *goal_position, *goal_color);
                let winner = agents
                    .iter_mut()
                    .map(|agent| (agent.marginal_task_cost(&subtask), agent))
                    .filter(|(cost, _)| cost.into_inner().is_finite())
                    .min_by_key(|(cost, _)| *cost);
                match winner {
                    Some((cost, agent)) => {
                        info!(
                            goal = %goal_key,
                            agent = %agent.name(),
                            cost = cost.into_inner(),
                            "assigned subtask"
                        );
                        agent.add_task(&subtask)?;
                    }
                    None => {
                        warn!(goal = %goal_key, colour = %goal_color, "no agent can take this goal");
                        return Err(SolverError::NoPlan);
                    }
                }
            }
        }

        Ok(Self {
            agents,
            inbox: Vec::new(),
            nodes_explored: 0,
        })
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn nodes_explored(&self) -> u64 {
        self.nodes_explored
    }

    /// The round loop. Each round every agent gets one `solve` call against
    /// the shared bus; afterwards responses are queued for their requesters
    /// and SOS messages are routed to an idle same-colour helper. Terminates
    /// when everyone is `Ok` with an empty bus, the round budget runs out,
    /// or a full pass makes no progress.
    pub fn run(&mut self) -> Result<SolveOutcome, SolverError> {
        let mut plans: BTreeMap<Key, Plan> = BTreeMap::new();
        for round in 1..=ROUND_BUDGET {
            info!(round, "coordination round");
            let mut progressed = false;
            let mut outbox: Vec<Message> = Vec::new();
            let inbox_before = self.inbox.len();
            for agent in &mut self.agents {
                let status_before = agent.status();
                let (plan, message) = match agent.solve(&mut self.inbox) {
                    Ok(result) => result,
                    Err(error @ SolverError::IncorrectTask(_)) => {
                        warn!(agent = %agent.name(), %error, "agent gave up on its task");
                        continue;
                    }
                    Err(error) => return Err(error),
                };
                if let Some(plan) = plan {
                    plans.insert(agent.name(), plan);
                }
                if agent.status() != status_before {
                    progressed = true;
                }
                if let Some(message) = message {
                    outbox.push(message);
                }
            }
            if self.inbox.len() != inbox_before {
                // Someone consumed a response.
                progressed = true;
            }

            let (responses, requests): (Vec<Message>, Vec<Message>) = outbox
                .into_iter()
                .partition(|message| message.status == Status::Ok);
            for message in responses {
                info!(requester = %message.requester, "queueing help response");
                self.inbox.push(message);
                progressed = true;
            }
            for message in requests {
                let Some(color) = message.color else {
                    warn!(requester = %message.requester, "SOS without an identified blocker");
                    continue;
                };
                if self
                    .inbox
                    .iter()
                    .any(|queued| queued.requester == message.requester)
                {
                    // An answer is already on its way.
                    continue;
                }
                let requester = message.requester;
                if let Some(helper) = self.agents.iter_mut().find(|a| {
                    a.name() != requester
                        && a.color() == color
                        && a.status() != Status::Fail
                        && !a.is_helping()
                }) {
                    info!(helper = %helper.name(), requester = %requester, "routing SOS");
                    match helper.consume_message(message) {
                        Ok(()) => progressed = true,
                        Err(error) => {
                            warn!(helper = %helper.name(), %error, "helper rejected the SOS");
                        }
                    }
                } else {
                    warn!(requester = %requester, colour = %color, "no helper available");
                }
            }

            // Drop responses whose requester recovered on its own.
            self.inbox.retain(|message| {
                self.agents
                    .iter()
                    .any(|a| a.name() == message.requester && a.status() == Status::Fail)
            });

            self.nodes_explored = self.agents.iter().map(Agent::nodes_explored).sum();
            let all_ok = self
                .agents
                .iter()
                .all(|a| a.status() == Status::Ok && !a.is_helping());
            if all_ok && self.inbox.is_empty() {
                info!(
                    rounds = round,
                    nodes_explored = self.nodes_explored,
                    "all agents solved their tasks"
                );
                return Ok(SolveOutcome {
                    plans,
                    nodes_explored: self.nodes_explored,
                });
            }
            if !progressed {
                warn!(round, "no progress over a full pass, giving up");
                break;
            }
        }
        Err(SolverError::NoPlan)
    }
}
