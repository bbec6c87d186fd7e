use clap::Parser;
use multisoko::agent::Manager;
use multisoko::heuristics::{Heuristic, VisibilityGraph};
use multisoko::level::parse_level;
use multisoko::search::{Strategy, Verbosity, DEFAULT_MEMORY_LIMIT_MB};
use multisoko::SolverError;
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(version)]
/// Cooperative multi-agent client for the block-pushing game server.
struct Args {
    #[arg(long = "astar", help = "Use the A* strategy", group = "strategy")]
    astar: bool,
    #[arg(long = "wastar", help = "Use the WA* strategy", group = "strategy")]
    wastar: bool,
    #[arg(long = "greedy", help = "Use the Greedy strategy", group = "strategy")]
    greedy: bool,
    #[arg(
        long = "max-memory",
        value_name = "MB",
        default_value_t = DEFAULT_MEMORY_LIMIT_MB,
        help = "The maximum memory usage allowed in MB (soft limit)"
    )]
    max_memory: usize,
    #[arg(
        long = "time-limit",
        id = "TIME_LIMIT",
        value_parser = humantime::parse_duration,
        help = "The time limit for each search, supports syntax like 30s"
    )]
    time_limit: Option<Duration>,
    #[arg(
        value_enum,
        short = 'v',
        long = "verbosity",
        default_value_t = Verbosity::Normal,
        help = "The verbosity level"
    )]
    verbosity: Verbosity,
    #[arg(short = 'c', long = "colour", help = "Whether to use coloured output")]
    colour: bool,
}

impl Args {
    fn strategy(&self) -> Strategy {
        match (self.astar, self.wastar, self.greedy) {
            (_, true, _) => Strategy::WAStar,
            (_, _, true) => Strategy::Greedy,
            _ => Strategy::AStar,
        }
    }
}

fn main() {
    let args = Args::parse();

    let level: tracing::Level = args.verbosity.into();
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(args.colour)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    std::process::exit(match run(&args) {
        Ok(()) => 0,
        Err(error) => {
            warn!(%error);
            eprintln!("Unable to solve level.");
            1
        }
    });
}

fn run(args: &Args) -> Result<(), SolverError> {
    let stdin = std::io::stdin();
    let mut server = stdin.lock().lines();

    // The server answers the greeting with the level definition.
    println!("Multisoko");
    let _ = std::io::stdout().flush();
    let mut text = String::new();
    for line in server.by_ref() {
        let line = line.map_err(|error| SolverError::Parse(error.to_string()))?;
        let done = line.trim() == "#end";
        text.push_str(&line);
        text.push('\n');
        if done {
            break;
        }
    }
    let level = parse_level(&text)?;

    let strategy = args.strategy();
    info!(?strategy, max_memory_mb = args.max_memory, "starting search");
    let heuristic: Rc<RefCell<dyn Heuristic>> =
        Rc::new(RefCell::new(VisibilityGraph::new(&level.initial)));
    let mut manager = Manager::new(
        &level.initial,
        strategy,
        heuristic,
        args.max_memory,
        args.time_limit,
    )?;
    let outcome = manager.run()?;
    info!(
        nodes_explored = outcome.nodes_explored,
        plan_length = outcome.makespan(),
        "found a solution"
    );

    for joint in outcome.joint_actions() {
        println!("{joint}");
        let _ = std::io::stdout().flush();
        match server.next() {
            Some(Ok(response)) if response.contains("false") => {
                warn!(%response, action = %joint, "server rejected the action");
                break;
            }
            Some(Ok(_)) => {}
            _ => break,
        }
    }
    Ok(())
}
