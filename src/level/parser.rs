//! Parser for the level format exchanged with the game server: a header of
//! `colour: objects` declarations, the `#initial` map block, the `#goal`
//! mask and a closing `#end` marker.

use crate::errors::SolverError;
use crate::level::{Color, Position, WallMap};
use crate::state::State;
use nom::{
    character::complete::{alpha1, char, one_of, space0},
    combinator::{all_consuming, map_res},
    multi::separated_list1,
    sequence::tuple,
    IResult,
};
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

const AGENT_KEYS: &str = "0123456789";
const BOX_KEYS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A parsed level: the fully-populated initial state plus the colour table.
#[derive(Debug, Clone)]
pub struct Level {
    pub initial: State,
    pub colors: HashMap<char, Color>,
}

fn object_key(input: &str) -> IResult<&str, char> {
    one_of("0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ")(input)
}

/// One header declaration, e.g. `blue: 0, A, B`.
fn color_line(input: &str) -> IResult<&str, (Color, Vec<char>)> {
    let (input, color) = map_res(alpha1, Color::from_str)(input)?;
    let (input, _) = tuple((space0, char(':'), space0))(input)?;
    let (input, keys) =
        separated_list1(tuple((space0, char(','), space0)), object_key)(input)?;
    let (input, _) = space0(input)?;
    Ok((input, (color, keys)))
}

/// Anything left of the first wall is junk from the transport layer; replace
/// it with walls so the row keeps its width.
fn normalize_row(line: &str) -> String {
    match line.find('+') {
        Some(i) => format!("{}{}", "+".repeat(i), &line[i..]),
        None => line.to_string(),
    }
}

#[derive(PartialEq)]
enum Section {
    Header,
    Initial,
    Goal,
    Done,
}

pub fn parse_level(text: &str) -> Result<Level, SolverError> {
    let mut colors: HashMap<char, Color> = HashMap::new();
    let mut initial_rows: Vec<String> = Vec::new();
    let mut goal_rows: Vec<String> = Vec::new();
    let mut section = Section::Header;

    for raw in text.lines() {
        let line = raw.trim_end_matches('\r');
        match section {
            Section::Header => {
                if line.trim() == "#initial" {
                    section = Section::Initial;
                } else if !line.trim().is_empty() {
                    let (_, (color, keys)) = all_consuming(color_line)(line.trim())
                        .map_err(|_| {
                            SolverError::Parse(format!("bad colour declaration '{line}'"))
                        })?;
                    for key in keys {
                        colors.insert(key, color);
                    }
                }
            }
            Section::Initial => {
                if line.trim() == "#goal" {
                    section = Section::Goal;
                } else {
                    initial_rows.push(normalize_row(line));
                }
            }
            Section::Goal => {
                if line.trim() == "#end" {
                    section = Section::Done;
                } else {
                    goal_rows.push(normalize_row(line));
                }
            }
            Section::Done => break,
        }
    }

    if section != Section::Done {
        return Err(SolverError::Parse("missing #end marker".to_string()));
    }
    if initial_rows.is_empty() {
        return Err(SolverError::Parse("empty map".to_string()));
    }
    if initial_rows.len() != goal_rows.len() {
        return Err(SolverError::Parse(
            "initial and goal blocks differ in height".to_string(),
        ));
    }

    let width = initial_rows
        .iter()
        .chain(goal_rows.iter())
        .map(String::len)
        .max()
        .unwrap_or(0);
    for row in initial_rows.iter_mut().chain(goal_rows.iter_mut()) {
        while row.len() < width {
            row.push('+');
        }
    }

    build_state(&initial_rows, &goal_rows, colors)
}

fn build_state(
    initial_rows: &[String],
    goal_rows: &[String],
    colors: HashMap<char, Color>,
) -> Result<Level, SolverError> {
    let mut wall_rows: Vec<Vec<bool>> = Vec::with_capacity(initial_rows.len());
    let mut agents: Vec<(char, Position, Color)> = Vec::new();
    let mut boxes: Vec<(char, Position, Color)> = Vec::new();

    for (row, line) in initial_rows.iter().enumerate() {
        let mut walls = Vec::with_capacity(line.len());
        for (col, cell) in line.chars().enumerate() {
            let position = Position::new(row as i16, col as i16);
            if cell == '+' {
                walls.push(true);
            } else if AGENT_KEYS.contains(cell) {
                let color = colors.get(&cell).copied().ok_or_else(|| {
                    SolverError::Parse(format!("agent '{cell}' has no colour"))
                })?;
                agents.push((cell, position, color));
                walls.push(false);
            } else if BOX_KEYS.contains(cell) {
                match colors.get(&cell) {
                    Some(color) => {
                        boxes.push((cell, position, *color));
                        walls.push(false);
                    }
                    // A box nobody can touch is as good as a wall.
                    None => walls.push(true),
                }
            } else if cell == ' ' {
                walls.push(false);
            } else {
                return Err(SolverError::Parse(format!(
                    "unexpected cell '{cell}' at {position}"
                )));
            }
        }
        wall_rows.push(walls);
    }

    let map = Rc::new(WallMap::from_rows(wall_rows));
    let mut state = State::new(Rc::clone(&map));
    for (key, position, color) in agents {
        state.add_agent(key, position, color);
    }
    for (key, position, color) in boxes {
        state.add_box(key, position, color);
    }

    for (row, line) in goal_rows.iter().enumerate() {
        for (col, cell) in line.chars().enumerate() {
            if BOX_KEYS.contains(cell) {
                let position = Position::new(row as i16, col as i16);
                let color = colors.get(&cell).copied().ok_or_else(|| {
                    SolverError::Parse(format!("goal '{cell}' has no colour"))
                })?;
                if !state
                    .boxes_by_key(cell)
                    .iter()
                    .any(|(_, box_color)| *box_color == color)
                {
                    return Err(SolverError::Parse(format!(
                        "goal '{cell}' at {position} has no matching box"
                    )));
                }
                state.add_goal(cell, position, color);
            } else if cell != '+' && cell != ' ' {
                return Err(SolverError::Parse(format!(
                    "unexpected goal cell '{cell}'"
                )));
            }
        }
    }

    Ok(Level {
        initial: state,
        colors,
    })
}
