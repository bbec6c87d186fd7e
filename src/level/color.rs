use crate::errors::SolverError;
use std::fmt;
use std::str::FromStr;

/// Colour of an agent, box or goal. Agents may only push or pull boxes of
/// their own colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Blue,
    Red,
    Green,
    Cyan,
    Magenta,
    Orange,
    Pink,
    Yellow,
    Grey,
    Lightblue,
    Brown,
}

impl FromStr for Color {
    type Err = SolverError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "blue" => Ok(Color::Blue),
            "red" => Ok(Color::Red),
            "green" => Ok(Color::Green),
            "cyan" => Ok(Color::Cyan),
            "magenta" => Ok(Color::Magenta),
            "orange" => Ok(Color::Orange),
            "pink" => Ok(Color::Pink),
            "yellow" => Ok(Color::Yellow),
            "grey" | "gray" => Ok(Color::Grey),
            "lightblue" => Ok(Color::Lightblue),
            "brown" => Ok(Color::Brown),
            _ => Err(SolverError::Parse(format!("unknown colour '{name}'"))),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Blue => "blue",
            Color::Red => "red",
            Color::Green => "green",
            Color::Cyan => "cyan",
            Color::Magenta => "magenta",
            Color::Orange => "orange",
            Color::Pink => "pink",
            Color::Yellow => "yellow",
            Color::Grey => "grey",
            Color::Lightblue => "lightblue",
            Color::Brown => "brown",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Blue".parse::<Color>().unwrap(), Color::Blue);
        assert_eq!("RED".parse::<Color>().unwrap(), Color::Red);
        assert_eq!("gray".parse::<Color>().unwrap(), Color::Grey);
        assert!("mauve".parse::<Color>().is_err());
    }
}
