use std::fmt;

/// A cell in the level grid, addressed as `(row, col)` with the origin in the
/// top-left corner. Signed coordinates so that stepping off the map produces
/// an out-of-bounds position instead of a wrap-around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: i16,
    pub col: i16,
}

impl Position {
    pub fn new(row: i16, col: i16) -> Self {
        Self { row, col }
    }

    /// L1 distance between two cells.
    pub fn manhattan(&self, other: &Position) -> u32 {
        u32::from(self.row.abs_diff(other.row)) + u32::from(self.col.abs_diff(other.col))
    }

    pub fn step(&self, direction: Direction) -> Position {
        let (dr, dc) = direction.delta();
        Position::new(self.row + dr, self.col + dc)
    }

    pub fn neighbours(&self) -> [Position; 4] {
        [
            self.step(Direction::North),
            self.step(Direction::South),
            self.step(Direction::East),
            self.step(Direction::West),
        ]
    }

    /// True when the two cells are 4-neighbours.
    pub fn is_adjacent(&self, other: &Position) -> bool {
        self.manhattan(other) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// One of the four cardinal movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Row/column delta of a single step.
    pub fn delta(&self) -> (i16, i16) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Direction::North => 'N',
            Direction::South => 'S',
            Direction::East => 'E',
            Direction::West => 'W',
        };
        write!(f, "{letter}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance() {
        let a = Position::new(1, 1);
        let b = Position::new(3, 4);
        assert_eq!(a.manhattan(&b), 5);
        assert_eq!(b.manhattan(&a), 5);
        assert_eq!(a.manhattan(&a), 0);
    }

    #[test]
    fn stepping_and_adjacency() {
        let p = Position::new(2, 2);
        assert_eq!(p.step(Direction::North), Position::new(1, 2));
        assert_eq!(p.step(Direction::East), Position::new(2, 3));
        assert!(p.is_adjacent(&p.step(Direction::South)));
        assert!(!p.is_adjacent(&p));
        for direction in Direction::ALL {
            assert_eq!(p.step(direction).step(direction.opposite()), p);
        }
    }
}
