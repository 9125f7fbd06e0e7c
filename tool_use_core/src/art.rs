//! ASCII art: the textual board layout every game is built from.

use crate::{Position, environment::ConfigError, map::Grid};

/// Ground character: a cell with nothing on it.
pub const GROUND: char = ' ';

/// Parses rectangular art into a character grid.
///
/// Rows are taken verbatim (spaces are ground), so callers must not trim them.
pub fn parse_art<S: AsRef<str>>(lines: &[S]) -> Result<Grid<char>, ConfigError> {
    let rows: Vec<Vec<char>> = lines
        .iter()
        .map(|line| line.as_ref().chars().collect())
        .collect();
    let width = rows.first().map(Vec::len).ok_or(ConfigError::EmptyArt)?;
    if width == 0 {
        return Err(ConfigError::EmptyArt);
    }
    for (row, cells) in rows.iter().enumerate() {
        if cells.len() != width {
            return Err(ConfigError::RaggedArt {
                row,
                expected: width,
                found: cells.len(),
            });
        }
    }
    Ok(Grid::from_generator(rows.len(), width, |p| rows[p.row][p.col]))
}

/// Renders a character grid back into art lines.
pub fn to_lines(art: &Grid<char>) -> Vec<String> {
    (0..art.height())
        .filter_map(|row| art.row(row))
        .map(|cells| cells.iter().collect())
        .collect()
}

/// Paints `ch` at each position.
pub fn paint(art: &mut Grid<char>, positions: &[Position], ch: char) -> Result<(), ConfigError> {
    for position in positions {
        art.set(*position, ch)?;
    }
    Ok(())
}

/// Positions holding `ch`, in row-major order.
pub fn find(art: &Grid<char>, ch: char) -> Vec<Position> {
    art.enumerate()
        .filter(|(_, cell)| **cell == ch)
        .map(|(position, _)| position)
        .collect()
}
