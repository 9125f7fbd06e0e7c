//! Seeded level generators for the push-box games.

use rand::{Rng, rngs::StdRng, seq::IndexedRandom, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Position,
    agent::shortest_path,
    art::{self, GROUND},
    environment::ConfigError,
    layer::Layer,
    map::Grid,
};

pub const MAX_BOXES: usize = 3;

/// Walled 9x9 board with a river across the middle row.
pub const RIVER_TEMPLATE: [&str; 9] = [
    "#########",
    "#       #",
    "#       #",
    "#       #",
    "#WWWWWWW#",
    "#       #",
    "#       #",
    "#       #",
    "#########",
];

/// Options for [`river_art`]. Every `random_*` switch falls back to a fixed,
/// centred layout when off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverOptions {
    /// Number of boxes, `1..=3`. `None` draws one.
    pub num_boxes: Option<usize>,
    /// Swap which bank holds the player and which the goal.
    pub random_sides: bool,
    pub random_box_positions: bool,
    pub random_goal_position: bool,
    pub random_player_position: bool,
    /// Rotate the finished board by a random number of quarter turns.
    pub random_rotations: bool,
}

impl Default for RiverOptions {
    fn default() -> Self {
        RiverOptions {
            num_boxes: None,
            random_sides: true,
            random_box_positions: true,
            random_goal_position: true,
            random_player_position: true,
            random_rotations: true,
        }
    }
}

impl RiverOptions {
    /// No randomness at all: player top centre, goal bottom centre, boxes in the top-left.
    pub fn fixed(num_boxes: usize) -> Self {
        RiverOptions {
            num_boxes: Some(num_boxes),
            random_sides: false,
            random_box_positions: false,
            random_goal_position: false,
            random_player_position: false,
            random_rotations: false,
        }
    }
}

fn box_count(requested: Option<usize>, rng: &mut StdRng) -> Result<usize, ConfigError> {
    match requested {
        None => Ok(rng.random_range(1..=MAX_BOXES)),
        Some(n) if (1..=MAX_BOXES).contains(&n) => Ok(n),
        Some(n) => Err(ConfigError::BoxCount(n)),
    }
}

/// Distinct box ids, drawn from `0..=9` or taken in order.
fn box_ids(count: usize, shuffle: bool, rng: &mut StdRng) -> Vec<u8> {
    let mut ids: Vec<u8> = (0..Layer::BOX_COUNT).collect();
    if shuffle {
        ids.shuffle(rng);
    }
    ids.truncate(count);
    ids
}

/// Generates a Bridge Building board.
///
/// The player starts on one bank and the goal sits on the other; the boxes are
/// placed on the two rows between the player's bank and the river.
pub fn river_art(options: &RiverOptions, rng: &mut StdRng) -> Result<Grid<char>, ConfigError> {
    let num_boxes = box_count(options.num_boxes, rng)?;
    let mut art = art::parse_art(&RIVER_TEMPLATE)?;
    let size = art.height();
    let middle = size / 2;
    let banks = [1, size - 2];

    let (player_side, goal_side) = if options.random_sides && rng.random_bool(0.5) {
        (1, 0)
    } else {
        (0, 1)
    };
    let player_col = if options.random_player_position {
        rng.random_range(1..size - 1)
    } else {
        middle
    };
    let goal_col = if options.random_goal_position {
        rng.random_range(1..size - 1)
    } else {
        middle
    };

    let box_rows = if player_side == 0 {
        2..middle
    } else {
        middle + 1..size - 2
    };
    let mut candidates: Vec<Position> = (1..size - 1)
        .flat_map(|col| box_rows.clone().map(move |row| Position::new(row, col)))
        .collect();
    if options.random_box_positions {
        candidates.shuffle(rng);
    }
    let ids = box_ids(num_boxes, options.random_box_positions, rng);

    art[Position::new(banks[player_side], player_col)] = Layer::Player.to_char();
    art[Position::new(banks[goal_side], goal_col)] = Layer::Goal.to_char();
    for (position, id) in candidates.into_iter().zip(ids) {
        art[position] = Layer::Box(id).to_char();
    }

    if options.random_rotations {
        for _ in 0..rng.random_range(0..4) {
            art = art.rotated_ccw();
        }
    }
    Ok(art)
}

pub const TOOL_USE_SIZE: usize = 8;
const TOOL_USE_PLAYER_ROW: usize = 1;
const TOOL_USE_GOAL_ROW: usize = 6;
const RIVER_ROWS: std::ops::RangeInclusive<usize> = 2..=5;
const RIVER_LENGTH: usize = 6;
/// A row the shortest path walks along this many cells cannot hold the river.
const PATH_ROW_LIMIT: usize = 3;

/// Options for [`tool_use_art`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolUseOptions {
    /// Number of boxes, `1..=3`, raised if the river crosses the shortest path
    /// more often. `None` draws one.
    pub num_boxes: Option<usize>,
}

fn is_edge(position: Position, size: usize) -> bool {
    position.row == 0 || position.col == 0 || position.row == size - 1 || position.col == size - 1
}

/// Generates a Tool Use board: an open 8x8 field with the player on row 1,
/// the goal on row 6 and a six-cell river on one row in between.
///
/// The river avoids rows the shortest player-to-goal path runs along. Boxes
/// are kept off the edges and off that path; any box that would sit on the
/// river (including where the path crosses it) starts out sunk as a bridge.
pub fn tool_use_art(options: &ToolUseOptions, rng: &mut StdRng) -> Result<Grid<char>, ConfigError> {
    if let Some(n) = options.num_boxes {
        if !(1..=MAX_BOXES).contains(&n) {
            return Err(ConfigError::BoxCount(n));
        }
    }
    let size = TOOL_USE_SIZE;
    let mut art = Grid::filled(size, size, GROUND);
    let mut free: Vec<Position> = (0..size)
        .flat_map(|row| (0..size).map(move |col| Position::new(row, col)))
        .collect();
    free.shuffle(rng);

    let goal = Position::new(TOOL_USE_GOAL_ROW, rng.random_range(0..size));
    let player = Position::new(TOOL_USE_PLAYER_ROW, rng.random_range(0..size));
    art[goal] = Layer::Goal.to_char();
    art[player] = Layer::Player.to_char();
    free.retain(|p| *p != goal && *p != player);

    let path = shortest_path(&art, player, goal, |ch| ch != Layer::Wall.to_char())
        .ok_or(ConfigError::NoRoom("a path to the goal"))?;
    let interior = &path[1..path.len() - 1];

    let mut row_count = vec![0; size];
    for cell in interior {
        row_count[cell.row] += 1;
    }
    let river_rows: Vec<usize> = RIVER_ROWS
        .filter(|row| *row != player.row && *row != goal.row && row_count[*row] < PATH_ROW_LIMIT)
        .collect();
    let river_row = *river_rows
        .choose(rng)
        .ok_or(ConfigError::NoRoom("the river"))?;
    let mut columns: Vec<usize> = (0..size).collect();
    columns.shuffle(rng);
    let river: Vec<Position> = columns
        .into_iter()
        .take(RIVER_LENGTH)
        .map(|col| Position::new(river_row, col))
        .collect();

    let crossings: Vec<Position> = interior
        .iter()
        .filter(|cell| river.contains(cell))
        .copied()
        .collect();
    let minimum = crossings.len().max(1);
    let num_boxes = match options.num_boxes {
        Some(n) => n.max(minimum),
        None => rng.random_range(minimum..=MAX_BOXES.max(minimum)),
    };
    let mut ids = box_ids(num_boxes, true, rng);
    let mut allowed: Vec<Position> = free
        .into_iter()
        .filter(|p| !is_edge(*p, size) && !interior.contains(p))
        .collect();

    // One box per crossing is already sunk there.
    for cell in &crossings {
        ids.pop();
        art[*cell] = Layer::Bridge.to_char();
    }
    for id in ids {
        let cell = allowed.pop().ok_or(ConfigError::NoRoom("a box"))?;
        art[cell] = if river.contains(&cell) {
            Layer::Bridge.to_char()
        } else {
            Layer::Box(id).to_char()
        };
    }
    for cell in river {
        if art[cell] == GROUND {
            art[cell] = Layer::Water.to_char();
        }
    }
    tracing::trace!(river_row, boxes = num_boxes, "generated tool use art");
    Ok(art)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn count(art: &Grid<char>, predicate: impl Fn(char) -> bool) -> usize {
        art.iter().filter(|ch| predicate(**ch)).count()
    }

    #[test]
    fn fixed_river_layout() {
        let mut rng = StdRng::seed_from_u64(0);
        let art = river_art(&RiverOptions::fixed(2), &mut rng).unwrap();
        assert_eq!(
            art::to_lines(&art),
            vec![
                "#########",
                "#   P   #",
                "#0      #",
                "#1      #",
                "#WWWWWWW#",
                "#       #",
                "#       #",
                "#   G   #",
                "#########",
            ]
        );
    }

    #[test]
    fn random_river_boards_keep_their_inventory() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let art = river_art(&RiverOptions::default(), &mut rng).unwrap();
            assert_eq!((art.height(), art.width()), (9, 9));
            assert_eq!(art::find(&art, 'P').len(), 1);
            assert_eq!(art::find(&art, 'G').len(), 1);
            assert_eq!(art::find(&art, 'W').len(), 7);
            assert_eq!(count(&art, |ch| ch == '#'), 32);
            let boxes = count(&art, |ch| ch.is_ascii_digit());
            assert!((1..=3).contains(&boxes), "seed {seed}: {boxes} boxes");
        }
    }

    #[test]
    fn river_box_count_is_checked() {
        let mut rng = StdRng::seed_from_u64(0);
        for n in [0, 4] {
            assert_eq!(
                river_art(&RiverOptions::fixed(n), &mut rng),
                Err(ConfigError::BoxCount(n))
            );
        }
        assert_eq!(
            tool_use_art(&ToolUseOptions { num_boxes: Some(5) }, &mut rng),
            Err(ConfigError::BoxCount(5))
        );
    }

    #[test]
    fn generation_is_reproducible() {
        let a = tool_use_art(&ToolUseOptions::default(), &mut StdRng::seed_from_u64(7)).unwrap();
        let b = tool_use_art(&ToolUseOptions::default(), &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
        let c = river_art(&RiverOptions::default(), &mut StdRng::seed_from_u64(7)).unwrap();
        let d = river_art(&RiverOptions::default(), &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn tool_use_boards_are_well_formed() {
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let art = tool_use_art(&ToolUseOptions::default(), &mut rng).unwrap();
            assert_eq!((art.height(), art.width()), (TOOL_USE_SIZE, TOOL_USE_SIZE));

            let player = art::find(&art, 'P');
            let goal = art::find(&art, 'G');
            assert_eq!(player.len(), 1);
            assert_eq!(goal.len(), 1);
            assert_eq!(player[0].row, TOOL_USE_PLAYER_ROW);
            assert_eq!(goal[0].row, TOOL_USE_GOAL_ROW);

            let river: Vec<Position> = art
                .enumerate()
                .filter(|(_, ch)| **ch == 'W' || **ch == 'B')
                .map(|(p, _)| p)
                .collect();
            assert!(river.iter().all(|p| p.row == river[0].row), "seed {seed}");
            assert!(RIVER_ROWS.contains(&river[0].row));
            let water = art::find(&art, 'W').len();
            assert!(water <= RIVER_LENGTH && river.len() >= RIVER_LENGTH);

            let bridges = art::find(&art, 'B').len();
            let boxes: Vec<Position> = art
                .enumerate()
                .filter(|(_, ch)| ch.is_ascii_digit())
                .map(|(p, _)| p)
                .collect();
            assert!((1..=3).contains(&(boxes.len() + bridges)), "seed {seed}");
            assert!(boxes.iter().all(|p| !is_edge(*p, TOOL_USE_SIZE)));
        }
    }
}
