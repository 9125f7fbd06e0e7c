//! Trap Tube: an agent uses a rigid multi-cell tool to push or pull a piece
//! of food out of a tube whose ends are a trap and an exit.
//!
//! The per-tick update order is food, tool, agent, then the (static) tube,
//! trap and exit drapes, and finally the task drape that pays out the reward.
//! Food moves first so the tool can tell whether its leading edge was cleared.

use rand::{Rng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Direction, Position,
    art::{self, GROUND},
    environment::{ActionSpace, ConfigError, EpisodeError, Game, Observation},
    layer::{Layer, LayerSet, Occupancy, Rgb},
    map::{Grid, Mask},
    plot::{Outcome, Plot},
};

pub const REWARD: f64 = 1.0;

pub const REACHED_FOOD: &str = "reached_food";
pub const AGENT_POSITION: &str = "agent_position";
pub const FOOD_POSITIONS: &str = "food_positions";

/// Layers the food cannot be moved into. Exits are open.
const FOOD_IMPASSABLE: LayerSet = LayerSet::single(Layer::Trap)
    .with(Layer::Tube)
    .with(Layer::FakeTube);

/// How the agent engages the tool this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grasp {
    /// Walk without touching the tool.
    Move,
    /// Stand behind the tool and shove it ahead.
    Push,
    /// Stand in front of the tool and draw it along.
    Pull,
}

impl Grasp {
    pub const ALL: [Grasp; 3] = [Grasp::Move, Grasp::Push, Grasp::Pull];

    pub fn from_index(index: usize) -> Option<Grasp> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Grasp::Move => 0,
            Grasp::Push => 1,
            Grasp::Pull => 2,
        }
    }
}

/// A `(grasp, direction)` action, encoded as `[grasp, direction]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolAction {
    pub grasp: Grasp,
    pub direction: Direction,
}

impl ToolAction {
    pub const fn new(grasp: Grasp, direction: Direction) -> Self {
        ToolAction { grasp, direction }
    }

    pub const fn walk(direction: Direction) -> Self {
        Self::new(Grasp::Move, direction)
    }

    pub const fn push(direction: Direction) -> Self {
        Self::new(Grasp::Push, direction)
    }

    pub const fn pull(direction: Direction) -> Self {
        Self::new(Grasp::Pull, direction)
    }

    pub fn encode(self) -> [usize; 2] {
        [self.grasp.index(), self.direction.index()]
    }
}

/// The axis a tool's cells run along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolAxis {
    /// Cells stacked downwards from the origin.
    #[default]
    Vertical,
    /// Cells extending rightwards from the origin.
    Horizontal,
}

/// Placement of the rigid tool: `size` cells from `position` along `axis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub position: Position,
    pub size: usize,
    pub axis: ToolAxis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapTubeConfig {
    /// Board art: ground `' '`, agent `a`, tube `m`, fake tube `w`, trap `u`, exit `n`.
    pub art: Vec<String>,
    pub tool: ToolSpec,
    pub food: Position,
}

impl Default for TrapTubeConfig {
    fn default() -> Self {
        Self::base()
    }
}

impl TrapTubeConfig {
    /// 12x12 board: food inside a tube with the trap on the left and the exit on the right.
    pub fn base() -> Self {
        TrapTubeConfig {
            art: lines(&[
                "            ",
                "            ",
                "            ",
                "            ",
                "    mmmm    ",
                "    u  n    ",
                "    u  n    ",
                "    wwww    ",
                "            ",
                " a          ",
                "            ",
                "            ",
            ]),
            tool: ToolSpec {
                position: Position::new(6, 2),
                size: 4,
                axis: ToolAxis::Vertical,
            },
            food: Position::new(6, 5),
        }
    }

    /// 10x10 board with the tube mirrored: exit on the left, trap on the right,
    /// and the tool starting east of the tube.
    pub fn trap() -> Self {
        TrapTubeConfig {
            art: lines(&[
                "          ",
                "          ",
                "  mmmmm   ",
                "  n   u   ",
                "  n   u   ",
                "  wwwww   ",
                "          ",
                "        a ",
                "          ",
                "          ",
            ]),
            tool: ToolSpec {
                position: Position::new(4, 7),
                size: 4,
                axis: ToolAxis::Vertical,
            },
            food: Position::new(4, 5),
        }
    }
}

fn lines(rows: &[&str]) -> Vec<String> {
    rows.iter().map(|row| row.to_string()).collect()
}

/// Update groups, run in this order once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapTubeStage {
    Food,
    Tool,
    Agent,
    Tubes,
    Traps,
    Exits,
    Task,
}

pub const TRAP_TUBE_SCHEDULE: [TrapTubeStage; 7] = [
    TrapTubeStage::Food,
    TrapTubeStage::Tool,
    TrapTubeStage::Agent,
    TrapTubeStage::Tubes,
    TrapTubeStage::Traps,
    TrapTubeStage::Exits,
    TrapTubeStage::Task,
];

/// Static tube, fake tube, trap and exit masks.
#[derive(Debug, Clone)]
pub struct Terrain {
    tubes: Mask,
    fake_tubes: Mask,
    traps: Mask,
    exits: Mask,
}

impl Terrain {
    fn step(&self, position: Position, direction: Direction) -> Option<Position> {
        self.tubes.step(position, direction)
    }

    fn layers(&self) -> [(Layer, &Mask); 4] {
        [
            (Layer::Trap, &self.traps),
            (Layer::Exit, &self.exits),
            (Layer::Tube, &self.tubes),
            (Layer::FakeTube, &self.fake_tubes),
        ]
    }
}

impl Occupancy for Terrain {
    fn occupies(&self, layer: Layer, position: Position) -> bool {
        match layer {
            Layer::Tube => self.tubes.is_set(position),
            Layer::FakeTube => self.fake_tubes.is_set(position),
            Layer::Trap => self.traps.is_set(position),
            Layer::Exit => self.exits.is_set(position),
            _ => false,
        }
    }
}

/// Terrain plus, optionally, the tool.
struct Surroundings<'a> {
    terrain: &'a Terrain,
    tool: Option<&'a ToolDrape>,
}

impl Occupancy for Surroundings<'_> {
    fn occupies(&self, layer: Layer, position: Position) -> bool {
        match layer {
            Layer::Tool => self.tool.is_some_and(|tool| tool.curtain.is_set(position)),
            _ => self.terrain.occupies(layer, position),
        }
    }
}

fn tool_cells(origin: Position, size: usize, axis: ToolAxis) -> Vec<Position> {
    (0..size)
        .map(|i| match axis {
            ToolAxis::Vertical => Position::new(origin.row + i, origin.col),
            ToolAxis::Horizontal => Position::new(origin.row, origin.col + i),
        })
        .collect()
}

/// A rigid straight tool. All of its cells move together or not at all.
#[derive(Debug, Clone)]
pub struct ToolDrape {
    origin: Position,
    size: usize,
    axis: ToolAxis,
    curtain: Mask,
    has_moved: bool,
}

impl ToolDrape {
    fn new(spec: ToolSpec, height: usize, width: usize) -> Result<Self, ConfigError> {
        if spec.size == 0 {
            return Err(ConfigError::ToolSize(spec.size));
        }
        let out_of_bounds = || ConfigError::ToolOutOfBounds {
            row: spec.position.row,
            col: spec.position.col,
            size: spec.size,
            height,
            width,
        };
        let (row_span, col_span) = match spec.axis {
            ToolAxis::Vertical => (spec.size - 1, 0),
            ToolAxis::Horizontal => (0, spec.size - 1),
        };
        let last_row = spec.position.row.checked_add(row_span).filter(|row| *row < height);
        let last_col = spec.position.col.checked_add(col_span).filter(|col| *col < width);
        if last_row.is_none() || last_col.is_none() {
            return Err(out_of_bounds());
        }
        let mut curtain = Mask::empty(height, width);
        for cell in tool_cells(spec.position, spec.size, spec.axis) {
            curtain.set(cell, true).map_err(|_| out_of_bounds())?;
        }
        Ok(ToolDrape {
            origin: spec.position,
            size: spec.size,
            axis: spec.axis,
            curtain,
            has_moved: false,
        })
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn axis(&self) -> ToolAxis {
        self.axis
    }

    pub fn curtain(&self) -> &Mask {
        &self.curtain
    }

    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    /// The cell at the far end from the origin.
    pub fn last(&self) -> Position {
        match self.axis {
            ToolAxis::Vertical => Position::new(self.origin.row + self.size - 1, self.origin.col),
            ToolAxis::Horizontal => Position::new(self.origin.row, self.origin.col + self.size - 1),
        }
    }

    /// Cells covered by the tool, origin first.
    pub fn cells(&self) -> Vec<Position> {
        tool_cells(self.origin, self.size, self.axis)
    }

    /// True if `position` is in the line of cells touching the tool's
    /// `direction` face, within the tool's extent across that face.
    pub fn is_ahead(&self, position: Position, direction: Direction) -> bool {
        let (first, last) = (self.origin, self.last());
        let across_rows = (first.row..=last.row).contains(&position.row);
        let across_cols = (first.col..=last.col).contains(&position.col);
        match direction {
            Direction::North => position.row + 1 == first.row && across_cols,
            Direction::South => position.row == last.row + 1 && across_cols,
            Direction::West => position.col + 1 == first.col && across_rows,
            Direction::East => position.col == last.col + 1 && across_rows,
        }
    }

    /// True if an agent at `agent` is holding the tool the way `action` needs:
    /// behind it for a push, in front of it for a pull.
    pub fn is_engaged(&self, agent: Position, action: ToolAction) -> bool {
        match action.grasp {
            Grasp::Move => false,
            Grasp::Push => self.is_ahead(agent, action.direction.opposite()),
            Grasp::Pull => self.is_ahead(agent, action.direction),
        }
    }

    fn update(
        &mut self,
        action: ToolAction,
        agent: &AgentSprite,
        food: &FoodDrape,
        terrain: &Terrain,
        plot: &mut Plot,
    ) {
        self.has_moved = false;
        if !self.is_engaged(agent.position, action) {
            return;
        }
        let direction = action.direction;
        let leading = match direction {
            Direction::North | Direction::West => self.origin,
            Direction::South | Direction::East => self.last(),
        };
        if self.curtain.step(leading, direction).is_none() {
            return;
        }
        // Food sitting against the leading face must have been moved out of the way first.
        if food.position.is_some_and(|p| self.is_ahead(p, direction)) && !food.has_moved {
            return;
        }
        if !agent.can_move(direction, terrain) {
            return;
        }
        let Some(origin) = self.origin.offset(direction) else {
            return;
        };
        self.curtain.shift(direction);
        self.origin = origin;
        self.has_moved = true;
        plot.info_mut().flag(format!("move_tool_{}", direction.name()));
    }
}

/// The reward item.
#[derive(Debug, Clone)]
pub struct FoodDrape {
    /// `None` once eaten.
    position: Option<Position>,
    curtain: Mask,
    has_moved: bool,
}

impl FoodDrape {
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn curtain(&self) -> &Mask {
        &self.curtain
    }

    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    /// Moves one cell when the agent works the tool and the food lies against
    /// the tool's face in the direction of travel.
    fn update(
        &mut self,
        action: ToolAction,
        tool: &ToolDrape,
        agent: &AgentSprite,
        terrain: &Terrain,
        plot: &mut Plot,
    ) {
        self.has_moved = false;
        let Some(position) = self.position else {
            return;
        };
        let direction = action.direction;
        if !tool.is_engaged(agent.position, action)
            || !agent.can_move(direction, terrain)
            || !tool.is_ahead(position, direction)
        {
            return;
        }
        let Some(target) = self.curtain.step(position, direction) else {
            return;
        };
        if terrain.blocks(FOOD_IMPASSABLE, target) {
            return;
        }
        self.curtain[position] = false;
        self.curtain[target] = true;
        self.position = Some(target);
        self.has_moved = true;
        plot.info_mut().flag(format!("move_food_{}", direction.name()));
    }

    /// Removes the food if the agent is standing on it.
    fn eat(&mut self, agent: Position) -> bool {
        if self.position != Some(agent) {
            return false;
        }
        self.curtain[agent] = false;
        self.position = None;
        true
    }
}

/// The agent sprite.
#[derive(Debug, Clone)]
pub struct AgentSprite {
    position: Position,
    impassable: LayerSet,
    has_moved: bool,
}

impl AgentSprite {
    fn new(position: Position) -> Self {
        AgentSprite {
            position,
            impassable: [
                Layer::Tool,
                Layer::Tube,
                Layer::FakeTube,
                Layer::Trap,
                Layer::Exit,
            ]
            .into_iter()
            .collect(),
            has_moved: false,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    pub fn impassable(&self) -> LayerSet {
        self.impassable
    }

    /// Whether the next cell in `direction` is on the board and free of
    /// terrain. The tool is ignored here since it moves out of the way first.
    pub fn can_move(&self, direction: Direction, terrain: &Terrain) -> bool {
        let Some(target) = terrain.step(self.position, direction) else {
            return false;
        };
        let surroundings = Surroundings {
            terrain,
            tool: None,
        };
        !surroundings.blocks(self.impassable, target)
    }

    fn update(&mut self, action: ToolAction, tool: &ToolDrape, terrain: &Terrain) {
        self.has_moved = false;
        // Push and pull only carry the agent along with a tool that moved.
        if action.grasp != Grasp::Move && !tool.has_moved {
            return;
        }
        let Some(target) = terrain.step(self.position, action.direction) else {
            return;
        };
        let surroundings = Surroundings {
            terrain,
            tool: Some(tool),
        };
        if surroundings.blocks(self.impassable, target) {
            return;
        }
        self.position = target;
        self.has_moved = true;
    }
}

/// The tool-and-food game.
#[derive(Debug, Clone)]
pub struct TrapTube {
    terrain: Terrain,
    tool: ToolDrape,
    food: FoodDrape,
    agent: AgentSprite,
}

impl TrapTube {
    pub fn from_config(config: &TrapTubeConfig) -> Result<Self, ConfigError> {
        let art = art::parse_art(&config.art)?;
        let (height, width) = (art.height(), art.width());
        let mut tubes = Mask::empty(height, width);
        let mut fake_tubes = Mask::empty(height, width);
        let mut traps = Mask::empty(height, width);
        let mut exits = Mask::empty(height, width);
        let mut agents = Vec::new();

        for (position, ch) in art.enumerate() {
            match Layer::from_char(*ch) {
                _ if *ch == GROUND => {}
                Some(Layer::Agent) => agents.push(position),
                Some(Layer::Tube) => tubes[position] = true,
                Some(Layer::FakeTube) => fake_tubes[position] = true,
                Some(Layer::Trap) => traps[position] = true,
                Some(Layer::Exit) => exits[position] = true,
                _ => {
                    return Err(ConfigError::UnknownCharacter {
                        ch: *ch,
                        row: position.row,
                        col: position.col,
                    });
                }
            }
        }
        let agent = match agents.as_slice() {
            [position] => AgentSprite::new(*position),
            _ => {
                return Err(ConfigError::SpriteCount {
                    ch: Layer::Agent.to_char(),
                    count: agents.len(),
                });
            }
        };

        let tool = ToolDrape::new(config.tool, height, width)?;
        for cell in tool.cells() {
            check_free(&art, "tool", cell)?;
        }

        let food = config.food;
        if !art.contains(food) {
            return Err(ConfigError::OutOfBounds {
                what: "food",
                row: food.row,
                col: food.col,
            });
        }
        check_free(&art, "food", food)?;
        if tool.curtain.is_set(food) {
            return Err(ConfigError::Overlap {
                what: "food",
                row: food.row,
                col: food.col,
            });
        }
        let mut curtain = Mask::empty(height, width);
        curtain[food] = true;

        Ok(TrapTube {
            terrain: Terrain {
                tubes,
                fake_tubes,
                traps,
                exits,
            },
            tool,
            food: FoodDrape {
                position: Some(food),
                curtain,
                has_moved: false,
            },
            agent,
        })
    }

    pub fn height(&self) -> usize {
        self.tool.curtain.height()
    }

    pub fn width(&self) -> usize {
        self.tool.curtain.width()
    }

    pub fn agent(&self) -> &AgentSprite {
        &self.agent
    }

    pub fn tool(&self) -> &ToolDrape {
        &self.tool
    }

    pub fn food(&self) -> &FoodDrape {
        &self.food
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    fn update_task(&mut self, plot: &mut Plot) {
        let agent = self.agent.position;
        plot.info_mut().insert(AGENT_POSITION, agent);
        plot.info_mut().insert(FOOD_POSITIONS, self.food.curtain.positions());
        if self.food.eat(agent) {
            plot.info_mut().flag(REACHED_FOOD);
            plot.add_reward(REWARD);
            tracing::debug!(row = agent.row, col = agent.col, "food reached");
        }
        if self.food.curtain.is_clear() {
            plot.terminate_episode(Outcome::Success);
        }
    }
}

fn check_free(art: &Grid<char>, what: &'static str, position: Position) -> Result<(), ConfigError> {
    if art.get(position).is_some_and(|ch| *ch != GROUND) {
        return Err(ConfigError::Overlap {
            what,
            row: position.row,
            col: position.col,
        });
    }
    Ok(())
}

impl Game for TrapTube {
    type Action = ToolAction;
    type Config = TrapTubeConfig;

    fn build(config: &Self::Config, _rng: &mut StdRng) -> Result<Self, ConfigError> {
        Self::from_config(config)
    }

    fn action_space() -> ActionSpace {
        ActionSpace::MultiDiscrete(vec![Grasp::ALL.len(), Direction::ALL.len()])
    }

    fn decode_action(encoded: &[usize]) -> Result<ToolAction, EpisodeError> {
        Self::action_space().validate(encoded)?;
        let grasp = Grasp::from_index(encoded[0]).ok_or(EpisodeError::InvalidAction {
            index: encoded[0],
            size: Grasp::ALL.len(),
        })?;
        let direction = Direction::from_index(encoded[1]).ok_or(EpisodeError::InvalidAction {
            index: encoded[1],
            size: Direction::ALL.len(),
        })?;
        Ok(ToolAction::new(grasp, direction))
    }

    fn sample_action<R: Rng + ?Sized>(rng: &mut R) -> ToolAction {
        let grasp = Grasp::ALL[rng.random_range(0..Grasp::ALL.len())];
        let direction = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
        ToolAction::new(grasp, direction)
    }

    fn tick(&mut self, action: ToolAction) -> Plot {
        let mut plot = Plot::new();
        for stage in TRAP_TUBE_SCHEDULE {
            match stage {
                TrapTubeStage::Food => {
                    self.food
                        .update(action, &self.tool, &self.agent, &self.terrain, &mut plot)
                }
                TrapTubeStage::Tool => {
                    self.tool
                        .update(action, &self.agent, &self.food, &self.terrain, &mut plot)
                }
                TrapTubeStage::Agent => self.agent.update(action, &self.tool, &self.terrain),
                // Terrain never changes.
                TrapTubeStage::Tubes | TrapTubeStage::Traps | TrapTubeStage::Exits => {}
                TrapTubeStage::Task => self.update_task(&mut plot),
            }
        }
        plot
    }

    fn observation(&self) -> Observation {
        let (height, width) = (self.height(), self.width());
        let mut layers: Vec<(Layer, Mask)> = self
            .terrain
            .layers()
            .into_iter()
            .map(|(layer, mask)| (layer, mask.clone()))
            .collect();
        layers.push((Layer::Food, self.food.curtain.clone()));
        layers.push((Layer::Tool, self.tool.curtain.clone()));
        let mut agent = Mask::empty(height, width);
        agent[self.agent.position] = true;
        layers.push((Layer::Agent, agent));
        Observation::compose(height, width, layers)
    }

    fn ground_color() -> Rgb {
        (72, 65, 17)
    }
}
