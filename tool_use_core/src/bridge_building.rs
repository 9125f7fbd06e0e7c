//! Push-box engine behind the Bridge Building and Tool Use games.
//!
//! A player pushes numbered boxes around a board crossed by water. Pushing a
//! box into water sinks it and leaves a bridge the player can walk over;
//! walking into open water ends the episode.
//!
//! Each tick runs the update groups in [`BRIDGE_SCHEDULE`] order:
//!
//! 1. boxes: react to the player's position from the previous tick,
//! 2. player: moves into whatever the boxes vacated,
//! 3. water: penalises a player standing in open water,
//! 4. goal: rewards and clears a reached goal cell.

use rand::{Rng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Direction, Position,
    art::GROUND,
    environment::{ActionSpace, ConfigError, EpisodeError, Game, Observation},
    layer::{Layer, LayerSet, Occupancy, Rgb},
    levels::{self, RiverOptions, ToolUseOptions},
    map::{Grid, Mask},
    plot::{Outcome, Plot},
};

pub const GOAL_REWARD: f64 = 1.0;
pub const WATER_REWARD: f64 = -1.0;

pub const MOVED_BOX: &str = "moved_box";
pub const MOVED_BOX_INTO_WATER: &str = "moved_box_into_water";
pub const BUILT_BRIDGE: &str = "built_bridge";
pub const MOVED_ACROSS_BRIDGE: &str = "moved_across_bridge";
pub const FELL_INTO_WATER: &str = "fell_into_water";
pub const REACHED_GOAL: &str = "reached_goal";

/// Player action.
///
/// ```text
///   0
/// 2 1 3     4 = stay
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeAction {
    Move(Direction),
    Stay,
}

impl BridgeAction {
    pub const COUNT: usize = 5;

    pub fn from_index(index: usize) -> Option<BridgeAction> {
        match index {
            4 => Some(BridgeAction::Stay),
            _ => Direction::from_index(index).map(BridgeAction::Move),
        }
    }

    pub fn index(self) -> usize {
        match self {
            BridgeAction::Move(direction) => direction.index(),
            BridgeAction::Stay => 4,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            BridgeAction::Move(direction) => Some(direction),
            BridgeAction::Stay => None,
        }
    }
}

/// What happens when a box is pushed onto water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterContact {
    /// The box sinks and the cell becomes a bridge.
    #[default]
    Bridge,
    /// Water is impassable to boxes.
    Refuse,
}

/// Per-game movement rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeRules {
    /// The player refuses to step into open water instead of drowning.
    pub hydrophobic: bool,
    pub water_contact: WaterContact,
}

/// Where the art for a game comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgeLevel {
    /// Literal art.
    Art { art: Vec<String> },
    /// Generated 9x9 walled board with a river across the middle.
    River(RiverOptions),
    /// Generated 8x8 open board with a partial river.
    ToolUse(ToolUseOptions),
}

impl Default for BridgeLevel {
    fn default() -> Self {
        BridgeLevel::River(RiverOptions::default())
    }
}

impl BridgeLevel {
    pub fn art(&self, rng: &mut StdRng) -> Result<Grid<char>, ConfigError> {
        match self {
            BridgeLevel::Art { art } => crate::art::parse_art(art),
            BridgeLevel::River(options) => levels::river_art(options, rng),
            BridgeLevel::ToolUse(options) => levels::tool_use_art(options, rng),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeBuildingConfig {
    pub level: BridgeLevel,
    pub rules: BridgeRules,
}

impl BridgeBuildingConfig {
    /// A literal level with default rules.
    pub fn from_art<S: AsRef<str>>(art: &[S]) -> Self {
        BridgeBuildingConfig {
            level: BridgeLevel::Art {
                art: art.iter().map(|line| line.as_ref().to_string()).collect(),
            },
            rules: BridgeRules::default(),
        }
    }

    /// The generated Tool Use board. The player never wades into the river.
    pub fn tool_use() -> Self {
        BridgeBuildingConfig {
            level: BridgeLevel::ToolUse(ToolUseOptions::default()),
            rules: BridgeRules {
                hydrophobic: true,
                ..BridgeRules::default()
            },
        }
    }
}

/// Update groups, run in this order once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStage {
    Boxes,
    Player,
    Water,
    Goal,
}

pub const BRIDGE_SCHEDULE: [BridgeStage; 4] = [
    BridgeStage::Boxes,
    BridgeStage::Player,
    BridgeStage::Water,
    BridgeStage::Goal,
];

/// The player sprite.
#[derive(Debug, Clone)]
pub struct PlayerSprite {
    position: Position,
    impassable: LayerSet,
    has_moved: bool,
}

impl PlayerSprite {
    fn new(position: Position, rules: BridgeRules) -> Self {
        let mut impassable = LayerSet::BOXES.with(Layer::Wall);
        if rules.hydrophobic {
            impassable = impassable.with(Layer::Water);
        }
        PlayerSprite {
            position,
            impassable,
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

    fn update(&mut self, action: BridgeAction, surroundings: &Surroundings<'_>, plot: &mut Plot) {
        self.has_moved = false;
        let Some(direction) = action.direction() else {
            return;
        };
        let Some(target) = surroundings.walls.step(self.position, direction) else {
            return;
        };
        if surroundings.blocks(self.impassable, target) {
            return;
        }
        if surroundings.water.is_bridge(target) {
            plot.info_mut().flag(MOVED_ACROSS_BRIDGE);
        }
        self.position = target;
        self.has_moved = true;
    }
}

/// A numbered pushable box.
#[derive(Debug, Clone)]
pub struct BoxSprite {
    id: u8,
    /// `None` once the box has sunk into a bridge.
    position: Option<Position>,
    impassable: LayerSet,
    water_contact: WaterContact,
    has_moved: bool,
}

impl BoxSprite {
    fn new(id: u8, position: Position, rules: BridgeRules) -> Self {
        let mut impassable = LayerSet::BOXES
            .without(Layer::Box(id))
            .with(Layer::Wall)
            .with(Layer::Player)
            .with(Layer::Goal);
        if rules.water_contact == WaterContact::Refuse {
            impassable = impassable.with(Layer::Water);
        }
        BoxSprite {
            id,
            position: Some(position),
            impassable,
            water_contact: rules.water_contact,
            has_moved: false,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn layer(&self) -> Layer {
        Layer::Box(self.id)
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn has_moved(&self) -> bool {
        self.has_moved
    }

    pub fn impassable(&self) -> LayerSet {
        self.impassable
    }

    /// Moves only when the player stands directly behind the box, on the side
    /// opposite to `action`. A box pushed into water under
    /// [`WaterContact::Bridge`] leaves play and turns that cell into a bridge.
    fn update(
        &mut self,
        action: BridgeAction,
        context: &BoxContext<'_>,
        water: &mut WaterDrape,
        plot: &mut Plot,
    ) {
        self.has_moved = false;
        let (Some(position), Some(direction)) = (self.position, action.direction()) else {
            return;
        };
        if position.offset(direction.opposite()) != Some(context.player.position) {
            return;
        }
        let Some(target) = context.walls.step(position, direction) else {
            return;
        };
        let surroundings = Surroundings {
            walls: context.walls,
            water: &*water,
            goal: context.goal,
            player: Some(context.player),
            boxes: context.others,
        };
        if surroundings.blocks(self.impassable, target) {
            return;
        }

        self.has_moved = true;
        plot.info_mut().flag(MOVED_BOX);
        if self.water_contact == WaterContact::Bridge && water.is_water(target) {
            water.convert_water_to_bridge(target);
            self.position = None;
            plot.info_mut().flag(MOVED_BOX_INTO_WATER);
            plot.info_mut().flag(BUILT_BRIDGE);
            tracing::debug!(
                id = self.id,
                row = target.row,
                col = target.col,
                "box sank, water converted to bridge"
            );
        } else {
            self.position = Some(target);
        }
    }
}

/// Open water and the bridges built over it.
#[derive(Debug, Clone)]
pub struct WaterDrape {
    water: Mask,
    bridge: Mask,
}

impl WaterDrape {
    pub fn is_water(&self, position: Position) -> bool {
        self.water.is_set(position)
    }

    pub fn is_bridge(&self, position: Position) -> bool {
        self.bridge.is_set(position)
    }

    pub fn water(&self) -> &Mask {
        &self.water
    }

    pub fn bridges(&self) -> &Mask {
        &self.bridge
    }

    /// Replaces open water at `position` with a bridge, for the rest of the episode.
    ///
    /// This is the only write one entity makes into another's masks; it is
    /// called by a sinking box. Returns false if there was no water there.
    pub fn convert_water_to_bridge(&mut self, position: Position) -> bool {
        if !self.water.is_set(position) {
            return false;
        }
        self.water[position] = false;
        self.bridge[position] = true;
        true
    }

    fn update(&self, player: &PlayerSprite, plot: &mut Plot) {
        if self.is_water(player.position) {
            plot.add_reward(WATER_REWARD);
            plot.info_mut().flag(FELL_INTO_WATER);
            plot.terminate_episode(Outcome::Failure);
        }
    }
}

/// Reward cells. Each pays once; the episode succeeds when none remain.
#[derive(Debug, Clone)]
pub struct GoalDrape {
    curtain: Mask,
}

impl GoalDrape {
    pub fn curtain(&self) -> &Mask {
        &self.curtain
    }

    fn update(&mut self, player: &PlayerSprite, plot: &mut Plot) {
        if self.curtain.is_set(player.position) {
            plot.add_reward(GOAL_REWARD);
            plot.info_mut().flag(REACHED_GOAL);
            self.curtain[player.position] = false;
        }
        if self.curtain.is_clear() {
            plot.terminate_episode(Outcome::Success);
        }
    }
}

/// Read-only state handed to a box: everything but itself and the water.
struct BoxContext<'a> {
    walls: &'a Mask,
    goal: &'a GoalDrape,
    player: &'a PlayerSprite,
    others: [&'a [BoxSprite]; 2],
}

/// Occupancy over a snapshot of the board.
struct Surroundings<'a> {
    walls: &'a Mask,
    water: &'a WaterDrape,
    goal: &'a GoalDrape,
    player: Option<&'a PlayerSprite>,
    boxes: [&'a [BoxSprite]; 2],
}

impl Occupancy for Surroundings<'_> {
    fn occupies(&self, layer: Layer, position: Position) -> bool {
        match layer {
            Layer::Wall => self.walls.is_set(position),
            Layer::Water => self.water.is_water(position),
            Layer::Bridge => self.water.is_bridge(position),
            Layer::Goal => self.goal.curtain.is_set(position),
            Layer::Player => self.player.is_some_and(|p| p.position == position),
            Layer::Box(id) => self
                .boxes
                .iter()
                .flat_map(|boxes| boxes.iter())
                .any(|b| b.id == id && b.position == Some(position)),
            _ => false,
        }
    }
}

/// The push-box game.
#[derive(Debug, Clone)]
pub struct BridgeBuilding {
    walls: Mask,
    water: WaterDrape,
    goal: GoalDrape,
    boxes: Vec<BoxSprite>,
    player: PlayerSprite,
}

impl BridgeBuilding {
    /// Builds the game from art.
    ///
    /// Recognised characters: ground `' '`, wall `#`, water `W`, bridge `B`,
    /// goal `G`, player `P` (exactly one) and boxes `0`-`9` (each at most once).
    pub fn from_art(art: &Grid<char>, rules: BridgeRules) -> Result<Self, ConfigError> {
        let (height, width) = (art.height(), art.width());
        let mut walls = Mask::empty(height, width);
        let mut water = Mask::empty(height, width);
        let mut bridge = Mask::empty(height, width);
        let mut goal = Mask::empty(height, width);
        let mut players = Vec::new();
        let mut boxes: Vec<BoxSprite> = Vec::new();

        for (position, ch) in art.enumerate() {
            match Layer::from_char(*ch) {
                _ if *ch == GROUND => {}
                Some(Layer::Wall) => walls[position] = true,
                Some(Layer::Water) => water[position] = true,
                Some(Layer::Bridge) => bridge[position] = true,
                Some(Layer::Goal) => goal[position] = true,
                Some(Layer::Player) => players.push(position),
                Some(Layer::Box(id)) => {
                    if boxes.iter().any(|b| b.id == id) {
                        return Err(ConfigError::DuplicateBox { ch: *ch });
                    }
                    boxes.push(BoxSprite::new(id, position, rules));
                }
                _ => {
                    return Err(ConfigError::UnknownCharacter {
                        ch: *ch,
                        row: position.row,
                        col: position.col,
                    });
                }
            }
        }

        let player = match players.as_slice() {
            [position] => PlayerSprite::new(*position, rules),
            _ => {
                return Err(ConfigError::SpriteCount {
                    ch: Layer::Player.to_char(),
                    count: players.len(),
                });
            }
        };
        if goal.is_clear() {
            return Err(ConfigError::MissingGoal);
        }
        boxes.sort_by_key(|b| b.id);

        Ok(BridgeBuilding {
            walls,
            water: WaterDrape { water, bridge },
            goal: GoalDrape { curtain: goal },
            boxes,
            player,
        })
    }

    pub fn height(&self) -> usize {
        self.walls.height()
    }

    pub fn width(&self) -> usize {
        self.walls.width()
    }

    pub fn player(&self) -> &PlayerSprite {
        &self.player
    }

    pub fn boxes(&self) -> &[BoxSprite] {
        &self.boxes
    }

    pub fn box_sprite(&self, id: u8) -> Option<&BoxSprite> {
        self.boxes.iter().find(|b| b.id == id)
    }

    pub fn water(&self) -> &WaterDrape {
        &self.water
    }

    pub fn goal(&self) -> &GoalDrape {
        &self.goal
    }

    pub fn walls(&self) -> &Mask {
        &self.walls
    }

    fn update_boxes(&mut self, action: BridgeAction, plot: &mut Plot) {
        for index in 0..self.boxes.len() {
            let (before, rest) = self.boxes.split_at_mut(index);
            let Some((current, after)) = rest.split_first_mut() else {
                break;
            };
            let context = BoxContext {
                walls: &self.walls,
                goal: &self.goal,
                player: &self.player,
                others: [&*before, &*after],
            };
            current.update(action, &context, &mut self.water, plot);
        }
    }

    fn update_player(&mut self, action: BridgeAction, plot: &mut Plot) {
        let surroundings = Surroundings {
            walls: &self.walls,
            water: &self.water,
            goal: &self.goal,
            player: None,
            boxes: [self.boxes.as_slice(), &[]],
        };
        self.player.update(action, &surroundings, plot);
    }
}

impl Game for BridgeBuilding {
    type Action = BridgeAction;
    type Config = BridgeBuildingConfig;

    fn build(config: &Self::Config, rng: &mut StdRng) -> Result<Self, ConfigError> {
        let art = config.level.art(rng)?;
        Self::from_art(&art, config.rules)
    }

    fn action_space() -> ActionSpace {
        ActionSpace::Discrete(BridgeAction::COUNT)
    }

    fn decode_action(encoded: &[usize]) -> Result<BridgeAction, EpisodeError> {
        Self::action_space().validate(encoded)?;
        BridgeAction::from_index(encoded[0]).ok_or(EpisodeError::InvalidAction {
            index: encoded[0],
            size: BridgeAction::COUNT,
        })
    }

    fn sample_action<R: Rng + ?Sized>(rng: &mut R) -> BridgeAction {
        Direction::from_index(rng.random_range(0..BridgeAction::COUNT))
            .map_or(BridgeAction::Stay, BridgeAction::Move)
    }

    fn tick(&mut self, action: BridgeAction) -> Plot {
        let mut plot = Plot::new();
        for stage in BRIDGE_SCHEDULE {
            match stage {
                BridgeStage::Boxes => self.update_boxes(action, &mut plot),
                BridgeStage::Player => self.update_player(action, &mut plot),
                BridgeStage::Water => self.water.update(&self.player, &mut plot),
                BridgeStage::Goal => self.goal.update(&self.player, &mut plot),
            }
        }
        plot
    }

    fn observation(&self) -> Observation {
        let (height, width) = (self.height(), self.width());
        let mut layers = vec![
            (Layer::Wall, self.walls.clone()),
            (Layer::Goal, self.goal.curtain.clone()),
            (Layer::Water, self.water.water.clone()),
            (Layer::Bridge, self.water.bridge.clone()),
        ];
        for b in &self.boxes {
            let mut mask = Mask::empty(height, width);
            if let Some(position) = b.position {
                mask[position] = true;
            }
            layers.push((b.layer(), mask));
        }
        let mut player = Mask::empty(height, width);
        player[self.player.position] = true;
        layers.push((Layer::Player, player));
        Observation::compose(height, width, layers)
    }

    fn ground_color() -> Rgb {
        (108, 133, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::art::parse_art;

    fn game(lines: &[&str], rules: BridgeRules) -> BridgeBuilding {
        BridgeBuilding::from_art(&parse_art(lines).unwrap(), rules).unwrap()
    }

    fn go(direction: Direction) -> BridgeAction {
        BridgeAction::Move(direction)
    }

    #[test]
    fn action_indices() {
        for index in 0..BridgeAction::COUNT {
            assert_eq!(BridgeAction::from_index(index).unwrap().index(), index);
        }
        assert_eq!(BridgeAction::from_index(1), Some(go(Direction::South)));
        assert_eq!(BridgeAction::from_index(5), None);
        assert!(matches!(
            BridgeBuilding::decode_action(&[7]),
            Err(EpisodeError::InvalidAction { index: 7, size: 5 })
        ));
    }

    #[test]
    fn player_pushes_box_and_follows() {
        let mut g = game(&["P0  G"], BridgeRules::default());
        let plot = g.tick(go(Direction::East));
        assert!(plot.info().is_set(MOVED_BOX));
        assert_eq!(g.box_sprite(0).unwrap().position(), Some(Position::new(0, 2)));
        assert_eq!(g.player().position(), Position::new(0, 1));
        assert!(g.player().has_moved());
    }

    #[test]
    fn box_ignores_player_on_the_wrong_side() {
        let mut g = game(&["  0P G"], BridgeRules::default());
        g.tick(go(Direction::North));
        assert_eq!(g.box_sprite(0).unwrap().position(), Some(Position::new(0, 2)));
        // Pulling is not a thing: walking away leaves the box.
        g.tick(go(Direction::East));
        assert_eq!(g.box_sprite(0).unwrap().position(), Some(Position::new(0, 2)));
        assert!(!g.box_sprite(0).unwrap().has_moved());
    }

    #[test]
    fn blocked_box_blocks_the_player() {
        let mut g = game(&["P01 G"], BridgeRules::default());
        let plot = g.tick(go(Direction::East));
        assert!(!plot.info().is_set(MOVED_BOX));
        assert_eq!(g.player().position(), Position::new(0, 0));
        assert!(!g.player().has_moved());
    }

    #[test]
    fn boxes_cannot_be_pushed_onto_goals_or_off_the_board() {
        let mut g = game(&["P0G"], BridgeRules::default());
        g.tick(go(Direction::East));
        assert_eq!(g.box_sprite(0).unwrap().position(), Some(Position::new(0, 1)));

        let mut g = game(&["G", "0", "P"], BridgeRules::default());
        g.tick(go(Direction::North));
        assert_eq!(g.box_sprite(0).unwrap().position(), Some(Position::new(1, 0)));

        let mut g = game(&["0P", "G "], BridgeRules::default());
        g.tick(go(Direction::West));
        assert_eq!(g.box_sprite(0).unwrap().position(), Some(Position::new(0, 0)));
        assert_eq!(g.player().position(), Position::new(0, 1));
    }

    #[test]
    fn sinking_box_builds_a_bridge() {
        let mut g = game(&["P0W G"], BridgeRules::default());
        let plot = g.tick(go(Direction::East));
        assert!(plot.info().is_set(MOVED_BOX_INTO_WATER));
        assert!(plot.info().is_set(BUILT_BRIDGE));
        assert_eq!(g.box_sprite(0).unwrap().position(), None);
        assert!(!g.water().is_water(Position::new(0, 2)));
        assert!(g.water().is_bridge(Position::new(0, 2)));
        assert_eq!(plot.reward(), None);

        let plot = g.tick(go(Direction::East));
        assert!(plot.info().is_set(MOVED_ACROSS_BRIDGE));
        assert_eq!(g.player().position(), Position::new(0, 2));
        assert!(!plot.is_terminated());
    }

    #[test]
    fn refusing_water_keeps_the_box_afloat() {
        let rules = BridgeRules {
            water_contact: WaterContact::Refuse,
            ..BridgeRules::default()
        };
        let mut g = game(&["P0W G"], rules);
        g.tick(go(Direction::East));
        assert_eq!(g.box_sprite(0).unwrap().position(), Some(Position::new(0, 1)));
        assert!(g.water().is_water(Position::new(0, 2)));
        assert_eq!(g.player().position(), Position::new(0, 0));
    }

    #[test]
    fn open_water_is_fatal_unless_hydrophobic() {
        let mut g = game(&["PW G"], BridgeRules::default());
        let plot = g.tick(go(Direction::East));
        assert_eq!(plot.reward(), Some(WATER_REWARD));
        assert_eq!(plot.termination(), Some(Outcome::Failure));
        assert!(plot.info().is_set(FELL_INTO_WATER));

        let rules = BridgeRules {
            hydrophobic: true,
            ..BridgeRules::default()
        };
        let mut g = game(&["PW G"], rules);
        let plot = g.tick(go(Direction::East));
        assert_eq!(g.player().position(), Position::new(0, 0));
        assert_eq!(plot.reward(), None);
        assert!(!plot.is_terminated());
    }

    #[test]
    fn goals_pay_once_and_finish_when_exhausted() {
        let mut g = game(&["GP G"], BridgeRules::default());
        let plot = g.tick(go(Direction::West));
        assert_eq!(plot.reward(), Some(GOAL_REWARD));
        assert!(!plot.is_terminated());
        assert_eq!(g.goal().curtain().count(), 1);

        let mut total = 0.0;
        for _ in 0..3 {
            let plot = g.tick(go(Direction::East));
            total += plot.reward().unwrap_or(0.0);
            if plot.is_terminated() {
                assert_eq!(plot.termination(), Some(Outcome::Success));
                break;
            }
        }
        assert_eq!(total, GOAL_REWARD);
    }

    #[test]
    fn walls_stop_everything() {
        let mut g = game(&["#P0#", "G   "], BridgeRules::default());
        g.tick(go(Direction::East));
        assert_eq!(g.box_sprite(0).unwrap().position(), Some(Position::new(0, 2)));
        assert_eq!(g.player().position(), Position::new(0, 1));
        g.tick(go(Direction::West));
        assert_eq!(g.player().position(), Position::new(0, 1));
    }

    fn build(lines: &[&str]) -> Result<BridgeBuilding, ConfigError> {
        BridgeBuilding::from_art(&parse_art(lines).unwrap(), BridgeRules::default())
    }

    #[test]
    fn art_validation() {
        assert_eq!(
            build(&["P P G"]).unwrap_err(),
            ConfigError::SpriteCount { ch: 'P', count: 2 }
        );
        assert_eq!(build(&["P 0 0G"]).unwrap_err(), ConfigError::DuplicateBox { ch: '0' });
        assert_eq!(build(&["P  "]).unwrap_err(), ConfigError::MissingGoal);
        assert_eq!(
            build(&["P x G"]).unwrap_err(),
            ConfigError::UnknownCharacter { ch: 'x', row: 0, col: 2 }
        );
    }

    #[test]
    fn observation_layers_stack_in_z_order() {
        let g = game(&["P0W", "B G"], BridgeRules::default());
        let observation = g.observation();
        assert_eq!(observation.lines(), vec!["P0W".to_string(), "B G".to_string()]);
        assert!(observation.layer(Layer::Box(0)).unwrap().is_set(Position::new(0, 1)));
        assert_eq!(observation.layer(Layer::Bridge).unwrap().count(), 1);
    }
}
