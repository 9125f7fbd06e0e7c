use std::collections::BTreeMap;
use std::fmt;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    art::GROUND,
    layer::{Layer, Rgb},
    map::{Grid, GridError, Mask},
    plot::{Info, Outcome, Plot},
};

/// Errors raised while building a game. Construction fails fast; nothing is clamped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Art is empty")]
    EmptyArt,
    #[error("Art row {row} has width {found}, expected {expected}")]
    RaggedArt {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown art character '{ch}' at ({row}, {col})")]
    UnknownCharacter { ch: char, row: usize, col: usize },
    #[error("Art must contain exactly one '{ch}', found {count}")]
    SpriteCount { ch: char, count: usize },
    #[error("Box '{ch}' appears more than once in the art")]
    DuplicateBox { ch: char },
    #[error("Art contains no goal")]
    MissingGoal,
    #[error("Tool size must be at least 1, got {0}")]
    ToolSize(usize),
    #[error("Tool of size {size} at ({row}, {col}) does not fit on a {height}x{width} board")]
    ToolOutOfBounds {
        row: usize,
        col: usize,
        size: usize,
        height: usize,
        width: usize,
    },
    #[error("{what} position ({row}, {col}) is off the board")]
    OutOfBounds {
        what: &'static str,
        row: usize,
        col: usize,
    },
    #[error("{what} overlaps another object at ({row}, {col})")]
    Overlap {
        what: &'static str,
        row: usize,
        col: usize,
    },
    #[error("num_boxes must be between 1 and 3, got {0}")]
    BoxCount(usize),
    #[error("No room left on the board to place {0}")]
    NoRoom(&'static str),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Errors raised by [`Episode::step`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EpisodeError {
    #[error("Episode has not been reset")]
    NotReset,
    #[error("Episode already finished ({0:?}); call reset")]
    Finished(EpisodeState),
    #[error("Action index {index} is outside 0..{size}")]
    InvalidAction { index: usize, size: usize },
    #[error("Action has {found} components, expected {expected}")]
    ActionArity { expected: usize, found: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Shape of a game's action space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSpace {
    Discrete(usize),
    MultiDiscrete(Vec<usize>),
}

impl ActionSpace {
    /// Size of each component.
    pub fn sizes(&self) -> Vec<usize> {
        match self {
            ActionSpace::Discrete(n) => vec![*n],
            ActionSpace::MultiDiscrete(sizes) => sizes.clone(),
        }
    }

    /// Checks an encoded action against the space.
    pub fn validate(&self, encoded: &[usize]) -> Result<(), EpisodeError> {
        let sizes = self.sizes();
        if encoded.len() != sizes.len() {
            return Err(EpisodeError::ActionArity {
                expected: sizes.len(),
                found: encoded.len(),
            });
        }
        for (index, size) in encoded.iter().zip(sizes) {
            if *index >= size {
                return Err(EpisodeError::InvalidAction {
                    index: *index,
                    size,
                });
            }
        }
        Ok(())
    }
}

/// The merged board plus one occupancy mask per layer present in the game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub board: Grid<char>,
    pub layers: BTreeMap<Layer, Mask>,
}

impl Observation {
    /// Paints `layers` onto a ground board, lowest z first.
    pub fn compose(height: usize, width: usize, layers: Vec<(Layer, Mask)>) -> Observation {
        let mut board = Grid::filled(height, width, GROUND);
        for (layer, mask) in &layers {
            for position in mask.positions() {
                board[position] = layer.to_char();
            }
        }
        Observation {
            board,
            layers: layers.into_iter().collect(),
        }
    }

    pub fn layer(&self, layer: Layer) -> Option<&Mask> {
        self.layers.get(&layer)
    }

    /// The board as art lines.
    pub fn lines(&self) -> Vec<String> {
        crate::art::to_lines(&self.board)
    }
}

/// A grid game driven one tick at a time.
///
/// Implementations own every entity and run their fixed update schedule in
/// [`Game::tick`]. Illegal moves never fail: they resolve to "stay".
pub trait Game: Sized {
    type Action: Copy + fmt::Debug;
    /// Deserializable so front ends can load it from a file.
    type Config: Clone + fmt::Debug + Default + DeserializeOwned;

    /// Builds a fresh game. Generated levels draw from `rng`.
    fn build(config: &Self::Config, rng: &mut StdRng) -> Result<Self, ConfigError>;

    fn action_space() -> ActionSpace;

    /// Decodes integer action components, rejecting anything outside the space.
    fn decode_action(encoded: &[usize]) -> Result<Self::Action, EpisodeError>;

    fn sample_action<R: Rng + ?Sized>(rng: &mut R) -> Self::Action;

    /// Runs one full scheduling pass.
    fn tick(&mut self, action: Self::Action) -> Plot;

    fn observation(&self) -> Observation;

    /// Display colour of empty ground.
    fn ground_color() -> Rgb;
}

/// Lifecycle of an [`Episode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeState {
    Running,
    Terminated(Outcome),
    /// The step ceiling was reached first.
    Truncated,
}

/// Outcome of one [`Episode::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

/// Reset/step wrapper around a [`Game`]: seeding, step ceiling, reward totals.
pub struct Episode<G: Game> {
    config: G::Config,
    max_steps: Option<u32>,
    default_reward: f64,
    rng: StdRng,
    game: Option<G>,
    state: EpisodeState,
    steps: u32,
    total_reward: f64,
}

impl<G: Game> Episode<G> {
    pub fn new(config: G::Config, seed: u64) -> Self {
        Episode {
            config,
            max_steps: None,
            default_reward: 0.0,
            rng: StdRng::seed_from_u64(seed),
            game: None,
            state: EpisodeState::Running,
            steps: 0,
            total_reward: 0.0,
        }
    }

    /// Truncates the episode after `max_steps` ticks.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Reward reported for ticks in which nothing emitted one.
    pub fn with_default_reward(mut self, default_reward: f64) -> Self {
        self.default_reward = default_reward;
        self
    }

    /// Reseeds and starts a new game.
    pub fn reset_with_seed(&mut self, seed: u64) -> Result<Observation, ConfigError> {
        self.rng = StdRng::seed_from_u64(seed);
        self.reset()
    }

    /// Starts a new game, continuing the current random stream.
    pub fn reset(&mut self) -> Result<Observation, ConfigError> {
        let game = G::build(&self.config, &mut self.rng)?;
        let observation = game.observation();
        tracing::info!(
            height = observation.board.height(),
            width = observation.board.width(),
            "episode reset"
        );
        self.game = Some(game);
        self.state = EpisodeState::Running;
        self.steps = 0;
        self.total_reward = 0.0;
        Ok(observation)
    }

    /// Runs exactly one tick.
    pub fn step(&mut self, action: G::Action) -> Result<StepResult, EpisodeError> {
        let game = self.game.as_mut().ok_or(EpisodeError::NotReset)?;
        if self.state != EpisodeState::Running {
            return Err(EpisodeError::Finished(self.state));
        }

        let plot = game.tick(action);
        self.steps += 1;
        let reward = plot.reward().unwrap_or(self.default_reward);
        self.total_reward += reward;
        tracing::trace!(step = self.steps, ?action, reward, "tick");

        let terminated = plot.termination();
        let truncated =
            terminated.is_none() && self.max_steps.is_some_and(|max| self.steps >= max);
        if let Some(outcome) = terminated {
            tracing::debug!(?outcome, steps = self.steps, total = self.total_reward, "episode terminated");
            self.state = EpisodeState::Terminated(outcome);
        } else if truncated {
            tracing::debug!(steps = self.steps, total = self.total_reward, "episode truncated");
            self.state = EpisodeState::Truncated;
        }

        Ok(StepResult {
            observation: game.observation(),
            reward,
            terminated: terminated.is_some(),
            truncated,
            info: plot.into_info(),
        })
    }

    /// Decodes integer components and steps.
    pub fn step_encoded(&mut self, encoded: &[usize]) -> Result<StepResult, EpisodeError> {
        let action = G::decode_action(encoded)?;
        self.step(action)
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    /// True once terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.state != EpisodeState::Running
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    pub fn game(&self) -> Option<&G> {
        self.game.as_ref()
    }

    pub fn observation(&self) -> Option<Observation> {
        self.game.as_ref().map(G::observation)
    }

    pub fn config(&self) -> &G::Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_space_validation() {
        let space = ActionSpace::MultiDiscrete(vec![3, 4]);
        assert!(space.validate(&[2, 3]).is_ok());
        assert_eq!(
            space.validate(&[3, 0]),
            Err(EpisodeError::InvalidAction { index: 3, size: 3 })
        );
        assert_eq!(
            space.validate(&[1]),
            Err(EpisodeError::ActionArity {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            ActionSpace::Discrete(5).validate(&[5]),
            Err(EpisodeError::InvalidAction { index: 5, size: 5 })
        );
    }

    #[test]
    fn compose_paints_higher_layers_on_top() {
        let mut low = Mask::empty(1, 3);
        low[crate::Position::new(0, 0)] = true;
        low[crate::Position::new(0, 1)] = true;
        let mut high = Mask::empty(1, 3);
        high[crate::Position::new(0, 1)] = true;
        let observation = Observation::compose(1, 3, vec![(Layer::Water, low), (Layer::Player, high)]);
        assert_eq!(observation.lines(), vec!["WP ".to_string()]);
        assert_eq!(observation.layers.len(), 2);
    }
}
