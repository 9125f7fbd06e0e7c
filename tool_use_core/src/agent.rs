use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, VecDeque},
    marker::PhantomData,
};

use rand::{SeedableRng, rngs::StdRng};

use crate::{
    Direction, Position,
    art::{self, GROUND},
    bridge_building::BridgeAction,
    environment::{Game, Observation},
    layer::Layer,
    map::Grid,
};

/// Trait defining the behavior of an agent.
/// Agents pick the next action from the current observation.
pub trait Agent<A> {
    /// `&mut self` lets the agent keep internal state (a script, an RNG, a plan).
    fn act(&mut self, observation: &Observation) -> A;

    /// True once the agent has nothing more to contribute.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Samples uniformly from a game's action space.
#[derive(Debug)]
pub struct RandomAgent<G> {
    rng: StdRng,
    game: PhantomData<fn() -> G>,
}

impl<G: Game> RandomAgent<G> {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            game: PhantomData,
        }
    }
}

impl<G: Game> Agent<G::Action> for RandomAgent<G> {
    fn act(&mut self, _observation: &Observation) -> G::Action {
        G::sample_action(&mut self.rng)
    }
}

/// Replays a fixed list of actions, then repeats `idle` forever.
#[derive(Debug, Clone)]
pub struct ScriptedAgent<A> {
    script: VecDeque<A>,
    idle: A,
}

impl<A: Copy> ScriptedAgent<A> {
    pub fn new(script: impl IntoIterator<Item = A>, idle: A) -> Self {
        Self {
            script: script.into_iter().collect(),
            idle,
        }
    }

    /// Actions left before the agent falls back to `idle`.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl<A: Copy> Agent<A> for ScriptedAgent<A> {
    fn act(&mut self, _observation: &Observation) -> A {
        self.script.pop_front().unwrap_or(self.idle)
    }

    fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

/// Walks the player towards the nearest reachable goal in the push-box games.
///
/// Plans over the observed board each tick, treating ground, goals and bridges
/// as walkable. It never pushes boxes on purpose, so it only solves boards
/// whose goal is already reachable; otherwise it stays put.
#[derive(Debug, Default)]
pub struct PlanningAgent;

impl PlanningAgent {
    pub fn new() -> Self {
        Self
    }

    fn walkable(ch: char) -> bool {
        ch == GROUND || ch == Layer::Goal.to_char() || ch == Layer::Bridge.to_char()
    }

    /// Plans to the nearest target from a list of positions
    fn plan_to_nearest_target(
        board: &Grid<char>,
        start: Position,
        targets: &[Position],
    ) -> Option<Vec<Position>> {
        targets
            .iter()
            .filter_map(|target| shortest_path(board, start, *target, Self::walkable))
            .min_by_key(Vec::len)
    }
}

impl Agent<BridgeAction> for PlanningAgent {
    fn act(&mut self, observation: &Observation) -> BridgeAction {
        let board = &observation.board;
        let Some(player) = art::find(board, Layer::Player.to_char()).first().copied() else {
            return BridgeAction::Stay;
        };
        let goals = art::find(board, Layer::Goal.to_char());
        Self::plan_to_nearest_target(board, player, &goals)
            .and_then(|plan| plan.get(1).copied())
            .and_then(|next| direction_between(player, next))
            .map_or(BridgeAction::Stay, BridgeAction::Move)
    }
}

/// The direction that takes `from` to the adjacent cell `to`.
pub fn direction_between(from: Position, to: Position) -> Option<Direction> {
    Direction::ALL
        .into_iter()
        .find(|direction| from.offset(*direction) == Some(to))
}

/// Returns manhattan distance between two positions
fn manhattan_distance(a: Position, b: Position) -> usize {
    a.row.abs_diff(b.row) + a.col.abs_diff(b.col)
}

/// A* search over art, four-neighbour moves.
///
/// `start` is always allowed; every other cell on the path, `goal` included,
/// must satisfy `passable`. Returns the path from `start` to `goal` inclusive.
pub fn shortest_path(
    art: &Grid<char>,
    start: Position,
    goal: Position,
    passable: impl Fn(char) -> bool,
) -> Option<Vec<Position>> {
    // For priority queue
    #[derive(Clone, Eq, PartialEq)]
    struct PrioritizedItem {
        priority: usize,
        position: Position,
    }

    impl Ord for PrioritizedItem {
        fn cmp(&self, other: &Self) -> Ordering {
            // Reverse ordering for min-heap behavior; ties broken by position
            // so the search is deterministic.
            other
                .priority
                .cmp(&self.priority)
                .then_with(|| other.position.cmp(&self.position))
        }
    }

    impl PartialOrd for PrioritizedItem {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    if !art.contains(start) || !art.contains(goal) {
        return None;
    }

    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut cost_so_far: HashMap<Position, usize> = HashMap::new();

    frontier.push(PrioritizedItem {
        priority: 0,
        position: start,
    });
    cost_so_far.insert(start, 0);

    let mut goal_reached = false;

    while let Some(PrioritizedItem {
        position: current, ..
    }) = frontier.pop()
    {
        if current == goal {
            goal_reached = true;
            break;
        }

        let current_cost = cost_so_far.get(&current).copied().unwrap_or(usize::MAX);
        for direction in Direction::ALL {
            let Some(neighbor) = art.step(current, direction) else {
                continue;
            };
            if !art.get(neighbor).is_some_and(|ch| passable(*ch)) {
                continue;
            }
            let new_cost = current_cost + 1;
            if cost_so_far.get(&neighbor).is_none_or(|cost| new_cost < *cost) {
                cost_so_far.insert(neighbor, new_cost);
                frontier.push(PrioritizedItem {
                    priority: new_cost + manhattan_distance(neighbor, goal),
                    position: neighbor,
                });
                came_from.insert(neighbor, current);
            }
        }
    }

    if !goal_reached {
        return None;
    }

    // Reconstruct path
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = *came_from.get(&current)?;
        path.push(current);
    }
    path.reverse();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        art::parse_art,
        bridge_building::{BridgeBuilding, BridgeRules},
    };

    #[test]
    fn path_goes_around_walls() {
        let art = parse_art(&["P #  ", "  # G", "     "]).unwrap();
        let path = shortest_path(&art, Position::new(0, 0), Position::new(1, 4), |ch| ch != '#').unwrap();
        assert_eq!(path.first(), Some(&Position::new(0, 0)));
        assert_eq!(path.last(), Some(&Position::new(1, 4)));
        assert_eq!(path.len(), 8);
        for pair in path.windows(2) {
            assert_eq!(manhattan_distance(pair[0], pair[1]), 1);
            assert_ne!(art[pair[1]], '#');
        }
    }

    #[test]
    fn unreachable_goal_has_no_path() {
        let art = parse_art(&["P#G"]).unwrap();
        assert_eq!(shortest_path(&art, Position::new(0, 0), Position::new(0, 2), |ch| ch != '#'), None);
    }

    #[test]
    fn scripted_agent_falls_back_to_idle() {
        let board = BridgeBuilding::from_art(&parse_art(&["PG"]).unwrap(), BridgeRules::default()).unwrap();
        let observation = board.observation();
        let mut agent = ScriptedAgent::new([BridgeAction::Move(Direction::East)], BridgeAction::Stay);
        assert_eq!(agent.remaining(), 1);
        assert!(!agent.is_exhausted());
        assert_eq!(agent.act(&observation), BridgeAction::Move(Direction::East));
        assert!(agent.is_exhausted());
        assert_eq!(agent.act(&observation), BridgeAction::Stay);
        assert_eq!(agent.remaining(), 0);
    }

    #[test]
    fn random_agent_is_seeded() {
        let board = BridgeBuilding::from_art(&parse_art(&["PG"]).unwrap(), BridgeRules::default()).unwrap();
        let observation = board.observation();
        let mut a = RandomAgent::<BridgeBuilding>::new(3);
        let mut b = RandomAgent::<BridgeBuilding>::new(3);
        let xs: Vec<_> = (0..20).map(|_| a.act(&observation)).collect();
        let ys: Vec<_> = (0..20).map(|_| b.act(&observation)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn planner_heads_for_the_goal_and_avoids_water() {
        let mut game = BridgeBuilding::from_art(
            &parse_art(&["P W ", "  W ", "   G"]).unwrap(),
            BridgeRules::default(),
        )
        .unwrap();
        let mut agent = PlanningAgent::new();
        let mut total = 0.0;
        for _ in 0..10 {
            let action = agent.act(&game.observation());
            let plot = game.tick(action);
            total += plot.reward().unwrap_or(0.0);
            if plot.is_terminated() {
                break;
            }
        }
        assert_eq!(total, 1.0);
    }
}
