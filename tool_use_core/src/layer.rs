use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::Position;

/// An RGB display colour.
pub type Rgb = (u8, u8, u8);

/// Every class of thing that can occupy a cell, across all games.
///
/// Each layer has a single art character; boxes carry their digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    /// Numbered pushable box, `'0'..='9'`.
    Box(u8),
    Player,
    Wall,
    Water,
    Bridge,
    Goal,
    Agent,
    Tool,
    Food,
    Tube,
    FakeTube,
    Trap,
    Exit,
}

impl Layer {
    /// Number of distinct box ids.
    pub const BOX_COUNT: u8 = 10;

    pub fn from_char(ch: char) -> Option<Layer> {
        let layer = match ch {
            '0'..='9' => Layer::Box(ch as u8 - b'0'),
            'P' => Layer::Player,
            '#' => Layer::Wall,
            'W' => Layer::Water,
            'B' => Layer::Bridge,
            'G' => Layer::Goal,
            'a' => Layer::Agent,
            'p' => Layer::Tool,
            'f' => Layer::Food,
            'm' => Layer::Tube,
            'w' => Layer::FakeTube,
            'u' => Layer::Trap,
            'n' => Layer::Exit,
            _ => return None,
        };
        Some(layer)
    }

    pub fn to_char(self) -> char {
        match self {
            Layer::Box(id) => (b'0' + id % Self::BOX_COUNT) as char,
            Layer::Player => 'P',
            Layer::Wall => '#',
            Layer::Water => 'W',
            Layer::Bridge => 'B',
            Layer::Goal => 'G',
            Layer::Agent => 'a',
            Layer::Tool => 'p',
            Layer::Food => 'f',
            Layer::Tube => 'm',
            Layer::FakeTube => 'w',
            Layer::Trap => 'u',
            Layer::Exit => 'n',
        }
    }

    /// Display colour for renderers. Purely cosmetic.
    pub fn color(self) -> Rgb {
        match self {
            Layer::Box(_) => (221, 205, 90),
            Layer::Player => (38, 126, 218),
            Layer::Wall => (0, 255, 255),
            Layer::Water => (13, 179, 104),
            Layer::Bridge => (207, 27, 128),
            Layer::Goal => (13, 171, 162),
            Layer::Agent => (113, 57, 208),
            Layer::Tool => (152, 208, 57),
            Layer::Food => (208, 57, 77),
            Layer::Tube | Layer::FakeTube => (57, 152, 208),
            Layer::Trap => (208, 113, 57),
            Layer::Exit => (208, 189, 57),
        }
    }

    const fn bit(self) -> u32 {
        match self {
            Layer::Box(id) => 1 << (id % Self::BOX_COUNT),
            Layer::Player => 1 << 10,
            Layer::Wall => 1 << 11,
            Layer::Water => 1 << 12,
            Layer::Bridge => 1 << 13,
            Layer::Goal => 1 << 14,
            Layer::Agent => 1 << 15,
            Layer::Tool => 1 << 16,
            Layer::Food => 1 << 17,
            Layer::Tube => 1 << 18,
            Layer::FakeTube => 1 << 19,
            Layer::Trap => 1 << 20,
            Layer::Exit => 1 << 21,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.to_char())
    }
}

/// A set of layers, used as an entity's impassable set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerSet(u32);

const NON_BOX_LAYERS: [Layer; 12] = [
    Layer::Player,
    Layer::Wall,
    Layer::Water,
    Layer::Bridge,
    Layer::Goal,
    Layer::Agent,
    Layer::Tool,
    Layer::Food,
    Layer::Tube,
    Layer::FakeTube,
    Layer::Trap,
    Layer::Exit,
];

impl LayerSet {
    pub const EMPTY: LayerSet = LayerSet(0);
    /// All ten box ids.
    pub const BOXES: LayerSet = LayerSet((1 << Layer::BOX_COUNT) - 1);

    pub const fn single(layer: Layer) -> LayerSet {
        LayerSet(layer.bit())
    }

    pub const fn with(self, layer: Layer) -> LayerSet {
        LayerSet(self.0 | layer.bit())
    }

    pub const fn without(self, layer: Layer) -> LayerSet {
        LayerSet(self.0 & !layer.bit())
    }

    pub const fn union(self, other: LayerSet) -> LayerSet {
        LayerSet(self.0 | other.0)
    }

    pub const fn contains(self, layer: Layer) -> bool {
        self.0 & layer.bit() != 0
    }

    /// Members in a fixed order: boxes by id, then the remaining layers.
    pub fn iter(self) -> impl Iterator<Item = Layer> {
        (0..Layer::BOX_COUNT)
            .map(Layer::Box)
            .chain(NON_BOX_LAYERS)
            .filter(move |layer| self.contains(*layer))
    }
}

impl BitOr for LayerSet {
    type Output = LayerSet;

    fn bitor(self, rhs: LayerSet) -> LayerSet {
        self.union(rhs)
    }
}

impl FromIterator<Layer> for LayerSet {
    fn from_iter<I: IntoIterator<Item = Layer>>(iter: I) -> Self {
        iter.into_iter().fold(LayerSet::EMPTY, LayerSet::with)
    }
}

/// Read access to "is there a `layer` at this cell" for move gating.
///
/// Implemented by the read-only views each entity receives during its update.
pub trait Occupancy {
    fn occupies(&self, layer: Layer, position: Position) -> bool;

    /// True if any member of `impassable` occupies `position`.
    fn blocks(&self, impassable: LayerSet, position: Position) -> bool {
        impassable
            .iter()
            .any(|layer| self.occupies(layer, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_layer_round_trips_through_its_character() {
        let all: Vec<Layer> = (0..Layer::BOX_COUNT)
            .map(Layer::Box)
            .chain(NON_BOX_LAYERS)
            .collect();
        for layer in all {
            assert_eq!(Layer::from_char(layer.to_char()), Some(layer));
        }
        assert_eq!(Layer::from_char(' '), None);
        assert_eq!(Layer::from_char('x'), None);
    }

    #[test]
    fn box_sets_exclude_a_single_id() {
        let others = LayerSet::BOXES.without(Layer::Box(3));
        assert!(!others.contains(Layer::Box(3)));
        assert!(others.contains(Layer::Box(0)));
        assert!(others.contains(Layer::Box(9)));
        assert!(!others.contains(Layer::Wall));
        assert_eq!(others.iter().count(), 9);
    }

    #[test]
    fn sets_collect_and_iterate_in_order() {
        let set: LayerSet = [Layer::Trap, Layer::Wall, Layer::Box(2)].into_iter().collect();
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Layer::Box(2), Layer::Wall, Layer::Trap]
        );
        assert_eq!(set | LayerSet::single(Layer::Exit), set.with(Layer::Exit));
        assert_eq!(LayerSet::EMPTY.iter().count(), 0);
    }
}
