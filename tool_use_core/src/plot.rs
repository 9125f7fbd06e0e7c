//! Per-tick reward, termination and side-channel info.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Position;

/// How a terminated episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure,
}

/// A single info entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InfoValue {
    Flag(bool),
    Position(Position),
    Positions(Vec<Position>),
}

impl From<bool> for InfoValue {
    fn from(v: bool) -> Self {
        InfoValue::Flag(v)
    }
}

impl From<Position> for InfoValue {
    fn from(v: Position) -> Self {
        InfoValue::Position(v)
    }
}

impl From<Vec<Position>> for InfoValue {
    fn from(v: Vec<Position>) -> Self {
        InfoValue::Positions(v)
    }
}

/// String-keyed debug signals emitted during a tick (`moved_box`, `reached_food`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info(BTreeMap<String, InfoValue>);

impl Info {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<InfoValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raises a boolean flag.
    pub fn flag(&mut self, key: impl Into<String>) {
        self.insert(key, true);
    }

    /// True if `key` was raised as a flag this tick.
    pub fn is_set(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(InfoValue::Flag(true)))
    }

    pub fn get(&self, key: &str) -> Option<&InfoValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InfoValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Accumulates what one tick produced. A fresh plot is created for every tick.
#[derive(Debug, Clone, Default)]
pub struct Plot {
    reward: Option<f64>,
    termination: Option<Outcome>,
    info: Info,
}

impl Plot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds to this tick's reward.
    pub fn add_reward(&mut self, reward: f64) {
        *self.reward.get_or_insert(0.0) += reward;
    }

    /// Ends the episode. The first termination recorded in a tick wins.
    pub fn terminate_episode(&mut self, outcome: Outcome) {
        if self.termination.is_none() {
            self.termination = Some(outcome);
        }
    }

    /// Reward emitted this tick, `None` if nothing was emitted.
    pub fn reward(&self) -> Option<f64> {
        self.reward
    }

    pub fn termination(&self) -> Option<Outcome> {
        self.termination
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut Info {
        &mut self.info
    }

    pub fn into_info(self) -> Info {
        self.info
    }
}
