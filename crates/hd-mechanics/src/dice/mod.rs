//! Dice rolling collaborators and exploding die segments.
//!
//! The engine never draws random numbers itself. Every roll goes through a
//! [`DiceRoller`], so hosts can plug in their own RNG (or a 3D dice display)
//! and tests can feed predetermined values via [`ScriptedRoller`].

pub mod explosive;
pub mod roller;

pub use explosive::ExplosiveDie;
pub use roller::{RngRoller, ScriptedRoller};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MechResult;

/// Rolls dice on behalf of the engine.
#[async_trait]
pub trait DiceRoller: Send {
    /// Roll `count` dice with `faces` sides each, returning their face values in order.
    async fn roll(&mut self, count: u32, faces: u32) -> MechResult<Vec<u32>>;

    /// Show rolled values to players (e.g. 3D dice). Fire-and-forget.
    fn display(&self, _faces: u32, _values: &[u32]) {}
}

/// One rolled heroic die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeroicDieResult {
    /// Face value rolled.
    pub result: u32,
    /// Position in the rolled heroic pool.
    pub index: usize,
}

impl HeroicDieResult {
    /// Number the given face values by their position in the pool.
    pub fn from_values(values: &[u32]) -> Vec<Self> {
        values
            .iter()
            .enumerate()
            .map(|(index, &result)| Self { result, index })
            .collect()
    }
}

impl std::fmt::Display for HeroicDieResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.result, self.index)
    }
}
