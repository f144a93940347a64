//! Concrete dice rollers: seeded RNG and predetermined values.

use std::collections::VecDeque;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::DiceRoller;
use crate::error::{MechError, MechResult};

/// Rolls dice with a seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct RngRoller {
    rng: StdRng,
}

impl RngRoller {
    /// Create a roller from a fixed seed for reproducible rolls.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Wrap an existing RNG.
    pub fn from_rng(rng: StdRng) -> Self {
        Self { rng }
    }
}

#[async_trait]
impl DiceRoller for RngRoller {
    async fn roll(&mut self, count: u32, faces: u32) -> MechResult<Vec<u32>> {
        if faces == 0 {
            return Err(MechError::InvalidTerm("cannot roll a die with 0 faces".into()));
        }
        Ok((0..count)
            .map(|_| self.rng.random_range(1..=faces))
            .collect())
    }
}

/// Returns predetermined values in order. Fails once they run out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRoller {
    values: VecDeque<u32>,
    consumed: usize,
}

impl ScriptedRoller {
    /// Create a roller that will hand out `values` in order.
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: values.into_iter().collect(),
            consumed: 0,
        }
    }

    /// Values not yet handed out.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    /// Values handed out so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

#[async_trait]
impl DiceRoller for ScriptedRoller {
    async fn roll(&mut self, count: u32, _faces: u32) -> MechResult<Vec<u32>> {
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let value = self
                .values
                .pop_front()
                .ok_or(MechError::RollerExhausted(self.consumed))?;
            self.consumed += 1;
            out.push(value);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rng_rolls_within_faces() {
        let mut roller = RngRoller::seeded(42);
        let values = roller.roll(20, 6).await.unwrap();
        assert_eq!(values.len(), 20);
        assert!(values.iter().all(|v| (1..=6).contains(v)));
    }

    #[tokio::test]
    async fn rng_deterministic_with_seed() {
        let mut a = RngRoller::seeded(99);
        let mut b = RngRoller::seeded(99);
        assert_eq!(a.roll(5, 20).await.unwrap(), b.roll(5, 20).await.unwrap());
    }

    #[tokio::test]
    async fn rng_rejects_zero_faces() {
        let mut roller = RngRoller::seeded(1);
        assert!(matches!(
            roller.roll(1, 0).await,
            Err(MechError::InvalidTerm(_))
        ));
    }

    #[tokio::test]
    async fn scripted_hands_out_in_order() {
        let mut roller = ScriptedRoller::new([6, 6, 3]);
        assert_eq!(roller.roll(2, 6).await.unwrap(), vec![6, 6]);
        assert_eq!(roller.roll(1, 6).await.unwrap(), vec![3]);
        assert_eq!(roller.consumed(), 3);
        assert_eq!(roller.remaining(), 0);
    }

    #[tokio::test]
    async fn scripted_exhaustion_is_an_error() {
        let mut roller = ScriptedRoller::new([2]);
        assert!(matches!(
            roller.roll(2, 6).await,
            Err(MechError::RollerExhausted(1))
        ));
    }
}
