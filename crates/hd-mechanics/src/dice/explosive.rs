//! A single die segment that heroic dice can raise, lower, or push into explosion.

use serde::{Deserialize, Serialize};

use super::{DiceRoller, HeroicDieResult};
use crate::error::{MechError, MechResult};

/// Upper bound on explosion rolls per die.
const MAX_EXPLOSIONS: usize = 100;

/// One active die result from the original roll.
///
/// A `3d6` term yields three of these. An exploded `1d6x` rolling `[6, 6, 2]`
/// yields three as well: the body and two tail segments with increasing
/// `chain_depth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplosiveDie {
    /// Position among the target dice.
    pub die_index: usize,
    /// Number of faces.
    pub faces: u32,
    /// Whether reaching `faces` triggers new explosion rolls.
    pub can_explode: bool,
    /// Pool alternative this die belongs to, if any.
    pub group_id: Option<usize>,
    /// Whether the pool kept this die's alternative in the original roll.
    pub group_kept: bool,
    /// 0 for a body die, n for the n-th segment of an explosion chain.
    pub chain_depth: usize,
    /// Original face values of the chain up to and including this segment.
    pub original_results: Vec<u32>,
    /// Current face value after heroic contributions.
    pub modified_value: u32,
    /// Heroic dice applied to this die, in allocation order.
    pub heroic_allocated: Vec<HeroicDieResult>,
    /// Explosion rolls triggered by heroic contributions.
    pub new_explosions: Vec<u32>,
    /// A tail segment soaked down to zero.
    pub removed: bool,
}

impl ExplosiveDie {
    /// Create a body die from its original chain of results.
    pub fn new(die_index: usize, faces: u32, original_results: Vec<u32>) -> MechResult<Self> {
        if faces == 0 {
            return Err(MechError::InvalidTerm(format!(
                "die {die_index} has 0 faces"
            )));
        }
        let base = *original_results.last().ok_or_else(|| {
            MechError::InvalidTerm(format!("die {die_index} has no results"))
        })?;
        Ok(Self {
            die_index,
            faces,
            can_explode: false,
            group_id: None,
            group_kept: true,
            chain_depth: 0,
            original_results,
            modified_value: base.min(faces),
            heroic_allocated: Vec::new(),
            new_explosions: Vec::new(),
            removed: false,
        })
    }

    /// Allow or forbid explosions. One-faced dice never explode.
    pub fn exploding(mut self, can_explode: bool) -> Self {
        self.can_explode = can_explode && self.faces > 1;
        self
    }

    /// Tag the die with a pool alternative.
    pub fn in_group(mut self, group_id: Option<usize>, kept: bool) -> Self {
        self.group_id = group_id;
        self.group_kept = kept;
        self
    }

    /// Set the depth of this segment in its explosion chain.
    pub fn with_chain_depth(mut self, depth: usize) -> Self {
        self.chain_depth = depth;
        self
    }

    /// The last face value of the original roll.
    pub fn base_value(&self) -> u32 {
        self.original_results.last().copied().unwrap_or(0)
    }

    /// Modified value plus any new explosions.
    pub fn total(&self) -> u32 {
        self.modified_value + self.new_explosions.iter().sum::<u32>()
    }

    /// Returns true for segments produced by an earlier explosion.
    pub fn is_tail(&self) -> bool {
        self.chain_depth > 0
    }

    /// Lowest value decrease mode may push this die to.
    pub fn floor(&self) -> u32 {
        if self.is_tail() { 0 } else { 1 }
    }

    /// Raise the die by the summed heroic values, capped at `faces`.
    ///
    /// Returns the amount actually applied.
    pub fn add_heroic(&mut self, results: &[HeroicDieResult]) -> u32 {
        let sum: u32 = results.iter().map(|r| r.result).sum();
        let applied = sum.min(self.faces.saturating_sub(self.modified_value));
        self.modified_value += applied;
        self.heroic_allocated.extend_from_slice(results);
        applied
    }

    /// Lower the die by `amount`, never below [`floor`](Self::floor).
    ///
    /// `amount` is what the allocator decided to apply, which can be less than
    /// the summed heroic values when a tail needed less than was rolled.
    /// Returns the amount actually applied.
    pub fn subtract_heroic(&mut self, results: &[HeroicDieResult], amount: u32) -> u32 {
        let applied = amount.min(self.modified_value.saturating_sub(self.floor()));
        self.modified_value -= applied;
        self.heroic_allocated.extend_from_slice(results);
        if self.is_tail() && self.modified_value == 0 {
            self.removed = true;
        }
        applied
    }

    /// Resolve explosions after heroic values have been applied.
    ///
    /// Re-invoking on a die that already exploded is a no-op.
    pub async fn apply_heroic<R: DiceRoller + ?Sized>(&mut self, roller: &mut R) -> MechResult<()> {
        if !self.can_explode {
            return Ok(());
        }
        if self.modified_value == self.faces && !self.new_explosions.is_empty() {
            return Ok(());
        }
        self.modified_value = self.modified_value.min(self.faces);
        if self.modified_value < self.faces {
            return Ok(());
        }

        while self.new_explosions.len() < MAX_EXPLOSIONS {
            let value = roller
                .roll(1, self.faces)
                .await?
                .first()
                .copied()
                .ok_or_else(|| MechError::Roller("roller returned no values".into()))?;
            self.new_explosions.push(value);
            if value < self.faces {
                break;
            }
        }
        tracing::trace!(
            die = self.die_index,
            explosions = ?self.new_explosions,
            "resolved explosion chain"
        );
        Ok(())
    }

    /// Original results, the modified value (if heroics applied), then new explosions.
    pub fn result_chain(&self) -> Vec<u32> {
        let mut chain = self.original_results.clone();
        if !self.heroic_allocated.is_empty() {
            chain.push(self.modified_value);
        }
        chain.extend_from_slice(&self.new_explosions);
        chain
    }
}

impl std::fmt::Display for ExplosiveDie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chain: Vec<String> = self.result_chain().iter().map(u32::to_string).collect();
        write!(f, "d{} [{}] = {}", self.faces, chain.join(" → "), self.total())
    }
}
