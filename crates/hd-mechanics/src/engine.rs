//! The full heroic dice pipeline: analyze, roll, allocate, explode, recombine.

use serde::{Deserialize, Serialize};

use crate::actor::ActorResourceHandle;
use crate::allocator::{Allocation, AllocationMode, HeroDiceAllocator};
use crate::config::EngineConfig;
use crate::dice::{DiceRoller, ExplosiveDie, HeroicDieResult};
use crate::error::{MechError, MechResult};
use crate::keep::{KeepRule, KeepScope};
use crate::roll::{Decomposition, Roll, RollAnalyzer};

/// What the player asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeroRequest {
    /// Heroic dice spent from the actor's pool.
    pub quantity: u32,
    /// Extra heroic dice rolled without being spent.
    pub bonus: u32,
    /// Which way to push the roll.
    pub mode: AllocationMode,
    /// Whether the roll being modified is a healing roll.
    pub healing: bool,
}

impl HeroRequest {
    /// Spend `quantity` heroic dice in the given mode.
    pub fn new(quantity: u32, mode: AllocationMode) -> Self {
        Self {
            quantity,
            mode,
            ..Self::default()
        }
    }

    /// Roll `bonus` extra dice on top of the spent ones.
    pub fn with_bonus(mut self, bonus: u32) -> Self {
        self.bonus = bonus;
        self
    }

    /// Flag the roll as healing.
    pub fn healing(mut self) -> Self {
        self.healing = true;
        self
    }
}

/// The final result handed to the rendering side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroRollOutcome {
    /// Final roll total.
    pub total: i64,
    /// Total of the roll before heroic dice.
    pub original_total: i64,
    /// Every target die after allocation and explosions.
    pub explosive_dice: Vec<ExplosiveDie>,
    /// Positions in `explosive_dice` of the kept dice.
    pub kept_dice: Vec<usize>,
    /// Signed factor applied to the kept dice.
    pub target_multiplier: i64,
    /// Sum of every non-target component.
    pub non_target_value: i64,
    /// `dice_total * target_multiplier`.
    pub target_group_total: i64,
    /// Sum of the kept dice.
    pub dice_total: i64,
    /// How the heroic dice were distributed.
    pub distribution: Allocation,
    /// The keep rule used for recombination.
    pub keep_rule: KeepRule,
}

impl HeroRollOutcome {
    fn pass_through(roll: &Roll, mode: AllocationMode) -> Self {
        let keep_rule = KeepRule::keep_all(0);
        let total = roll.total();
        Self {
            total,
            original_total: total,
            explosive_dice: Vec::new(),
            kept_dice: Vec::new(),
            target_multiplier: 1,
            non_target_value: total,
            target_group_total: 0,
            dice_total: 0,
            distribution: HeroDiceAllocator::allocate(&mut [], &[], &keep_rule, mode),
            keep_rule,
        }
    }

    /// The kept dice.
    pub fn kept(&self) -> impl Iterator<Item = &ExplosiveDie> {
        self.kept_dice.iter().map(|&pos| &self.explosive_dice[pos])
    }

    /// Returns true if heroic dice changed nothing because there were no target dice.
    pub fn is_pass_through(&self) -> bool {
        self.explosive_dice.is_empty()
    }
}

/// Runs heroic dice requests against evaluated rolls.
#[derive(Debug)]
pub struct HeroDiceEngine<R> {
    config: EngineConfig,
    roller: R,
}

impl<R: DiceRoller> HeroDiceEngine<R> {
    /// Create an engine with the given settings and dice roller.
    pub fn new(config: EngineConfig, roller: R) -> Self {
        Self { config, roller }
    }

    /// The engine's settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The engine's dice roller.
    pub fn roller(&self) -> &R {
        &self.roller
    }

    /// Apply a heroic dice request to `roll`, spending from `actor`.
    ///
    /// A roll without target dice passes through untouched: nothing is rolled
    /// or spent. Spent dice are deducted after allocation. If a later explosion
    /// roll fails, that deduction is not undone.
    pub async fn process<A: ActorResourceHandle + ?Sized>(
        &mut self,
        roll: &Roll,
        request: &HeroRequest,
        actor: &mut A,
    ) -> MechResult<HeroRollOutcome> {
        let decomposition = RollAnalyzer::decompose(roll)?;
        if decomposition.is_pass_through() {
            tracing::debug!(total = roll.total(), "no target dice, passing roll through");
            return Ok(HeroRollOutcome::pass_through(roll, request.mode));
        }

        let mode = if self.config.healing_house_rule && request.healing {
            AllocationMode::Increase
        } else {
            request.mode
        };

        let key = self.config.resource_key.as_str();
        let available = actor.hero_dice(key);
        if request.quantity > available {
            return Err(MechError::InsufficientHeroDice {
                requested: request.quantity,
                available,
            });
        }

        let mut dice = build_dice(&decomposition)?;

        let faces = self.config.hero_die_faces;
        let pool_size = request.quantity + request.bonus;
        let values = if pool_size > 0 {
            self.roller.roll(pool_size, faces).await?
        } else {
            Vec::new()
        };
        self.roller.display(faces, &values);
        let heroic = HeroicDieResult::from_values(&values);
        tracing::debug!(?values, faces, %mode, "rolled heroic pool");

        let mut distribution =
            HeroDiceAllocator::allocate(&mut dice, &heroic, &decomposition.keep_rule, mode);

        if request.quantity > 0 {
            actor.deduct_hero_dice(key, request.quantity).await?;
            tracing::debug!(spent = request.quantity, key, "deducted heroic dice");
        }

        for die in &mut dice {
            die.apply_heroic(&mut self.roller).await?;
        }

        let kept_dice = recombine(&dice, &decomposition.keep_rule);
        distribution.settle_used(&dice, &kept_dice);
        let dice_total: i64 = kept_dice
            .iter()
            .map(|&pos| i64::from(dice[pos].total()))
            .sum();
        let target_group_total = dice_total.saturating_mul(decomposition.target_multiplier);
        let total = target_group_total.saturating_add(decomposition.non_target_value);
        tracing::debug!(
            original = roll.total(),
            total,
            dice_total,
            multiplier = decomposition.target_multiplier,
            "heroic roll resolved"
        );

        Ok(HeroRollOutcome {
            total,
            original_total: roll.total(),
            explosive_dice: dice,
            kept_dice,
            target_multiplier: decomposition.target_multiplier,
            non_target_value: decomposition.non_target_value,
            target_group_total,
            dice_total,
            distribution,
            keep_rule: decomposition.keep_rule,
        })
    }
}

fn build_dice(decomposition: &Decomposition) -> MechResult<Vec<ExplosiveDie>> {
    decomposition
        .target_dice
        .iter()
        .enumerate()
        .map(|(idx, target)| {
            Ok(ExplosiveDie::new(idx, target.faces, target.chain.clone())?
                .exploding(decomposition.should_explode && !target.exploded)
                .in_group(target.group_id, target.group_kept)
                .with_chain_depth(target.chain_depth))
        })
        .collect()
}

/// Positions of the dice that count toward the final total, in die order.
///
/// Die scope keeps the best `count` dice. Group scope ranks groups by their
/// summed totals and keeps every die of the best `count` groups. Removed tails
/// never count.
pub fn recombine(dice: &[ExplosiveDie], rule: &KeepRule) -> Vec<usize> {
    let live: Vec<usize> = (0..dice.len()).filter(|&pos| !dice[pos].removed).collect();

    let mut kept: Vec<usize> = match rule.scope() {
        KeepScope::Die => {
            let totals: Vec<u32> = live.iter().map(|&pos| dice[pos].total()).collect();
            rule.select(&totals).into_iter().map(|idx| live[idx]).collect()
        }
        KeepScope::Group => {
            // (group id, member positions); ungrouped dice stand alone.
            let mut groups: Vec<(Option<usize>, Vec<usize>)> = Vec::new();
            for &pos in &live {
                let id = dice[pos].group_id;
                match groups.iter_mut().find(|(g, _)| id.is_some() && *g == id) {
                    Some((_, members)) => members.push(pos),
                    None => groups.push((id, vec![pos])),
                }
            }
            let sums: Vec<u32> = groups
                .iter()
                .map(|(_, members)| members.iter().map(|&pos| dice[pos].total()).sum())
                .collect();
            rule.select(&sums)
                .into_iter()
                .flat_map(|idx| groups[idx].1.iter().copied())
                .collect()
        }
    };
    kept.sort_unstable();
    kept
}
