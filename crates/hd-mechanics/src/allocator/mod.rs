//! Heroic dice allocation.
//!
//! Given the target dice of a roll, the rolled heroic values and the keep rule,
//! decide which heroic values go onto which die:
//! - **Increase** pushes kept dice up, preferring exact fits that reach the
//!   die's cap so it explodes.
//! - **Decrease** soaks the kept result, zeroing explosion tails first and
//!   then grinding body dice down to a floor of 1.
//!
//! All searching happens on a shadow copy. The real [`ExplosiveDie`] values
//! change only when the chosen allocation is committed.

mod decrease;
mod increase;
mod search;
mod shadow;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dice::{ExplosiveDie, HeroicDieResult};
use crate::keep::KeepRule;

use shadow::Shadow;

/// Which way heroic dice push the roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Raise the kept result.
    #[default]
    Increase,
    /// Lower the kept result.
    Decrease,
}

impl AllocationMode {
    /// Parse a mode from `increase` or `decrease`.
    pub fn from_str_tag(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "increase" | "inc" | "+" => Some(Self::Increase),
            "decrease" | "dec" | "-" => Some(Self::Decrease),
            _ => None,
        }
    }
}

impl std::fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increase => write!(f, "increase"),
            Self::Decrease => write!(f, "decrease"),
        }
    }
}

/// The outcome of one allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Mode the allocation ran in.
    pub mode: AllocationMode,
    /// Die index → heroic dice applied to it, in allocation order.
    pub distribution: BTreeMap<usize, Vec<HeroicDieResult>>,
    /// Dice whose modified value sits at their faces.
    pub explosion_count: usize,
    /// Indices of the heroic dice attached to kept dice.
    ///
    /// The allocator fills this from its own ranking. Once explosions are
    /// resolved the engine settles it against the final kept set with
    /// [`Allocation::settle_used`].
    pub used_hero_indexes: Vec<usize>,
    /// The heroic pool as rolled.
    pub heroic_results: Vec<HeroicDieResult>,
    /// The keep rule the allocation honored.
    pub keep_rule: KeepRule,
}

impl Allocation {
    fn empty(heroic_results: &[HeroicDieResult], keep_rule: KeepRule, mode: AllocationMode) -> Self {
        Self {
            mode,
            distribution: BTreeMap::new(),
            explosion_count: 0,
            used_hero_indexes: Vec::new(),
            heroic_results: heroic_results.to_vec(),
            keep_rule,
        }
    }

    /// Number of heroic dice attached to some die.
    pub fn allocated_count(&self) -> usize {
        self.distribution.values().map(Vec::len).sum()
    }

    /// Recompute `used_hero_indexes` from the heroic dice on the kept positions of `dice`.
    pub fn settle_used(&mut self, dice: &[ExplosiveDie], kept: &[usize]) {
        let mut used: Vec<usize> = kept
            .iter()
            .flat_map(|&pos| dice[pos].heroic_allocated.iter().map(|h| h.index))
            .collect();
        used.sort_unstable();
        self.used_hero_indexes = used;
    }

    /// Indices of heroic dice that did not count toward the result.
    pub fn unused_hero_indexes(&self) -> Vec<usize> {
        self.heroic_results
            .iter()
            .map(|h| h.index)
            .filter(|idx| !self.used_hero_indexes.contains(idx))
            .collect()
    }
}

/// Distributes heroic dice across exploding dice.
pub struct HeroDiceAllocator;

impl HeroDiceAllocator {
    /// Allocate `heroic` onto `dice` and commit the result to the dice.
    ///
    /// Empty dice or an empty heroic pool yields an empty allocation.
    pub fn allocate(
        dice: &mut [ExplosiveDie],
        heroic: &[HeroicDieResult],
        keep_rule: &KeepRule,
        mode: AllocationMode,
    ) -> Allocation {
        if dice.is_empty() || heroic.is_empty() {
            return Allocation::empty(heroic, *keep_rule, mode);
        }

        let mut shadow = Shadow::new(dice, *keep_rule, mode);
        let unallocated = match mode {
            AllocationMode::Increase => increase::allocate(&mut shadow, heroic),
            AllocationMode::Decrease => decrease::allocate(&mut shadow, heroic),
        };
        if !unallocated.is_empty() {
            tracing::debug!(count = unallocated.len(), %mode, "heroic dice left unallocated");
        }

        let used_hero_indexes = used_indexes(&shadow);
        let mut distribution = BTreeMap::new();
        for (die, staged) in dice.iter_mut().zip(&shadow.dice) {
            if staged.heroes.is_empty() {
                continue;
            }
            match mode {
                AllocationMode::Increase => die.add_heroic(&staged.heroes),
                AllocationMode::Decrease => die.subtract_heroic(&staged.heroes, staged.applied),
            };
            distribution.insert(die.die_index, staged.heroes.clone());
        }

        let explosion_count = dice
            .iter()
            .filter(|d| !d.removed && d.modified_value == d.faces)
            .count();

        let allocation = Allocation {
            mode,
            distribution,
            explosion_count,
            used_hero_indexes,
            heroic_results: heroic.to_vec(),
            keep_rule: *keep_rule,
        };
        tracing::debug!(
            %mode,
            keep = %keep_rule,
            allocated = allocation.allocated_count(),
            used = ?allocation.used_hero_indexes,
            explosions = explosion_count,
            "allocated heroic dice"
        );
        allocation
    }
}

/// Heroic dice on dice the shadow ranking keeps. In increase mode the ranking
/// counts expected explosions, so this is provisional until they are rolled.
fn used_indexes(shadow: &Shadow) -> Vec<usize> {
    let kept = shadow.kept_keys();
    let mut used: Vec<usize> = shadow
        .dice
        .iter()
        .enumerate()
        .filter(|&(pos, _)| shadow.is_kept(&kept, pos))
        .flat_map(|(_, die)| die.heroes.iter().map(|h| h.index))
        .collect();
    used.sort_unstable();
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keep::{KeepKind, KeepScope};

    fn heroes(values: &[u32]) -> Vec<HeroicDieResult> {
        HeroicDieResult::from_values(values)
    }

    fn d6(index: usize, value: u32) -> ExplosiveDie {
        ExplosiveDie::new(index, 6, vec![value]).unwrap().exploding(true)
    }

    fn kh(count: usize) -> KeepRule {
        KeepRule::new(KeepKind::KeepHighest, count, KeepScope::Die)
    }

    fn kl(count: usize) -> KeepRule {
        KeepRule::new(KeepKind::KeepLowest, count, KeepScope::Die)
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(AllocationMode::from_str_tag("Increase"), Some(AllocationMode::Increase));
        assert_eq!(AllocationMode::from_str_tag("dec"), Some(AllocationMode::Decrease));
        assert_eq!(AllocationMode::from_str_tag("sideways"), None);
        assert_eq!(AllocationMode::Decrease.to_string(), "decrease");
    }

    #[test]
    fn empty_inputs_yield_empty_allocation() {
        let mut none: Vec<ExplosiveDie> = Vec::new();
        let a = HeroDiceAllocator::allocate(&mut none, &heroes(&[3]), &kh(0), AllocationMode::Increase);
        assert!(a.distribution.is_empty());
        assert_eq!(a.explosion_count, 0);
        assert!(a.used_hero_indexes.is_empty());
        assert_eq!(a.unused_hero_indexes(), vec![0]);

        let mut dice = vec![d6(0, 3)];
        let a = HeroDiceAllocator::allocate(&mut dice, &[], &kh(1), AllocationMode::Decrease);
        assert!(a.distribution.is_empty());
        assert_eq!(dice[0].modified_value, 3);
    }

    #[test]
    fn single_hero_exact_need_on_kept_die() {
        let mut dice = vec![d6(0, 4)];
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[2]), &kh(1), AllocationMode::Increase);
        assert_eq!(dice[0].modified_value, 6);
        assert_eq!(a.distribution[&0], heroes(&[2]));
        assert_eq!(a.used_hero_indexes, vec![0]);
        assert_eq!(a.explosion_count, 1);
    }

    #[test]
    fn single_hero_prefers_exact_fit_on_kept_die() {
        // Die 0 is kept and needs exactly 2; die 1 would need 3.
        let mut dice = vec![d6(0, 4), d6(1, 3)];
        HeroDiceAllocator::allocate(&mut dice, &heroes(&[2]), &kh(1), AllocationMode::Increase);
        assert_eq!(dice[0].modified_value, 6);
        assert_eq!(dice[1].modified_value, 3);
    }

    #[test]
    fn single_hero_exact_fit_anywhere_beats_loose_cover() {
        // Die 1 (excluded) needs exactly 3; kept die 0 could only be covered loosely.
        let mut dice = vec![d6(0, 5), d6(1, 3)];
        HeroDiceAllocator::allocate(&mut dice, &heroes(&[3]), &kh(1), AllocationMode::Increase);
        assert_eq!(dice[0].modified_value, 5);
        assert_eq!(dice[1].modified_value, 6);
    }

    #[test]
    fn single_hero_falls_back_to_greedy() {
        // Non-exploding dice have no need; the greedy raises the kept die.
        let mut dice = vec![
            ExplosiveDie::new(0, 6, vec![2]).unwrap(),
            ExplosiveDie::new(1, 6, vec![4]).unwrap(),
        ];
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[1]), &kh(1), AllocationMode::Increase);
        assert_eq!(dice[1].modified_value, 5);
        assert_eq!(a.used_hero_indexes, vec![0]);
        assert_eq!(a.explosion_count, 0);
    }

    #[test]
    fn multi_hero_covers_smallest_needs_first() {
        let mut dice = vec![d6(0, 3), d6(1, 5)];
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[3, 1]), &kh(2), AllocationMode::Increase);
        assert_eq!(dice[0].modified_value, 6);
        assert_eq!(dice[1].modified_value, 6);
        assert_eq!(a.distribution[&1], vec![HeroicDieResult { result: 1, index: 1 }]);
        assert_eq!(a.distribution[&0], vec![HeroicDieResult { result: 3, index: 0 }]);
        assert_eq!(a.used_hero_indexes, vec![0, 1]);
        assert_eq!(a.explosion_count, 2);
    }

    #[test]
    fn keep_lowest_greedy_lifts_the_minimum() {
        let mut dice = vec![
            ExplosiveDie::new(0, 6, vec![2]).unwrap(),
            ExplosiveDie::new(1, 6, vec![5]).unwrap(),
        ];
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[2, 1]), &kl(1), AllocationMode::Increase);
        assert_eq!(dice[0].modified_value, 5);
        assert_eq!(dice[1].modified_value, 5);
        assert_eq!(a.allocated_count(), 2);
    }

    #[test]
    fn greedy_refuses_non_improving_placement_after_an_improvement() {
        // Heroic 6 lifts the kept die to its cap. The 1 cannot improve kh1 any
        // further and stays unallocated even though a die has room.
        let mut dice = vec![
            ExplosiveDie::new(0, 6, vec![3]).unwrap(),
            ExplosiveDie::new(1, 6, vec![2]).unwrap(),
        ];
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[6, 1]), &kh(1), AllocationMode::Increase);
        assert_eq!(dice[0].modified_value, 6);
        assert_eq!(dice[1].modified_value, 2);
        assert_eq!(a.allocated_count(), 1);
        assert_eq!(a.unused_hero_indexes(), vec![1]);
    }

    #[test]
    fn group_scope_increase_marks_only_kept_group_heroes_used() {
        let dice = |values: [u32; 4]| -> Vec<ExplosiveDie> {
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    ExplosiveDie::new(i, 6, vec![v])
                        .unwrap()
                        .in_group(Some(i / 2), i / 2 == 1)
                })
                .collect()
        };
        let rule = KeepRule::new(KeepKind::KeepHighest, 1, KeepScope::Group);
        let mut dice = dice([2, 2, 4, 3]);
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[2, 1]), &rule, AllocationMode::Increase);
        // Both heroic dice land on the kept group {4, 3}.
        assert_eq!(dice[2].total() + dice[3].total(), 10);
        assert_eq!(a.used_hero_indexes, vec![0, 1]);
    }

    #[test]
    fn decrease_removes_tail_first() {
        let mut dice = vec![
            ExplosiveDie::new(0, 6, vec![6]).unwrap(),
            ExplosiveDie::new(1, 6, vec![6, 4])
                .unwrap()
                .with_chain_depth(1)
                .exploding(true),
        ];
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[4]), &kh(2), AllocationMode::Decrease);
        assert_eq!(dice[1].modified_value, 0);
        assert!(dice[1].removed);
        assert_eq!(dice[0].modified_value, 6);
        assert_eq!(a.distribution[&1], heroes(&[4]));
    }

    #[test]
    fn decrease_tail_overshoot_is_not_reused() {
        let mut dice = vec![
            ExplosiveDie::new(0, 6, vec![6]).unwrap(),
            ExplosiveDie::new(1, 6, vec![6, 2]).unwrap().with_chain_depth(1),
        ];
        HeroDiceAllocator::allocate(&mut dice, &heroes(&[5]), &kh(2), AllocationMode::Decrease);
        assert!(dice[1].removed);
        assert_eq!(dice[0].modified_value, 6);
    }

    #[test]
    fn decrease_body_floor_is_one() {
        let mut dice = vec![d6(0, 3), d6(1, 2)];
        HeroDiceAllocator::allocate(&mut dice, &heroes(&[6, 6, 6, 6]), &kh(2), AllocationMode::Decrease);
        assert_eq!(dice[0].modified_value, 1);
        assert_eq!(dice[1].modified_value, 1);
    }

    #[test]
    fn decrease_breaks_even_ties_on_kept_die() {
        let mut dice = vec![d6(0, 5), d6(1, 5)];
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[3, 3]), &kh(1), AllocationMode::Decrease);
        assert_eq!(dice[0].modified_value, 2);
        assert_eq!(dice[1].modified_value, 2);
        // Both dice end at 2; the stable ranking keeps die 0 only.
        assert_eq!(a.used_hero_indexes, vec![0]);
    }

    #[test]
    fn decrease_used_excludes_dropped_dice() {
        // The 3 lands on die 0 first; the 1 then goes to die 1, which stays kept.
        let mut dice = vec![d6(0, 5), d6(1, 5)];
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[3, 1]), &kh(1), AllocationMode::Decrease);
        assert_eq!(dice[0].modified_value, 2);
        assert_eq!(dice[1].modified_value, 4);
        assert_eq!(a.allocated_count(), 2);
        assert_eq!(a.used_hero_indexes, vec![1]);
        assert_eq!(a.unused_hero_indexes(), vec![0]);
    }

    #[test]
    fn explosion_count_includes_capped_non_exploding_dice() {
        let mut dice = vec![ExplosiveDie::new(0, 6, vec![4]).unwrap()];
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[2]), &kh(1), AllocationMode::Increase);
        assert_eq!(dice[0].modified_value, 6);
        assert_eq!(a.explosion_count, 1);
    }

    fn grouped(values: &[(u32, usize)]) -> Vec<ExplosiveDie> {
        values
            .iter()
            .enumerate()
            .map(|(i, &(v, group))| {
                ExplosiveDie::new(i, 6, vec![v])
                    .unwrap()
                    .in_group(Some(group), true)
            })
            .collect()
    }

    #[test]
    fn keep_lowest_group_covers_only_kept_group_needs() {
        // {2d6x, 2d6x}kl1 with groups [2, 2] (kept) and [5, 3]. The excluded
        // group has the smaller needs (1 and 3), which the pool covers exactly,
        // but covering is limited to the kept group.
        let mut dice: Vec<ExplosiveDie> = grouped(&[(2, 0), (2, 0), (5, 1), (3, 1)])
            .into_iter()
            .map(|d| d.exploding(true))
            .collect();
        let rule = KeepRule::new(KeepKind::KeepLowest, 1, KeepScope::Group);
        HeroDiceAllocator::allocate(&mut dice, &heroes(&[1, 3]), &rule, AllocationMode::Increase);
        assert_eq!(dice[0].modified_value, 6);
        assert_eq!(dice[0].heroic_allocated, heroes(&[1, 3]));
        assert_eq!(dice[1].modified_value, 2);
        assert_eq!(dice[2].modified_value, 5);
        assert_eq!(dice[3].modified_value, 3);
    }

    #[test]
    fn decrease_ties_prefer_the_larger_entry() {
        // {2d6, 2d6, 1d6}kh2 with groups [4, 4] = 8, [6, 1] = 7, [3] = 3.
        // Lowering die 0 or die 2 by 1 drops the kept sum equally. Die 0's group
        // is larger, which beats die 2's extra headroom.
        let mut dice = grouped(&[(4, 0), (4, 0), (6, 1), (1, 1), (3, 2)]);
        let rule = KeepRule::new(KeepKind::KeepHighest, 2, KeepScope::Group);
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[1]), &rule, AllocationMode::Decrease);
        assert_eq!(dice[0].modified_value, 3);
        assert_eq!(dice[2].modified_value, 6);
        assert_eq!(a.distribution.keys().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn decrease_ties_then_prefer_more_headroom() {
        // {2d6, 1d6}kh1 with groups [4, 2] and [3]: lowering either kept die by 1
        // leaves the same score and the same entry, so the 4 is picked.
        let mut dice = grouped(&[(4, 0), (2, 0), (3, 1)]);
        let rule = KeepRule::new(KeepKind::KeepHighest, 1, KeepScope::Group);
        HeroDiceAllocator::allocate(&mut dice, &heroes(&[1]), &rule, AllocationMode::Decrease);
        assert_eq!(dice[0].modified_value, 3);
        assert_eq!(dice[1].modified_value, 2);
    }

    #[test]
    fn decrease_group_fallback_refuses_non_improving_moves() {
        // {2d6, 1d6}kh1 with groups [3, 3] and [6] tied at 6; the first group is
        // kept. Lowering a kept die only hands the lead to [6], so the search
        // falls back to every die. The best of those is the excluded 6, which
        // cannot lower the score either, so the heroic die stays unallocated.
        let mut dice = grouped(&[(3, 0), (3, 0), (6, 1)]);
        let rule = KeepRule::new(KeepKind::KeepHighest, 1, KeepScope::Group);
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[2]), &rule, AllocationMode::Decrease);
        assert_eq!(a.allocated_count(), 0);
        assert_eq!(a.unused_hero_indexes(), vec![0]);
        assert_eq!(
            dice.iter().map(|d| d.modified_value).collect::<Vec<_>>(),
            vec![3, 3, 6]
        );
    }

    #[test]
    fn decrease_group_fallback_when_kept_group_is_floored() {
        // {3d6, 1d6}kh1 with groups [1, 1, 1] (kept) and [2]: nothing in the
        // kept group can move and lowering the 2 cannot change the score.
        let mut dice = grouped(&[(1, 0), (1, 0), (1, 0), (2, 1)]);
        let rule = KeepRule::new(KeepKind::KeepHighest, 1, KeepScope::Group);
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[1]), &rule, AllocationMode::Decrease);
        assert_eq!(a.allocated_count(), 0);
        assert_eq!(dice[3].modified_value, 2);
    }

    #[test]
    fn decrease_ignores_excluded_dice() {
        let mut dice = vec![d6(0, 5), d6(1, 2)];
        let a = HeroDiceAllocator::allocate(&mut dice, &heroes(&[1]), &kh(1), AllocationMode::Decrease);
        assert_eq!(dice[0].modified_value, 4);
        assert_eq!(dice[1].modified_value, 2);
        assert_eq!(a.distribution.len(), 1);
    }

    #[test]
    fn decrease_group_scope_targets_kept_group() {
        let mut dice: Vec<ExplosiveDie> = [1, 2, 5, 4]
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                ExplosiveDie::new(i, 6, vec![v])
                    .unwrap()
                    .in_group(Some(i / 2), i / 2 == 1)
            })
            .collect();
        let rule = KeepRule::new(KeepKind::KeepHighest, 1, KeepScope::Group);
        HeroDiceAllocator::allocate(&mut dice, &heroes(&[2]), &rule, AllocationMode::Decrease);
        assert_eq!(dice[0].modified_value + dice[1].modified_value, 3);
        assert_eq!(dice[2].modified_value + dice[3].modified_value, 7);
    }
}
