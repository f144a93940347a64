//! Decomposes an evaluated roll into the heroic target and everything else.

use serde::{Deserialize, Serialize};

use super::{DiceTerm, Roll, RollTerm, additive_runs, saturating_product};
use crate::error::MechResult;
use crate::keep::{KeepRule, KeepScope};

/// One active die result inside the target component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDie {
    /// Number of faces.
    pub faces: u32,
    /// Face values of the explosion chain up to and including this result.
    pub chain: Vec<u32>,
    /// Whether this result exploded in the original roll.
    pub exploded: bool,
    /// 0 for a body result, n for the n-th explosion roll of its chain.
    pub chain_depth: usize,
    /// Pool alternative index when the target is a pool.
    pub group_id: Option<usize>,
    /// Whether the pool kept the alternative. Always true outside pools.
    pub group_kept: bool,
}

/// The result of analyzing a roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    /// Position of the target term in the top-level term list.
    pub target_index: Option<usize>,
    /// Dice eligible for heroic modification.
    pub target_dice: Vec<TargetDie>,
    /// Signed factor applied to the kept target dice.
    pub target_multiplier: i64,
    /// Sum of every other top-level component.
    pub non_target_value: i64,
    /// Whether any die in the whole roll explodes.
    pub should_explode: bool,
    /// The keep rule governing the target.
    pub keep_rule: KeepRule,
}

impl Decomposition {
    /// Returns true when there is nothing for heroic dice to modify.
    pub fn is_pass_through(&self) -> bool {
        self.target_dice.is_empty()
    }
}

/// Stateless roll decomposition.
pub struct RollAnalyzer;

impl RollAnalyzer {
    /// Split `roll` into its target dice, multiplier, and non-target value.
    ///
    /// The target is the first dice, pool, or parenthetical component reading
    /// left to right. The multiplier is the signed product of the other factors
    /// in the target's multiplicative run, so `3 - 1d6 * 2` yields `-2`.
    pub fn decompose(roll: &Roll) -> MechResult<Decomposition> {
        roll.validate()?;
        let should_explode = roll.has_exploding_dice();
        let runs = additive_runs(&roll.terms);

        let located = runs.iter().enumerate().find_map(|(run_idx, run)| {
            run.factors
                .iter()
                .find(|(_, term)| term.is_dice_like())
                .map(|&(pos, term)| (run_idx, pos, term))
        });

        let Some((run_idx, target_pos, target)) = located else {
            return Ok(Decomposition {
                target_index: None,
                target_dice: Vec::new(),
                target_multiplier: 1,
                non_target_value: roll.total(),
                should_explode,
                keep_rule: KeepRule::keep_all(0),
            });
        };

        let run = &runs[run_idx];
        let target_multiplier = saturating_product(
            run.sign,
            run.factors
                .iter()
                .filter(|(pos, _)| *pos != target_pos)
                .map(|(_, term)| term.value()),
        );
        let non_target_value = runs
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != run_idx)
            .map(|(_, run)| run.value())
            .fold(0, i64::saturating_add);

        let target_dice = Self::target_dice(target);
        let keep_rule = Self::keep_rule(target, roll)?;

        tracing::debug!(
            target = target_pos,
            dice = target_dice.len(),
            multiplier = target_multiplier,
            non_target = non_target_value,
            keep = %keep_rule,
            should_explode,
            "decomposed roll"
        );

        Ok(Decomposition {
            target_index: Some(target_pos),
            target_dice,
            target_multiplier,
            non_target_value,
            should_explode,
            keep_rule,
        })
    }

    /// Flatten the active die results reachable inside `target`.
    ///
    /// A pool target tags every die of alternative `i` with group `i`, including
    /// alternatives the pool discarded.
    pub fn target_dice(target: &RollTerm) -> Vec<TargetDie> {
        let mut out = Vec::new();
        match target {
            RollTerm::Pool(pool) => {
                for (idx, alt) in pool.alternatives.iter().enumerate() {
                    for term in &alt.roll.terms {
                        collect(term, Some((idx, alt.active)), &mut out);
                    }
                }
            }
            other => collect(other, None, &mut out),
        }
        out
    }

    /// The keep rule for `target`.
    ///
    /// Searches the target subtree first, then the whole roll. Without any
    /// keep modifier every target die is kept.
    pub fn keep_rule(target: &RollTerm, roll: &Roll) -> MechResult<KeepRule> {
        if let Some(rule) = find_keep(target)? {
            return Ok(rule);
        }
        for term in &roll.terms {
            if let Some(rule) = find_keep(term)? {
                return Ok(rule);
            }
        }
        Ok(KeepRule::keep_all(Self::target_dice(target).len()))
    }
}

fn collect(term: &RollTerm, group: Option<(usize, bool)>, out: &mut Vec<TargetDie>) {
    match term {
        RollTerm::Dice(dice) => collect_dice(dice, group, out),
        RollTerm::Pool(pool) => {
            for alt in pool.alternatives.iter().filter(|a| a.active) {
                for term in &alt.roll.terms {
                    collect(term, group, out);
                }
            }
        }
        RollTerm::Paren(paren) => {
            for term in &paren.roll.terms {
                collect(term, group, out);
            }
        }
        RollTerm::Operator(_) | RollTerm::Numeric(_) => {}
    }
}

fn collect_dice(dice: &DiceTerm, group: Option<(usize, bool)>, out: &mut Vec<TargetDie>) {
    let mut chain = Vec::new();
    for roll in &dice.results {
        chain.push(roll.result);
        if roll.active {
            out.push(TargetDie {
                faces: dice.faces,
                chain: chain.clone(),
                exploded: roll.exploded,
                chain_depth: chain.len() - 1,
                group_id: group.map(|(id, _)| id),
                group_kept: group.is_none_or(|(_, kept)| kept),
            });
        }
        if !roll.exploded {
            chain.clear();
        }
    }
}

fn find_keep(term: &RollTerm) -> MechResult<Option<KeepRule>> {
    match term {
        RollTerm::Dice(dice) => Ok(dice
            .keep_modifier()?
            .map(|(kind, count)| KeepRule::new(kind, count, KeepScope::Die))),
        RollTerm::Pool(pool) => {
            if let Some((kind, count)) = pool.keep_modifier()? {
                return Ok(Some(KeepRule::new(kind, count, KeepScope::Group)));
            }
            for alt in &pool.alternatives {
                for term in &alt.roll.terms {
                    if let Some(rule) = find_keep(term)? {
                        return Ok(Some(rule));
                    }
                }
            }
            Ok(None)
        }
        RollTerm::Paren(paren) => {
            for term in &paren.roll.terms {
                if let Some(rule) = find_keep(term)? {
                    return Ok(Some(rule));
                }
            }
            Ok(None)
        }
        RollTerm::Operator(_) | RollTerm::Numeric(_) => Ok(None),
    }
}
