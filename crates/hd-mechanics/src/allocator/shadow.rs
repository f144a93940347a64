//! Staging copy of the dice that the allocation search mutates freely.

use crate::dice::{ExplosiveDie, HeroicDieResult};
use crate::keep::{KeepRule, KeepScope};

use super::AllocationMode;

/// Lightweight value copy of one [`ExplosiveDie`].
#[derive(Debug, Clone)]
pub(crate) struct ShadowDie {
    pub(crate) faces: u32,
    pub(crate) value: u32,
    pub(crate) floor: u32,
    pub(crate) can_explode: bool,
    pub(crate) chain_depth: usize,
    /// Ranking entry this die contributes to.
    pub(crate) key: usize,
    pub(crate) removed: bool,
    pub(crate) heroes: Vec<HeroicDieResult>,
    /// Amount actually subtracted in decrease mode.
    pub(crate) applied: u32,
}

impl ShadowDie {
    pub(crate) fn need(&self) -> Option<u32> {
        (self.can_explode && !self.removed && self.value < self.faces)
            .then(|| self.faces - self.value)
    }

    pub(crate) fn headroom(&self) -> u32 {
        self.value.saturating_sub(self.floor)
    }
}

/// How the kept entries fare, compared lexicographically. Values are in half-pips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Score {
    primary: i64,
    secondary: i64,
}

/// Shadow arena plus the rule it is ranked by.
#[derive(Debug, Clone)]
pub(crate) struct Shadow {
    pub(crate) dice: Vec<ShadowDie>,
    rule: KeepRule,
    mode: AllocationMode,
    entry_count: usize,
}

impl Shadow {
    pub(crate) fn new(dice: &[ExplosiveDie], rule: KeepRule, mode: AllocationMode) -> Self {
        let mut slots: Vec<Option<usize>> = Vec::new();
        let dice: Vec<ShadowDie> = dice
            .iter()
            .map(|die| {
                // Ungrouped dice, and every die under die scope, rank on their own.
                let existing = match (rule.scope(), die.group_id) {
                    (KeepScope::Group, Some(group)) => {
                        slots.iter().position(|&slot| slot == Some(group))
                    }
                    _ => None,
                };
                let key = match existing {
                    Some(key) => key,
                    None => {
                        let slot = match rule.scope() {
                            KeepScope::Group => die.group_id,
                            KeepScope::Die => None,
                        };
                        slots.push(slot);
                        slots.len() - 1
                    }
                };
                ShadowDie {
                    faces: die.faces,
                    value: die.modified_value.min(die.faces),
                    floor: die.floor(),
                    can_explode: die.can_explode,
                    chain_depth: die.chain_depth,
                    key,
                    removed: die.removed,
                    heroes: Vec::new(),
                    applied: 0,
                }
            })
            .collect();
        Self {
            dice,
            rule,
            mode,
            entry_count: slots.len(),
        }
    }

    pub(crate) fn rule(&self) -> &KeepRule {
        &self.rule
    }

    fn projected(&self, die: &ShadowDie, value: u32) -> i64 {
        let mut half_pips = 2 * i64::from(value);
        // A die sitting at its cap will explode; count the expected roll.
        if self.mode == AllocationMode::Increase && die.can_explode && value == die.faces {
            half_pips += i64::from(die.faces) + 1;
        }
        half_pips
    }

    /// Per-entry totals as `(key, half-pips)`, skipping entries with only removed dice.
    fn entries(&self, with: Option<(usize, u32)>) -> Vec<(usize, i64)> {
        let mut totals: Vec<Option<i64>> = vec![None; self.entry_count];
        for (pos, die) in self.dice.iter().enumerate() {
            let value = match with {
                Some((p, v)) if p == pos => v,
                _ => die.value,
            };
            if die.removed || (die.chain_depth > 0 && value == 0) {
                continue;
            }
            *totals[die.key].get_or_insert(0) += self.projected(die, value);
        }
        totals
            .into_iter()
            .enumerate()
            .filter_map(|(key, total)| total.map(|t| (key, t)))
            .collect()
    }

    fn kept_of(&self, entries: &[(usize, i64)]) -> Vec<usize> {
        let totals: Vec<i64> = entries.iter().map(|&(_, t)| t).collect();
        self.rule
            .select(&totals)
            .into_iter()
            .map(|idx| entries[idx].0)
            .collect()
    }

    /// Keys of the entries currently kept.
    pub(crate) fn kept_keys(&self) -> Vec<usize> {
        self.kept_of(&self.entries(None))
    }

    /// Returns true if the die at `pos` belongs to a kept entry.
    pub(crate) fn is_kept(&self, kept: &[usize], pos: usize) -> bool {
        kept.contains(&self.dice[pos].key)
    }

    /// Current total of the entry the die at `pos` belongs to.
    pub(crate) fn entry_total(&self, pos: usize) -> i64 {
        let key = self.dice[pos].key;
        self.entries(None)
            .into_iter()
            .find(|&(k, _)| k == key)
            .map_or(0, |(_, t)| t)
    }

    pub(crate) fn score(&self) -> Score {
        self.score_with(None)
    }

    /// Score if the die at `pos` had `value` instead.
    pub(crate) fn score_if(&self, pos: usize, value: u32) -> Score {
        self.score_with(Some((pos, value)))
    }

    fn score_with(&self, with: Option<(usize, u32)>) -> Score {
        let entries = self.entries(with);
        let kept = self.kept_of(&entries);
        let kept_totals = entries
            .iter()
            .filter(|(key, _)| kept.contains(key))
            .map(|&(_, t)| t);
        let sum: i64 = kept_totals.clone().sum();
        match (self.mode, self.rule.is_highest()) {
            (AllocationMode::Increase, false) => Score {
                primary: kept_totals.min().unwrap_or(0),
                secondary: sum,
            },
            _ => Score {
                primary: sum,
                secondary: 0,
            },
        }
    }

    /// Raise the die at `pos` by a heroic value, capped at its faces.
    pub(crate) fn raise(&mut self, pos: usize, hero: HeroicDieResult) {
        let die = &mut self.dice[pos];
        die.value = (die.value + hero.result).min(die.faces);
        die.heroes.push(hero);
    }

    /// Lower the die at `pos` by `amount`, never below its floor.
    pub(crate) fn lower(&mut self, pos: usize, hero: HeroicDieResult, amount: u32) {
        let die = &mut self.dice[pos];
        let applied = amount.min(die.headroom());
        die.value -= applied;
        die.applied += applied;
        die.heroes.push(hero);
        if die.chain_depth > 0 && die.value == 0 {
            die.removed = true;
        }
    }
}
