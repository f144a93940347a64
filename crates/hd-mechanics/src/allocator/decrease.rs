//! Decrease mode: spend heroic dice to soak the kept result.

use crate::dice::HeroicDieResult;
use crate::keep::KeepScope;

use super::search::find_cover_min_count_min_sum;
use super::shadow::{Score, Shadow};

/// Allocate `heroes` onto the shadow dice. Returns the heroic dice left unallocated.
pub(crate) fn allocate(shadow: &mut Shadow, heroes: &[HeroicDieResult]) -> Vec<HeroicDieResult> {
    let mut remaining = heroes.to_vec();
    remove_tails(shadow, &mut remaining);
    reduce_bodies(shadow, remaining)
}

/// Zero out explosion tails, deepest first, each with the fewest heroic dice
/// that cover its whole value.
fn remove_tails(shadow: &mut Shadow, remaining: &mut Vec<HeroicDieResult>) {
    let mut tails: Vec<usize> = shadow
        .dice
        .iter()
        .enumerate()
        .filter(|(_, die)| die.chain_depth > 0 && !die.removed && die.value > 0)
        .map(|(pos, _)| pos)
        .collect();
    tails.sort_by(|&a, &b| {
        shadow.dice[b]
            .chain_depth
            .cmp(&shadow.dice[a].chain_depth)
            .then(a.cmp(&b))
    });

    for pos in tails {
        if remaining.is_empty() {
            break;
        }
        let values: Vec<u32> = remaining.iter().map(|h| h.result).collect();
        let Some(mut picked) = find_cover_min_count_min_sum(&values, shadow.dice[pos].value) else {
            continue;
        };
        tracing::trace!(die = pos, value = shadow.dice[pos].value, ?picked, "removing tail");
        picked.sort_unstable();
        // Only what the tail still needs is applied; overshoot is not reused.
        for &idx in &picked {
            let hero = remaining[idx];
            let need = shadow.dice[pos].value;
            shadow.lower(pos, hero, hero.result.min(need));
        }
        for idx in picked.into_iter().rev() {
            remaining.remove(idx);
        }
    }
}

/// Greedily apply each remaining value where it lowers the kept score most.
fn reduce_bodies(shadow: &mut Shadow, mut remaining: Vec<HeroicDieResult>) -> Vec<HeroicDieResult> {
    let highest = shadow.rule().is_highest();
    let group_scoped = shadow.rule().scope() == KeepScope::Group;
    if highest {
        remaining.sort_by(|a, b| b.result.cmp(&a.result).then(a.index.cmp(&b.index)));
    } else {
        remaining.sort_by(|a, b| a.result.cmp(&b.result).then(a.index.cmp(&b.index)));
    }

    let mut unallocated = Vec::new();
    for hero in remaining {
        let baseline = shadow.score();
        let kept = shadow.kept_keys();

        let mut best = if highest && group_scoped {
            best_reduction(shadow, hero, &kept, true)
                .filter(|c| c.score < baseline)
                .or_else(|| best_reduction(shadow, hero, &kept, false))
        } else {
            best_reduction(shadow, hero, &kept, false)
        };
        best = best.filter(|c| c.score < baseline || (c.score == baseline && c.kept));

        match best {
            Some(c) => {
                tracing::trace!(die = c.pos, hero = %hero, "reducing die");
                let amount = hero.result.min(shadow.dice[c.pos].headroom());
                shadow.lower(c.pos, hero, amount);
            }
            None => unallocated.push(hero),
        }
    }
    unallocated
}

fn best_reduction(
    shadow: &Shadow,
    hero: HeroicDieResult,
    kept: &[usize],
    kept_only: bool,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for (pos, die) in shadow.dice.iter().enumerate() {
        let is_kept = shadow.is_kept(kept, pos);
        if die.removed || die.headroom() == 0 || (kept_only && !is_kept) {
            continue;
        }
        let lowered = die.value - hero.result.min(die.headroom());
        let candidate = Candidate {
            pos,
            score: shadow.score_if(pos, lowered),
            kept: is_kept,
            entry_total: shadow.entry_total(pos),
            headroom: die.headroom(),
        };
        if best.as_ref().is_none_or(|b| candidate.beats(b)) {
            best = Some(candidate);
        }
    }
    best
}

#[derive(Debug)]
struct Candidate {
    pos: usize,
    score: Score,
    kept: bool,
    entry_total: i64,
    headroom: u32,
}

impl Candidate {
    /// Lower score, then the largest entry, then the most headroom. Earlier dice win full ties.
    fn beats(&self, other: &Self) -> bool {
        (std::cmp::Reverse(self.score), self.entry_total, self.headroom)
            > (std::cmp::Reverse(other.score), other.entry_total, other.headroom)
    }
}
