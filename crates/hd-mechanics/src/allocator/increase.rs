//! Increase mode: spend heroic dice to maximize the kept result.

use crate::dice::HeroicDieResult;
use crate::keep::{KeepKind, KeepScope};

use super::search::find_optimized_combination;
use super::shadow::{Score, Shadow};

/// Allocate `heroes` onto the shadow dice. Returns the heroic dice left unallocated.
pub(crate) fn allocate(shadow: &mut Shadow, heroes: &[HeroicDieResult]) -> Vec<HeroicDieResult> {
    let mut remaining = heroes.to_vec();
    if remaining.len() == 1 {
        single_hero_fast_path(shadow, &mut remaining);
    } else {
        cover_needs(shadow, &mut remaining);
    }
    greedy(shadow, remaining)
}

/// One heroic die left: an exact fit on a kept die, an exact fit anywhere,
/// then the least wasteful cover of a kept die.
fn single_hero_fast_path(shadow: &mut Shadow, remaining: &mut Vec<HeroicDieResult>) {
    let hero = remaining[0];
    let kept = shadow.kept_keys();
    let needs: Vec<(usize, u32, bool)> = shadow
        .dice
        .iter()
        .enumerate()
        .filter_map(|(pos, die)| die.need().map(|need| (pos, need, shadow.is_kept(&kept, pos))))
        .collect();

    let exact_kept = needs
        .iter()
        .find(|&&(_, need, is_kept)| need == hero.result && is_kept);
    let exact_any = || needs.iter().find(|&&(_, need, _)| need == hero.result);
    let cover_kept = || {
        needs
            .iter()
            .filter(|&&(_, need, is_kept)| need < hero.result && is_kept)
            .min_by_key(|&&(pos, need, _)| (hero.result - need, pos))
    };

    if let Some(&(pos, need, _)) = exact_kept.or_else(exact_any).or_else(cover_kept) {
        tracing::trace!(die = pos, need, hero = %hero, "single heroic die fast path");
        shadow.raise(pos, hero);
        remaining.clear();
    }
}

/// Several heroic dice left: cover the smallest needs first with the least
/// wasteful combination of remaining values.
fn cover_needs(shadow: &mut Shadow, remaining: &mut Vec<HeroicDieResult>) {
    let kept = shadow.kept_keys();
    let mut needs: Vec<(usize, u32)> = shadow
        .dice
        .iter()
        .enumerate()
        .filter_map(|(pos, die)| die.need().map(|need| (pos, need)))
        .collect();
    needs.sort_by_key(|&(pos, need)| (need, pos));

    // Pushing an excluded group to its cap is wasted under keep-lowest.
    let rule = shadow.rule();
    if rule.kind() == KeepKind::KeepLowest && rule.scope() == KeepScope::Group {
        let in_kept: Vec<(usize, u32)> = needs
            .iter()
            .copied()
            .filter(|&(pos, _)| shadow.is_kept(&kept, pos))
            .collect();
        if !in_kept.is_empty() {
            needs = in_kept;
        }
    }

    for (pos, _) in needs {
        if remaining.is_empty() {
            break;
        }
        let Some(need) = shadow.dice[pos].need() else {
            continue;
        };
        let values: Vec<u32> = remaining.iter().map(|h| h.result).collect();
        let Some(mut picked) = find_optimized_combination(&values, need) else {
            continue;
        };
        tracing::trace!(die = pos, need, ?picked, "covering need");
        picked.sort_unstable();
        for &idx in &picked {
            shadow.raise(pos, remaining[idx]);
        }
        for idx in picked.into_iter().rev() {
            remaining.remove(idx);
        }
    }
}

/// Place each remaining value, largest first, where it lifts the kept score most.
///
/// Once any placement has improved the score, later placements that do not
/// improve it are refused, so some heroic dice can stay unallocated.
fn greedy(shadow: &mut Shadow, mut remaining: Vec<HeroicDieResult>) -> Vec<HeroicDieResult> {
    remaining.sort_by(|a, b| b.result.cmp(&a.result).then(a.index.cmp(&b.index)));
    let mut unallocated = Vec::new();
    let mut improved = false;

    for hero in remaining {
        let baseline = shadow.score();
        let kept = shadow.kept_keys();
        let mut best: Option<Candidate> = None;

        for (pos, die) in shadow.dice.iter().enumerate() {
            if die.removed || die.value >= die.faces {
                continue;
            }
            let room = die.faces - die.value;
            let candidate = Candidate {
                pos,
                score: shadow.score_if(pos, die.value + hero.result.min(room)),
                kept: shadow.is_kept(&kept, pos),
                waste: hero.result.saturating_sub(room),
            };
            if best.as_ref().is_none_or(|b| candidate.beats(b)) {
                best = Some(candidate);
            }
        }

        let Some(best) = best else {
            unallocated.push(hero);
            continue;
        };
        let improves = best.score > baseline;
        if improves || !improved {
            tracing::trace!(die = best.pos, hero = %hero, improves, "greedy placement");
            shadow.raise(best.pos, hero);
            improved |= improves;
        } else {
            tracing::trace!(hero = %hero, "no improving placement, leaving unallocated");
            unallocated.push(hero);
        }
    }
    unallocated
}

#[derive(Debug)]
struct Candidate {
    pos: usize,
    score: Score,
    kept: bool,
    waste: u32,
}

impl Candidate {
    /// Higher score, then a kept die, then less waste. Earlier dice win full ties.
    fn beats(&self, other: &Self) -> bool {
        (self.score, self.kept, std::cmp::Reverse(self.waste))
            > (other.score, other.kept, std::cmp::Reverse(other.waste))
    }
}
