//! Small backtracking searches over the remaining heroic values.
//!
//! Heroic pools hold a handful of dice, so exhaustive search is fine.

/// The subset of `values` (as positions) whose sum covers `target` with the
/// least overshoot. Ties go to fewer dice, then to earlier positions.
pub(crate) fn find_optimized_combination(values: &[u32], target: u32) -> Option<Vec<usize>> {
    best_cover(values, target, |count, sum| (sum - u64::from(target), count))
}

/// The subset of `values` (as positions) covering `target` with the fewest
/// dice. Ties go to the smaller sum, then to earlier positions.
pub(crate) fn find_cover_min_count_min_sum(values: &[u32], target: u32) -> Option<Vec<usize>> {
    best_cover(values, target, |count, sum| (count, sum))
}

fn best_cover(
    values: &[u32],
    target: u32,
    rank: impl Fn(u64, u64) -> (u64, u64),
) -> Option<Vec<usize>> {
    if target == 0 {
        return Some(Vec::new());
    }
    let total: u64 = values.iter().map(|&v| u64::from(v)).sum();
    if total < u64::from(target) {
        return None;
    }

    let mut search = Search {
        values,
        target: u64::from(target),
        rank: &rank,
        best: None,
        picked: Vec::with_capacity(values.len()),
    };
    search.visit(0, 0, total);
    search.best.map(|(_, picked)| picked)
}

struct Search<'a, F> {
    values: &'a [u32],
    target: u64,
    rank: &'a F,
    best: Option<((u64, u64), Vec<usize>)>,
    picked: Vec<usize>,
}

impl<F: Fn(u64, u64) -> (u64, u64)> Search<'_, F> {
    fn visit(&mut self, pos: usize, sum: u64, left: u64) {
        if sum >= self.target {
            let key = (self.rank)(self.picked.len() as u64, sum);
            if self.best.as_ref().is_none_or(|(best, _)| key < *best) {
                self.best = Some((key, self.picked.clone()));
            }
            return;
        }
        if pos == self.values.len() || sum + left < self.target {
            return;
        }
        let value = u64::from(self.values[pos]);

        self.picked.push(pos);
        self.visit(pos + 1, sum + value, left - value);
        self.picked.pop();

        self.visit(pos + 1, sum, left - value);
    }
}
