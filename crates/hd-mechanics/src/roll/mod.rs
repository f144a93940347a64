//! Evaluated roll trees.
//!
//! A [`Roll`] is the host's already-evaluated formula, e.g. `{2d6,2d6}kh + 3`
//! after the dice have landed. Terms form a closed set: dice, pools,
//! parentheticals, operators and numeric constants. Hosts and the CLI
//! exchange rolls as JSON, tagged by `"type"`.

pub mod analyzer;

pub use analyzer::{Decomposition, RollAnalyzer, TargetDie};

use serde::{Deserialize, Serialize};

use crate::error::{MechError, MechResult};
use crate::keep::KeepKind;

fn yes() -> bool {
    true
}

/// One face value of an atomic dice term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieRoll {
    /// Face value rolled.
    pub result: u32,
    /// Whether this result counts toward the term's total.
    #[serde(default = "yes")]
    pub active: bool,
    /// Whether this result exploded, i.e. caused the next result to be rolled.
    #[serde(default)]
    pub exploded: bool,
}

impl DieRoll {
    /// An active, non-exploded result.
    pub fn new(result: u32) -> Self {
        Self {
            result,
            active: true,
            exploded: false,
        }
    }

    /// Mark this result as having exploded.
    pub fn exploded(mut self) -> Self {
        self.exploded = true;
        self
    }

    /// Mark this result as discarded.
    pub fn discarded(mut self) -> Self {
        self.active = false;
        self
    }
}

/// An atomic `NdF` term with its results and modifiers (`x`, `kh2`, `kl`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceTerm {
    /// Number of faces.
    pub faces: u32,
    /// Results in roll order, including explosion rolls.
    pub results: Vec<DieRoll>,
    /// Modifier tags as written in the formula.
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl DiceTerm {
    /// A term whose results are all active and unexploded.
    pub fn new(faces: u32, values: &[u32]) -> Self {
        Self {
            faces,
            results: values.iter().map(|&v| DieRoll::new(v)).collect(),
            modifiers: Vec::new(),
        }
    }

    /// A term built from explicit results.
    pub fn from_results(faces: u32, results: Vec<DieRoll>) -> Self {
        Self {
            faces,
            results,
            modifiers: Vec::new(),
        }
    }

    /// Add a modifier tag.
    pub fn with_modifier(mut self, modifier: &str) -> Self {
        self.modifiers.push(modifier.to_string());
        self
    }

    /// Sum of active results.
    pub fn active_total(&self) -> i64 {
        self.results
            .iter()
            .filter(|r| r.active)
            .map(|r| i64::from(r.result))
            .sum()
    }

    /// Returns true if any modifier requests explosions (`x`, `xo`, `x6`, ...).
    pub fn explodes(&self) -> bool {
        self.modifiers
            .iter()
            .any(|m| m.trim().to_lowercase().starts_with('x'))
    }

    /// The first keep modifier on this term, if any.
    pub fn keep_modifier(&self) -> MechResult<Option<(KeepKind, usize)>> {
        parse_keep_modifiers(&self.modifiers)
    }
}

/// One bracketed alternative of a pool term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAlternative {
    /// The alternative's own evaluated roll.
    pub roll: Roll,
    /// Whether the pool kept this alternative.
    #[serde(default = "yes")]
    pub active: bool,
}

/// A bracketed pool such as `{2d6,2d6}kh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTerm {
    /// Alternatives in formula order.
    pub alternatives: Vec<PoolAlternative>,
    /// Modifier tags applied to the pool.
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl PoolTerm {
    /// Build a pool from `(roll, active)` pairs.
    pub fn new(alternatives: impl IntoIterator<Item = (Roll, bool)>) -> Self {
        Self {
            alternatives: alternatives
                .into_iter()
                .map(|(roll, active)| PoolAlternative { roll, active })
                .collect(),
            modifiers: Vec::new(),
        }
    }

    /// Add a modifier tag.
    pub fn with_modifier(mut self, modifier: &str) -> Self {
        self.modifiers.push(modifier.to_string());
        self
    }

    /// Sum of the active alternatives' totals.
    pub fn total(&self) -> i64 {
        self.alternatives
            .iter()
            .filter(|a| a.active)
            .map(|a| a.roll.total())
            .fold(0, i64::saturating_add)
    }

    /// The first keep modifier on this pool, if any.
    pub fn keep_modifier(&self) -> MechResult<Option<(KeepKind, usize)>> {
        parse_keep_modifiers(&self.modifiers)
    }
}

/// A parenthetical sub-expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParenTerm {
    /// The wrapped roll.
    pub roll: Roll,
}

/// An arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Addition.
    #[serde(rename = "+")]
    Add,
    /// Subtraction.
    #[serde(rename = "-")]
    Sub,
    /// Multiplication.
    #[serde(rename = "*")]
    Mul,
}

/// An operator term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorTerm {
    /// The operator.
    pub operator: Operator,
}

/// A numeric constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericTerm {
    /// The constant's value.
    pub value: i64,
}

/// One term of an evaluated roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollTerm {
    /// Atomic dice.
    Dice(DiceTerm),
    /// Bracketed pool of alternatives.
    Pool(PoolTerm),
    /// Parenthetical sub-expression.
    Paren(ParenTerm),
    /// Arithmetic operator.
    Operator(OperatorTerm),
    /// Numeric constant.
    Numeric(NumericTerm),
}

impl RollTerm {
    /// A numeric constant term.
    pub fn num(value: i64) -> Self {
        Self::Numeric(NumericTerm { value })
    }

    /// An operator term.
    pub fn op(operator: Operator) -> Self {
        Self::Operator(OperatorTerm { operator })
    }

    /// A parenthetical wrapping `roll`.
    pub fn paren(roll: Roll) -> Self {
        Self::Paren(ParenTerm { roll })
    }

    /// Returns true for terms that hold dice (directly or nested).
    pub fn is_dice_like(&self) -> bool {
        matches!(self, Self::Dice(_) | Self::Pool(_) | Self::Paren(_))
    }

    /// Value of an operand term. Operators evaluate to 0.
    pub fn value(&self) -> i64 {
        match self {
            Self::Dice(d) => d.active_total(),
            Self::Pool(p) => p.total(),
            Self::Paren(p) => p.roll.total(),
            Self::Numeric(n) => n.value,
            Self::Operator(_) => 0,
        }
    }

    fn validate(&self) -> MechResult<()> {
        match self {
            Self::Dice(d) => {
                if d.faces == 0 {
                    return Err(MechError::InvalidTerm("dice term has 0 faces".into()));
                }
                if let Some(bad) = d.results.iter().find(|r| r.result == 0 || r.result > d.faces) {
                    return Err(MechError::InvalidTerm(format!(
                        "result {} out of range for d{}",
                        bad.result, d.faces
                    )));
                }
                d.keep_modifier().map(|_| ())
            }
            Self::Pool(p) => {
                p.keep_modifier()?;
                p.alternatives.iter().try_for_each(|a| a.roll.validate())
            }
            Self::Paren(p) => p.roll.validate(),
            Self::Operator(_) | Self::Numeric(_) => Ok(()),
        }
    }

    fn any_dice(&self, pred: &impl Fn(&DiceTerm) -> bool) -> bool {
        match self {
            Self::Dice(d) => pred(d),
            Self::Pool(p) => p
                .alternatives
                .iter()
                .any(|a| a.roll.terms.iter().any(|t| t.any_dice(pred))),
            Self::Paren(p) => p.roll.terms.iter().any(|t| t.any_dice(pred)),
            Self::Operator(_) | Self::Numeric(_) => false,
        }
    }
}

impl From<DiceTerm> for RollTerm {
    fn from(term: DiceTerm) -> Self {
        Self::Dice(term)
    }
}

impl From<PoolTerm> for RollTerm {
    fn from(term: PoolTerm) -> Self {
        Self::Pool(term)
    }
}

/// An evaluated roll: a flat sequence of terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roll {
    /// Terms in formula order.
    pub terms: Vec<RollTerm>,
}

impl Roll {
    /// Create a roll from its terms.
    pub fn new(terms: Vec<RollTerm>) -> Self {
        Self { terms }
    }

    /// Evaluate the roll. `*` binds tighter than `+` and `-`.
    pub fn total(&self) -> i64 {
        additive_runs(&self.terms)
            .iter()
            .map(Run::value)
            .fold(0, i64::saturating_add)
    }

    /// Reject malformed terms anywhere in the tree.
    pub fn validate(&self) -> MechResult<()> {
        self.terms.iter().try_for_each(RollTerm::validate)
    }

    /// Returns true if any dice term in the tree carries an explode modifier.
    pub fn has_exploding_dice(&self) -> bool {
        self.terms.iter().any(|t| t.any_dice(&DiceTerm::explodes))
    }
}

/// A signed product of operand terms, e.g. the `- 1d6 * 2` in `3 - 1d6 * 2`.
#[derive(Debug, Clone)]
pub(crate) struct Run<'a> {
    pub(crate) sign: i64,
    /// `(position in the term list, term)` for every factor.
    pub(crate) factors: Vec<(usize, &'a RollTerm)>,
}

impl Run<'_> {
    pub(crate) fn value(&self) -> i64 {
        saturating_product(self.sign, self.factors.iter().map(|(_, t)| t.value()))
    }
}

/// `sign` times every factor, clamped to the `i64` range.
///
/// Accumulates in `i128` so the sign stays right after a factor saturates.
pub(crate) fn saturating_product(sign: i64, factors: impl Iterator<Item = i64>) -> i64 {
    let product = factors.fold(i128::from(sign), |acc, f| acc.saturating_mul(i128::from(f)));
    i64::try_from(product).unwrap_or(if product < 0 { i64::MIN } else { i64::MAX })
}

/// Split a term list into signed multiplicative runs.
///
/// Operands written next to each other without an operator are added.
pub(crate) fn additive_runs(terms: &[RollTerm]) -> Vec<Run<'_>> {
    let mut runs = Vec::new();
    let mut current: Option<Run<'_>> = None;
    let mut sign = 1;
    let mut pending_mul = false;

    for (pos, term) in terms.iter().enumerate() {
        match term {
            RollTerm::Operator(OperatorTerm { operator }) => match operator {
                Operator::Add | Operator::Sub => {
                    if let Some(run) = current.take() {
                        runs.push(run);
                    }
                    if *operator == Operator::Sub {
                        sign = -sign;
                    }
                    pending_mul = false;
                }
                Operator::Mul => pending_mul = true,
            },
            operand => {
                if let Some(run) = current.as_mut().filter(|_| pending_mul) {
                    run.factors.push((pos, operand));
                    pending_mul = false;
                    continue;
                }
                if let Some(run) = current.take() {
                    runs.push(run);
                }
                current = Some(Run {
                    sign,
                    factors: vec![(pos, operand)],
                });
                sign = 1;
                pending_mul = false;
            }
        }
    }
    if let Some(run) = current {
        runs.push(run);
    }
    runs
}

fn parse_keep_modifiers(modifiers: &[String]) -> MechResult<Option<(KeepKind, usize)>> {
    for raw in modifiers {
        let m = raw.trim().to_lowercase();
        let (kind, rest) = if let Some(rest) = m.strip_prefix("kh") {
            (KeepKind::KeepHighest, rest)
        } else if let Some(rest) = m.strip_prefix("kl") {
            (KeepKind::KeepLowest, rest)
        } else if let Some(rest) = m.strip_prefix('k') {
            (KeepKind::KeepHighest, rest)
        } else {
            continue;
        };
        let count = if rest.is_empty() {
            1
        } else {
            rest.parse::<usize>()
                .map_err(|_| MechError::InvalidTerm(format!("bad keep modifier '{raw}'")))?
        };
        return Ok(Some((kind, count)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(faces: u32, values: &[u32]) -> RollTerm {
        DiceTerm::new(faces, values).into()
    }

    #[test]
    fn huge_constants_saturate() {
        let roll = Roll::new(vec![
            d(6, &[3]),
            RollTerm::op(Operator::Mul),
            RollTerm::num(i64::MAX),
            RollTerm::op(Operator::Mul),
            RollTerm::num(2),
        ]);
        assert_eq!(roll.total(), i64::MAX);

        // The sign survives a saturated factor.
        let roll = Roll::new(vec![
            RollTerm::op(Operator::Sub),
            RollTerm::num(i64::MAX),
            RollTerm::op(Operator::Mul),
            RollTerm::num(2),
            RollTerm::op(Operator::Add),
            RollTerm::num(i64::MIN),
        ]);
        assert_eq!(roll.total(), i64::MIN);
    }

    #[test]
    fn total_respects_precedence() {
        // 2d6[3,4] + 2 * 3 - 1
        let roll = Roll::new(vec![
            d(6, &[3, 4]),
            RollTerm::op(Operator::Add),
            RollTerm::num(2),
            RollTerm::op(Operator::Mul),
            RollTerm::num(3),
            RollTerm::op(Operator::Sub),
            RollTerm::num(1),
        ]);
        assert_eq!(roll.total(), 12);
    }

    #[test]
    fn total_leading_minus() {
        let roll = Roll::new(vec![
            RollTerm::op(Operator::Sub),
            d(6, &[5]),
            RollTerm::op(Operator::Add),
            RollTerm::num(10),
        ]);
        assert_eq!(roll.total(), 5);
    }

    #[test]
    fn total_ignores_discarded_results() {
        let term = DiceTerm::from_results(20, vec![DieRoll::new(15), DieRoll::new(3).discarded()]);
        assert_eq!(Roll::new(vec![term.into()]).total(), 15);
    }

    #[test]
    fn pool_total_counts_active_alternatives() {
        let pool = PoolTerm::new([
            (Roll::new(vec![d(6, &[2, 3])]), false),
            (Roll::new(vec![d(6, &[6, 4])]), true),
        ])
        .with_modifier("kh");
        assert_eq!(pool.total(), 10);
        assert_eq!(pool.keep_modifier().unwrap(), Some((KeepKind::KeepHighest, 1)));
    }

    #[test]
    fn paren_total() {
        let inner = Roll::new(vec![d(4, &[3]), RollTerm::op(Operator::Add), RollTerm::num(1)]);
        let roll = Roll::new(vec![RollTerm::paren(inner), RollTerm::op(Operator::Mul), RollTerm::num(2)]);
        assert_eq!(roll.total(), 8);
    }

    #[test]
    fn keep_modifier_parsing() {
        let t = DiceTerm::new(6, &[1]).with_modifier("x").with_modifier("kl3");
        assert_eq!(t.keep_modifier().unwrap(), Some((KeepKind::KeepLowest, 3)));
        let t = DiceTerm::new(6, &[1]).with_modifier("k2");
        assert_eq!(t.keep_modifier().unwrap(), Some((KeepKind::KeepHighest, 2)));
        let t = DiceTerm::new(6, &[1]).with_modifier("x");
        assert_eq!(t.keep_modifier().unwrap(), None);
        let t = DiceTerm::new(6, &[1]).with_modifier("khx");
        assert!(t.keep_modifier().is_err());
    }

    #[test]
    fn explode_detection_is_tree_wide() {
        let inner = Roll::new(vec![DiceTerm::new(8, &[2]).with_modifier("x").into()]);
        let roll = Roll::new(vec![d(6, &[1]), RollTerm::op(Operator::Add), RollTerm::paren(inner)]);
        assert!(roll.has_exploding_dice());
        assert!(!Roll::new(vec![d(6, &[1])]).has_exploding_dice());
    }

    #[test]
    fn validate_rejects_zero_faces() {
        let roll = Roll::new(vec![DiceTerm::new(0, &[]).into()]);
        assert!(matches!(roll.validate(), Err(MechError::InvalidTerm(_))));
    }

    #[test]
    fn validate_rejects_out_of_range_result() {
        let roll = Roll::new(vec![d(6, &[7])]);
        assert!(matches!(roll.validate(), Err(MechError::InvalidTerm(_))));
    }

    #[test]
    fn json_shape() {
        let json = r#"[
            {"type": "dice", "faces": 6, "results": [{"result": 6, "exploded": true}, {"result": 2}], "modifiers": ["x"]},
            {"type": "operator", "operator": "+"},
            {"type": "numeric", "value": 3}
        ]"#;
        let roll: Roll = serde_json::from_str(json).unwrap();
        assert_eq!(roll.terms.len(), 3);
        assert_eq!(roll.total(), 11);
        assert!(roll.has_exploding_dice());
    }
}
