//! Keep rules: "keep highest/lowest N" over dice or over pool groups.

use serde::{Deserialize, Serialize};

use crate::error::{MechError, MechResult};

/// Which end of the sorted results is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeepKind {
    /// Keep the highest entries (`kh`).
    KeepHighest,
    /// Keep the lowest entries (`kl`).
    KeepLowest,
}

impl KeepKind {
    /// Parse a kind from its modifier tag (`kh` or `kl`).
    pub fn parse(tag: &str) -> MechResult<Self> {
        match tag.trim().to_lowercase().as_str() {
            "kh" => Ok(Self::KeepHighest),
            "kl" => Ok(Self::KeepLowest),
            other => Err(MechError::InvalidKeepRule(format!(
                "unknown kind '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for KeepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepHighest => write!(f, "kh"),
            Self::KeepLowest => write!(f, "kl"),
        }
    }
}

/// Whether a keep rule ranks individual dice or whole pool alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeepScope {
    /// Rank individual dice (`4d6kh3`).
    #[default]
    Die,
    /// Rank pool alternatives by their summed value (`{2d6,2d6}kh`).
    Group,
}

/// An immutable "keep highest/lowest N" rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepRule {
    kind: KeepKind,
    count: usize,
    scope: KeepScope,
}

impl KeepRule {
    /// Create a rule from already-validated parts.
    pub fn new(kind: KeepKind, count: usize, scope: KeepScope) -> Self {
        Self { kind, count, scope }
    }

    /// Create a rule from raw input, rejecting unknown kinds and negative counts.
    pub fn try_from_parts(kind: &str, count: i64, scope: KeepScope) -> MechResult<Self> {
        let kind = KeepKind::parse(kind)?;
        let count = usize::try_from(count)
            .map_err(|_| MechError::InvalidKeepRule(format!("negative count {count}")))?;
        Ok(Self::new(kind, count, scope))
    }

    /// Keep-highest rule over `total` individual dice, i.e. keep everything.
    pub fn keep_all(total: usize) -> Self {
        Self::new(KeepKind::KeepHighest, total, KeepScope::Die)
    }

    /// The rule's kind.
    pub fn kind(&self) -> KeepKind {
        self.kind
    }

    /// How many dice or groups are kept.
    pub fn count(&self) -> usize {
        self.count
    }

    /// The rule's scope.
    pub fn scope(&self) -> KeepScope {
        self.scope
    }

    /// Returns true if keeping `count` of `total` entries keeps all of them.
    pub fn is_keep_all(&self, total: usize) -> bool {
        self.count == total
    }

    /// Returns true for keep-highest rules.
    pub fn is_highest(&self) -> bool {
        self.kind == KeepKind::KeepHighest
    }

    /// Indices of the kept entries, best first.
    ///
    /// Entries are ranked descending for keep-highest and ascending for
    /// keep-lowest. The sort is stable, so equal entries keep input order.
    pub fn select<T: Ord>(&self, entries: &[T]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..entries.len()).collect();
        match self.kind {
            KeepKind::KeepHighest => order.sort_by(|&a, &b| entries[b].cmp(&entries[a])),
            KeepKind::KeepLowest => order.sort_by(|&a, &b| entries[a].cmp(&entries[b])),
        }
        order.truncate(self.count);
        order
    }
}

impl std::fmt::Display for KeepRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind, self.count)
    }
}
