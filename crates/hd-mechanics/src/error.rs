//! Error types for the heroic dice engine.

/// Errors that can occur while analyzing a roll or allocating heroic dice.
#[derive(Debug, thiserror::Error)]
pub enum MechError {
    /// A keep rule was constructed from an unknown kind or a negative count.
    #[error("invalid keep rule: {0}")]
    InvalidKeepRule(String),

    /// A roll term is malformed (zero faces, out-of-range result, ...).
    #[error("invalid roll term: {0}")]
    InvalidTerm(String),

    /// The actor does not hold enough heroic dice for the request.
    #[error("insufficient heroic dice: requested {requested}, available {available}")]
    InsufficientHeroDice {
        /// Number of heroic dice the caller asked to spend.
        requested: u32,
        /// Number of heroic dice the actor currently holds.
        available: u32,
    },

    /// A scripted roller ran out of predetermined values.
    #[error("dice roller exhausted after {0} values")]
    RollerExhausted(usize),

    /// The dice-rolling collaborator failed.
    #[error("dice roller error: {0}")]
    Roller(String),

    /// The actor resource collaborator failed.
    #[error("resource error: {0}")]
    Resource(String),
}

/// Convenience result type for mechanics operations.
pub type MechResult<T> = Result<T, MechError>;
