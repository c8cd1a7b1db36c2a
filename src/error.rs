use crate::core::state::Ticks;
use crate::policy::Policy;
use thiserror::Error;

/// Failures are scoped to the current run; building a fresh [`crate::Sim`]
/// always recovers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("process {id}: burst time must be positive")]
    ZeroBurst { id: u64 },

    #[error("process {id}: priority is required under {policy}")]
    MissingPriority { id: u64, policy: Policy },

    #[error("process {id}: queue level {level} is outside 1..=3")]
    QueueLevelOutOfRange { id: u64, level: u8 },

    #[error("{policy} requires a positive quantum")]
    NonPositiveQuantum { policy: Policy },

    #[error("simulation exceeded {limit} ticks without completing")]
    Runaway { limit: Ticks },
}
