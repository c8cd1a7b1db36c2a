use crate::core::state::{Task, Ticks};
use crate::error::SimError;
use crate::policy::Policy;
use serde::{Deserialize, Serialize};

/// Immutable process descriptor supplied by the caller. `priority` is only
/// consulted by the priority policies (lower = more urgent); `queue_level`
/// only by MLQ, defaulting to the lowest queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub id: u64,
    pub arrival_time: Ticks,
    pub burst_time: Ticks,
    #[serde(default)]
    pub priority: Option<u64>,
    #[serde(default)]
    pub queue_level: Option<u8>,
}

pub const DEFAULT_QUEUE_LEVEL: u8 = 3;

impl ProcessSpec {
    /// Short display id: "P" plus the last four decimal digits of the raw
    /// id. Callers tend to use timestamps or counters as ids; the tail is
    /// enough to tell processes apart on screen.
    pub fn label(&self) -> String {
        let digits = self.id.to_string();
        let tail = &digits[digits.len().saturating_sub(4)..];
        format!("P{tail}")
    }
}

/// Validates descriptors against the chosen policy and derives the per-run
/// task records. All invalid-input classes are rejected here, before the
/// simulation starts.
pub fn normalize(specs: &[ProcessSpec], policy: Policy) -> Result<Vec<Task>, SimError> {
    if policy.quantum() == Some(0) {
        return Err(SimError::NonPositiveQuantum { policy });
    }

    let mut tasks = Vec::with_capacity(specs.len());
    for (id, spec) in specs.iter().enumerate() {
        if spec.burst_time == 0 {
            return Err(SimError::ZeroBurst { id: spec.id });
        }
        if policy.requires_priority() && spec.priority.is_none() {
            return Err(SimError::MissingPriority { id: spec.id, policy });
        }
        if let Some(level) = spec.queue_level {
            if !(1..=3).contains(&level) {
                return Err(SimError::QueueLevelOutOfRange { id: spec.id, level });
            }
        }

        let queue_level = match policy {
            Policy::MultilevelQueue { .. } => {
                spec.queue_level.unwrap_or(DEFAULT_QUEUE_LEVEL) as usize
            }
            // MLFQ tasks always start at the top queue.
            _ => 1,
        };
        tasks.push(Task::new(id, spec.clone(), queue_level));
    }
    Ok(tasks)
}
