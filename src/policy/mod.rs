use crate::core::state::{Task, Ticks};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of the eight supported scheduling policies. Only the
/// quantum-based policies carry a quantum; the rest have no parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Policy {
    Fcfs,
    Sjf,
    Srtf,
    Priority,
    PriorityPreemptive,
    RoundRobin { quantum: Ticks },
    MultilevelQueue { quantum: Ticks },
    MultilevelFeedback { quantum: Ticks },
}

/// Shape of the ready-queue state a policy runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueTopology {
    /// One shared FIFO queue.
    SingleFifo,
    /// One shared min-keyed queue.
    SingleRanked,
    /// Three strictly ranked FIFO queues, Q1 > Q2 > Q3.
    Multilevel,
}

impl Policy {
    pub fn topology(&self) -> QueueTopology {
        match self {
            Policy::Fcfs | Policy::RoundRobin { .. } => QueueTopology::SingleFifo,
            Policy::Sjf | Policy::Srtf | Policy::Priority | Policy::PriorityPreemptive => {
                QueueTopology::SingleRanked
            }
            Policy::MultilevelQueue { .. } | Policy::MultilevelFeedback { .. } => {
                QueueTopology::Multilevel
            }
        }
    }

    /// Selection key for ranked queues; lower wins, ties fall back to
    /// enqueue order. None for head-selection policies.
    pub fn rank_key(&self, task: &Task) -> Option<u64> {
        match self {
            Policy::Sjf => Some(task.spec.burst_time),
            Policy::Srtf => Some(task.remaining_burst),
            Policy::Priority | Policy::PriorityPreemptive => task.spec.priority,
            _ => None,
        }
    }

    /// Whether a strictly better ranked key in the ready queue evicts the
    /// running task.
    pub fn preempts_on_better_key(&self) -> bool {
        matches!(self, Policy::Srtf | Policy::PriorityPreemptive)
    }

    /// Contiguous CPU units a task may hold at the given 0-based queue
    /// level before the slice rule fires. None means it runs to completion
    /// or preemption.
    pub fn slice_limit(&self, level: usize) -> Option<Ticks> {
        match (self, level) {
            (Policy::RoundRobin { quantum }, 0) => Some(*quantum),
            (Policy::MultilevelQueue { quantum }, 0) => Some(*quantum),
            (Policy::MultilevelFeedback { quantum }, 0) => Some(*quantum),
            (Policy::MultilevelFeedback { quantum }, 1) => Some(quantum * 2),
            _ => None,
        }
    }

    /// Slice expiry demotes (MLFQ) rather than requeueing at the same level
    /// (RR, MLQ Q1).
    pub fn demotes_on_expiry(&self) -> bool {
        matches!(self, Policy::MultilevelFeedback { .. })
    }

    /// 0-based queue an arriving task is admitted to.
    pub fn admission_level(&self, task: &Task) -> usize {
        match self {
            Policy::MultilevelQueue { .. } => task.queue_level - 1,
            _ => 0,
        }
    }

    pub fn quantum(&self) -> Option<Ticks> {
        match self {
            Policy::RoundRobin { quantum }
            | Policy::MultilevelQueue { quantum }
            | Policy::MultilevelFeedback { quantum } => Some(*quantum),
            _ => None,
        }
    }

    pub fn requires_priority(&self) -> bool {
        matches!(self, Policy::Priority | Policy::PriorityPreemptive)
    }

    pub fn uses_queue_level(&self) -> bool {
        matches!(self, Policy::MultilevelQueue { .. })
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Policy::Fcfs => "FCFS",
            Policy::Sjf => "SJF (Non-Preemptive)",
            Policy::Srtf => "SRTF",
            Policy::Priority => "Priority (Non-Preemptive)",
            Policy::PriorityPreemptive => "Priority (Preemptive)",
            Policy::RoundRobin { .. } => "Round Robin",
            Policy::MultilevelQueue { .. } => "Multilevel Queue (MLQ)",
            Policy::MultilevelFeedback { .. } => "Multilevel Feedback Queue (MLFQ)",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::Task;
    use crate::sim::process::ProcessSpec;

    fn task(burst: Ticks, priority: Option<u64>, queue_level: usize) -> Task {
        let spec = ProcessSpec {
            id: 1,
            arrival_time: 0,
            burst_time: burst,
            priority,
            queue_level: None,
        };
        let mut t = Task::new(0, spec, queue_level);
        t.remaining_burst = burst.saturating_sub(1);
        t
    }

    #[test]
    fn rank_keys_follow_selection_rules() {
        let t = task(7, Some(2), 1);
        assert_eq!(Policy::Sjf.rank_key(&t), Some(7));
        assert_eq!(Policy::Srtf.rank_key(&t), Some(6));
        assert_eq!(Policy::Priority.rank_key(&t), Some(2));
        assert_eq!(Policy::Fcfs.rank_key(&t), None);
    }

    #[test]
    fn slice_limits_per_level() {
        let mlfq = Policy::MultilevelFeedback { quantum: 3 };
        assert_eq!(mlfq.slice_limit(0), Some(3));
        assert_eq!(mlfq.slice_limit(1), Some(6));
        assert_eq!(mlfq.slice_limit(2), None);

        let mlq = Policy::MultilevelQueue { quantum: 3 };
        assert_eq!(mlq.slice_limit(0), Some(3));
        assert_eq!(mlq.slice_limit(1), None);

        assert_eq!(Policy::RoundRobin { quantum: 4 }.slice_limit(0), Some(4));
        assert_eq!(Policy::Fcfs.slice_limit(0), None);
    }

    #[test]
    fn admission_levels() {
        let t = task(5, None, 2);
        assert_eq!(Policy::MultilevelQueue { quantum: 2 }.admission_level(&t), 1);
        // MLFQ always admits to Q1 regardless of the task's current level.
        assert_eq!(
            Policy::MultilevelFeedback { quantum: 2 }.admission_level(&t),
            0
        );
        assert_eq!(Policy::Fcfs.admission_level(&t), 0);
    }
}
