use crate::core::state::{Task, Ticks};
use average::{Estimate, Mean};
use serde::Serialize;

/// Per-process results: the descriptor fields echoed back plus the derived
/// timing figures. Ordered like the input descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    pub id: u64,
    pub label: String,
    pub arrival_time: Ticks,
    pub burst_time: Ticks,
    pub priority: Option<u64>,
    pub queue_level: Option<u8>,
    pub completion_time: Ticks,
    pub turnaround_time: Ticks,
    pub waiting_time: Ticks,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Averages {
    pub waiting_time: f64,
    pub turnaround_time: f64,
}

impl Averages {
    pub const ZERO: Averages = Averages {
        waiting_time: 0.0,
        turnaround_time: 0.0,
    };
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Collapses a completed task table into per-process stats and 2-decimal
/// mean waiting/turnaround times. An empty table yields zero averages.
pub(crate) fn aggregate(tasks: &[Task]) -> (Vec<ProcessStats>, Averages) {
    let stats: Vec<ProcessStats> = tasks
        .iter()
        .map(|task| {
            let completion_time = task
                .completion_time
                .expect("aggregating a task that never completed");
            let turnaround_time = completion_time - task.spec.arrival_time;
            ProcessStats {
                id: task.spec.id,
                label: task.label.clone(),
                arrival_time: task.spec.arrival_time,
                burst_time: task.spec.burst_time,
                priority: task.spec.priority,
                queue_level: task.spec.queue_level,
                completion_time,
                turnaround_time,
                waiting_time: task.waiting_time,
            }
        })
        .collect();

    if stats.is_empty() {
        return (stats, Averages::ZERO);
    }

    let waiting: Mean = stats.iter().map(|s| s.waiting_time as f64).collect();
    let turnaround: Mean = stats.iter().map(|s| s.turnaround_time as f64).collect();
    let averages = Averages {
        waiting_time: round2(waiting.estimate()),
        turnaround_time: round2(turnaround.estimate()),
    };
    (stats, averages)
}
