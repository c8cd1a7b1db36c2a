use super::process::{normalize, ProcessSpec};
use crate::core::driver::SchedCore;
use crate::core::state::Ticks;
use crate::core::timeline::{Occupant, TimelineBlock};
use crate::error::SimError;
use crate::policy::Policy;
use crate::stats::{aggregate, Averages, ProcessStats};
use serde::Serialize;

/// Ceiling on simulated time; pathological input aborts with
/// [`SimError::Runaway`] instead of looping forever.
pub const DEFAULT_TICK_LIMIT: Ticks = 20_000;

/// Full result of a run: the execution timeline, per-process figures in
/// input order, and the rounded averages. Timeline occupants index into
/// `stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub timeline: Vec<TimelineBlock>,
    pub stats: Vec<ProcessStats>,
    pub averages: Averages,
}

/// Observable state after one step: everything an external presentation
/// layer needs to render live queue/CPU state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub timeline: Vec<TimelineBlock>,
    /// Labels per queue level, in selection order. One entry for
    /// single-queue policies, three for MLQ/MLFQ.
    pub ready_queues: Vec<Vec<String>>,
    /// Label of the running process, or None while the CPU is idle.
    pub running: Option<String>,
    pub now: Ticks,
    pub all_complete: bool,
}

/// A single simulation run. Batch mode (`run`) and externally clocked step
/// mode (`step`) share the same tick engine, so their results are
/// identical. A `Sim` is single-use: reset means dropping it and building
/// a new one.
pub struct Sim {
    core: SchedCore,
    tick_limit: Ticks,
}

impl Sim {
    /// Validates the descriptors against the policy and prepares a run at
    /// t = 0. All invalid-input errors surface here, never mid-simulation.
    pub fn new(specs: &[ProcessSpec], policy: Policy) -> Result<Self, SimError> {
        let tasks = normalize(specs, policy)?;
        log::debug!("new {policy} run with {} processes", tasks.len());
        Ok(Self {
            core: SchedCore::new(tasks, policy),
            tick_limit: DEFAULT_TICK_LIMIT,
        })
    }

    pub fn with_tick_limit(mut self, limit: Ticks) -> Self {
        self.tick_limit = limit;
        self
    }

    pub fn policy(&self) -> Policy {
        self.core.policy
    }

    pub fn all_complete(&self) -> bool {
        self.core.ctx.all_complete()
    }

    /// Runs the simulation to completion. Unit-steps the shared tick
    /// engine, fast-forwarding over pure idle gaps: with the CPU idle and
    /// every queue empty, no task state can change until the next arrival,
    /// so the jump is statistics-preserving.
    pub fn run(mut self) -> Result<BatchResult, SimError> {
        while !self.core.ctx.all_complete() {
            if self.core.ctx.now >= self.tick_limit {
                return Err(SimError::Runaway {
                    limit: self.tick_limit,
                });
            }
            self.core.tick();
            self.skip_idle_gap();
        }
        Ok(self.into_result())
    }

    /// Performs exactly one simulated time unit and returns the observable
    /// state. Stepping a completed simulation is a no-op returning the
    /// final snapshot. The caller must apply each returned state before
    /// invoking the next step; `Sim` is not meant to be shared.
    pub fn step(&mut self) -> Result<StepResult, SimError> {
        if self.core.ctx.all_complete() {
            return Ok(self.snapshot());
        }
        if self.core.ctx.now >= self.tick_limit {
            return Err(SimError::Runaway {
                limit: self.tick_limit,
            });
        }
        self.core.tick();
        Ok(self.snapshot())
    }

    /// Current observable state without advancing time.
    pub fn snapshot(&self) -> StepResult {
        let ctx = &self.core.ctx;
        let ready_queues = ctx
            .queues
            .iter()
            .map(|q| q.ids().iter().map(|&id| ctx.task(id).label.clone()).collect())
            .collect();
        StepResult {
            timeline: ctx.timeline.blocks().to_vec(),
            ready_queues,
            running: ctx.running.map(|id| ctx.task(id).label.clone()),
            now: ctx.now,
            all_complete: ctx.all_complete(),
        }
    }

    /// Batch-shaped result of a completed run; None while work remains.
    pub fn result(&self) -> Option<BatchResult> {
        if !self.core.ctx.all_complete() {
            return None;
        }
        let (stats, averages) = aggregate(&self.core.ctx.tasks);
        Some(BatchResult {
            timeline: self.core.ctx.timeline.blocks().to_vec(),
            stats,
            averages,
        })
    }

    fn into_result(self) -> BatchResult {
        let (stats, averages) = aggregate(&self.core.ctx.tasks);
        BatchResult {
            timeline: self.core.ctx.timeline.blocks().to_vec(),
            stats,
            averages,
        }
    }

    /// CPU idle, queues empty, work remains: jump straight to the next
    /// arrival, recording the gap as one idle block.
    fn skip_idle_gap(&mut self) {
        let ctx = &mut self.core.ctx;
        if ctx.running.is_some() || !ctx.all_queues_empty() || ctx.all_complete() {
            return;
        }
        if let Some(next) = ctx.next_arrival() {
            if next > ctx.now {
                ctx.timeline.record(Occupant::Idle, ctx.now, next);
                log::trace!("idle skip {} -> {}", ctx.now, next);
                ctx.now = next;
            }
        }
    }
}

/// Convenience wrapper: validate, run to completion, return the result.
pub fn run_batch(specs: &[ProcessSpec], policy: Policy) -> Result<BatchResult, SimError> {
    Sim::new(specs, policy)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u64, arrival: Ticks, burst: Ticks) -> ProcessSpec {
        ProcessSpec {
            id,
            arrival_time: arrival,
            burst_time: burst,
            priority: None,
            queue_level: None,
        }
    }

    fn with_priority(mut spec: ProcessSpec, priority: u64) -> ProcessSpec {
        spec.priority = Some(priority);
        spec
    }

    fn with_level(mut spec: ProcessSpec, level: u8) -> ProcessSpec {
        spec.queue_level = Some(level);
        spec
    }

    /// (occupant-index-or-None, start, end) triples for terse assertions.
    fn shape(result: &BatchResult) -> Vec<(Option<usize>, Ticks, Ticks)> {
        result
            .timeline
            .iter()
            .map(|b| {
                let who = match b.occupant {
                    Occupant::Idle => None,
                    Occupant::Proc { id } => Some(id),
                };
                (who, b.start, b.end)
            })
            .collect()
    }

    #[test]
    fn fcfs_runs_in_arrival_order() {
        let result = run_batch(&[p(1, 0, 5), p(2, 1, 3)], Policy::Fcfs).unwrap();

        assert_eq!(shape(&result), vec![(Some(0), 0, 5), (Some(1), 5, 8)]);
        assert_eq!(result.stats[0].waiting_time, 0);
        assert_eq!(result.stats[1].waiting_time, 4);
        assert_eq!(result.averages.waiting_time, 2.00);
        assert_eq!(result.averages.turnaround_time, 6.00);
    }

    #[test]
    fn fcfs_records_idle_gap_before_late_arrival() {
        let result = run_batch(&[p(1, 3, 2)], Policy::Fcfs).unwrap();
        assert_eq!(shape(&result), vec![(None, 0, 3), (Some(0), 3, 5)]);
        assert_eq!(result.stats[0].waiting_time, 0);
    }

    #[test]
    fn round_robin_rotates_on_quantum_expiry() {
        let result = run_batch(
            &[p(1, 0, 4), p(2, 1, 3)],
            Policy::RoundRobin { quantum: 2 },
        )
        .unwrap();

        assert_eq!(
            shape(&result),
            vec![(Some(0), 0, 2), (Some(1), 2, 4), (Some(0), 4, 6), (Some(1), 6, 7)]
        );
    }

    #[test]
    fn srtf_preempts_on_shorter_remaining_burst() {
        let result = run_batch(&[p(1, 0, 8), p(2, 1, 4)], Policy::Srtf).unwrap();

        assert_eq!(
            shape(&result),
            vec![(Some(0), 0, 1), (Some(1), 1, 5), (Some(0), 5, 12)]
        );
        assert_eq!(result.stats[0].completion_time, 12);
        assert_eq!(result.stats[1].completion_time, 5);
        assert_eq!(result.stats[1].waiting_time, 0);
    }

    #[test]
    fn sjf_is_non_preemptive_and_ties_break_by_arrival() {
        // P2 and P3 have equal bursts; P2 arrived first and must win the tie.
        let result = run_batch(&[p(1, 0, 4), p(2, 1, 2), p(3, 2, 2)], Policy::Sjf).unwrap();
        assert_eq!(
            shape(&result),
            vec![(Some(0), 0, 4), (Some(1), 4, 6), (Some(2), 6, 8)]
        );
    }

    #[test]
    fn priority_nonpreemptive_waits_for_the_running_burst() {
        let specs = [with_priority(p(1, 0, 5), 2), with_priority(p(2, 1, 2), 0)];
        let result = run_batch(&specs, Policy::Priority).unwrap();
        assert_eq!(shape(&result), vec![(Some(0), 0, 5), (Some(1), 5, 7)]);
    }

    #[test]
    fn priority_preemptive_evicts_on_more_urgent_arrival() {
        let specs = [with_priority(p(1, 0, 5), 2), with_priority(p(2, 1, 2), 0)];
        let result = run_batch(&specs, Policy::PriorityPreemptive).unwrap();
        // P1 runs one unit before eviction, so its remaining four finish
        // over [3, 7).
        assert_eq!(
            shape(&result),
            vec![(Some(0), 0, 1), (Some(1), 1, 3), (Some(0), 3, 7)]
        );
        assert_eq!(result.stats[0].completion_time, 7);
        assert_eq!(result.stats[0].waiting_time, 2);
        assert_eq!(result.stats[1].completion_time, 3);
    }

    #[test]
    fn mlq_higher_queue_arrival_preempts_lower_queue_task() {
        let specs = [with_level(p(1, 0, 5), 3), with_level(p(2, 2, 2), 1)];
        let result = run_batch(&specs, Policy::MultilevelQueue { quantum: 2 }).unwrap();

        assert_eq!(
            shape(&result),
            vec![(Some(0), 0, 2), (Some(1), 2, 4), (Some(0), 4, 7)]
        );
        assert_eq!(result.stats[0].waiting_time, 2);
        assert_eq!(result.stats[1].waiting_time, 0);
    }

    #[test]
    fn mlq_q1_runs_round_robin() {
        let specs = [with_level(p(1, 0, 3), 1), with_level(p(2, 0, 3), 1)];
        let result = run_batch(&specs, Policy::MultilevelQueue { quantum: 2 }).unwrap();

        assert_eq!(
            shape(&result),
            vec![(Some(0), 0, 2), (Some(1), 2, 4), (Some(0), 4, 5), (Some(1), 5, 6)]
        );
    }

    #[test]
    fn mlfq_demotes_through_the_levels() {
        // quantum 2: 2 units in Q1, 4 in Q2, the last 2 uninterrupted in Q3.
        let mut sim = Sim::new(&[p(1, 0, 8)], Policy::MultilevelFeedback { quantum: 2 }).unwrap();

        let mut demoted_to_q2_at = None;
        let mut demoted_to_q3_at = None;
        while !sim.all_complete() {
            let view = sim.step().unwrap();
            if !view.ready_queues[1].is_empty() && demoted_to_q2_at.is_none() {
                demoted_to_q2_at = Some(view.now);
            }
            if !view.ready_queues[2].is_empty() && demoted_to_q3_at.is_none() {
                demoted_to_q3_at = Some(view.now);
            }
        }

        assert_eq!(demoted_to_q2_at, Some(2));
        assert_eq!(demoted_to_q3_at, Some(6));

        let result = sim.result().unwrap();
        // A lone process is never preempted by anyone, so the timeline is
        // one solid block despite the demotions.
        assert_eq!(shape(&result), vec![(Some(0), 0, 8)]);
        assert_eq!(result.stats[0].completion_time, 8);
        assert_eq!(result.stats[0].waiting_time, 0);
    }

    #[test]
    fn empty_process_set_yields_zero_result() {
        let result = run_batch(&[], Policy::RoundRobin { quantum: 2 }).unwrap();
        assert!(result.timeline.is_empty());
        assert!(result.stats.is_empty());
        assert_eq!(result.averages, Averages::ZERO);
    }

    #[test]
    fn batch_run_is_idempotent() {
        let specs = [p(1, 0, 4), p(2, 1, 6), p(3, 9, 2)];
        let a = run_batch(&specs, Policy::Srtf).unwrap();
        let b = run_batch(&specs, Policy::Srtf).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn exceeding_the_tick_limit_is_a_runaway() {
        let err = Sim::new(&[p(1, 0, 50)], Policy::Fcfs)
            .unwrap()
            .with_tick_limit(10)
            .run()
            .unwrap_err();
        assert_eq!(err, SimError::Runaway { limit: 10 });
    }

    #[test]
    fn step_mode_hits_the_same_tick_limit() {
        let mut sim = Sim::new(&[p(1, 0, 50)], Policy::Fcfs)
            .unwrap()
            .with_tick_limit(10);
        for _ in 0..10 {
            sim.step().unwrap();
        }
        assert_eq!(sim.step().unwrap_err(), SimError::Runaway { limit: 10 });
    }

    #[test]
    fn stepping_a_completed_run_is_a_no_op() {
        let mut sim = Sim::new(&[p(1, 0, 2)], Policy::Fcfs).unwrap();
        let done = loop {
            let view = sim.step().unwrap();
            if view.all_complete {
                break view;
            }
        };
        let again = sim.step().unwrap();
        assert_eq!(done, again);
        assert_eq!(again.now, 2);
    }

    #[test]
    fn step_exposes_live_queue_and_cpu_state() {
        let mut sim = Sim::new(&[p(11, 0, 3), p(12, 0, 3)], Policy::Fcfs).unwrap();
        let view = sim.step().unwrap();
        assert_eq!(view.running.as_deref(), Some("P11"));
        assert_eq!(view.ready_queues, vec![vec!["P12".to_string()]]);
        assert_eq!(view.now, 1);
        assert!(!view.all_complete);
    }
}
