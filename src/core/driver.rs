use super::observer::Observer;
use super::state::{ProcId, SimCtx, Task, TaskState, Ticks};
use super::timeline::Occupant;
use crate::policy::Policy;

/// The tick engine: one simulated time unit per call. Both the batch runner
/// and the externally clocked step mode drive this same routine, so the two
/// modes cannot diverge.
pub struct SchedCore {
    pub ctx: SimCtx,
    pub policy: Policy,
    observer: Observer,
}

impl SchedCore {
    pub fn new(tasks: Vec<Task>, policy: Policy) -> Self {
        let ctx = SimCtx::new(tasks, policy.topology());
        Self {
            ctx,
            policy,
            observer: Observer::new(),
        }
    }

    /// Performs one unit of work covering [now, now + 1): admissions,
    /// preemption, dispatch, one unit of service, waiting accrual, demotion.
    /// Returns the task that completed this tick, if any.
    pub fn tick(&mut self) -> Option<ProcId> {
        let now = self.ctx.now;

        self.admit_arrivals(now);
        self.check_preemption();
        if self.ctx.running.is_none() {
            self.dispatch();
        }

        let occupant = match self.ctx.running {
            Some(id) => Occupant::Proc { id },
            None => Occupant::Idle,
        };
        self.ctx.timeline.record(occupant, now, now + 1);

        let completed = self.run_unit(now);
        // The task demoted below ran this unit, so waiting accrues first.
        self.ctx.accrue_waiting();
        self.apply_demotion();

        self.ctx.now = now + 1;
        self.observer.observe(&self.ctx);
        completed
    }

    /// Admits every task whose arrival time has been reached. Runs before
    /// the slice-expiry requeue, so a boundary arrival queues ahead of the
    /// preempted task.
    fn admit_arrivals(&mut self, now: Ticks) {
        while let Some(id) = self.ctx.pop_arrival(now) {
            debug_assert_eq!(self.ctx.task(id).state, TaskState::NotArrived);
            let level = self.policy.admission_level(self.ctx.task(id));
            let key = self.policy.rank_key(self.ctx.task(id));
            self.ctx.enqueue(id, level, key);
            log::trace!("t={now} admit {} to Q{}", self.ctx.task(id).label, level + 1);
        }
    }

    /// Evaluates the per-policy preemption predicate against the running
    /// task and requeues it at its own level's tail when triggered.
    fn check_preemption(&mut self) {
        let Some(running) = self.ctx.running else {
            return;
        };

        let evict = if self.policy.preempts_on_better_key() {
            let running_key = self
                .policy
                .rank_key(self.ctx.task(running))
                .expect("preemptive ranked policy task missing a rank key");
            self.ctx.queues[0]
                .peek_key()
                .is_some_and(|best| best < running_key)
        } else {
            let level = self.running_level(running);
            let higher_nonempty = self
                .ctx
                .highest_nonempty_level()
                .is_some_and(|h| h < level);
            let slice_expired = self
                .policy
                .slice_limit(level)
                .is_some_and(|limit| self.ctx.slice >= limit && !self.policy.demotes_on_expiry());
            higher_nonempty || slice_expired
        };

        if evict {
            log::debug!(
                "t={} preempt {}",
                self.ctx.now,
                self.ctx.task(running).label
            );
            self.requeue(running);
        }
    }

    /// Gives the idle CPU to the best ready task, if any.
    fn dispatch(&mut self) {
        let Some(level) = self.ctx.highest_nonempty_level() else {
            return;
        };
        if let Some(id) = self.ctx.dequeue(level) {
            self.ctx.set_running(id);
            log::trace!(
                "t={} dispatch {} from Q{}",
                self.ctx.now,
                self.ctx.task(id).label,
                level + 1
            );
        }
    }

    /// One unit of service for the running task; completes it when its
    /// burst is exhausted.
    fn run_unit(&mut self, now: Ticks) -> Option<ProcId> {
        let id = self.ctx.running?;
        self.ctx.slice += 1;
        let task = self.ctx.task_mut(id);
        task.remaining_burst -= 1;

        if task.remaining_burst == 0 {
            let id = self.ctx.complete_running(now + 1);
            log::debug!(
                "t={} complete {} (turnaround {})",
                now + 1,
                self.ctx.task(id).label,
                self.ctx.task(id).turnaround_time().unwrap_or(0)
            );
            return Some(id);
        }
        None
    }

    /// MLFQ only: a task that exhausted its own level's slice drops one
    /// level and requeues there. Q3 has no slice, so level never exceeds 3.
    fn apply_demotion(&mut self) {
        if !self.policy.demotes_on_expiry() {
            return;
        }
        let Some(running) = self.ctx.running else {
            return;
        };
        let level = self.running_level(running);
        if self
            .policy
            .slice_limit(level)
            .is_some_and(|limit| self.ctx.slice >= limit)
        {
            let next_tick = self.ctx.now + 1;
            let task = self.ctx.task_mut(running);
            task.queue_level += 1;
            let new_level = task.queue_level - 1;
            log::debug!(
                "t={next_tick} demote {} to Q{}",
                task.label,
                new_level + 1
            );
            self.ctx.running = None;
            self.ctx.slice = 0;
            self.ctx.enqueue(running, new_level, None);
        }
    }

    fn requeue(&mut self, id: ProcId) {
        self.ctx.running = None;
        self.ctx.slice = 0;
        let level = self.running_level(id);
        let key = self.policy.rank_key(self.ctx.task(id));
        self.ctx.enqueue(id, level, key);
    }

    /// 0-based queue the given task belongs to (single queue, or its
    /// current multilevel position).
    fn running_level(&self, id: ProcId) -> usize {
        match self.policy.topology() {
            crate::policy::QueueTopology::Multilevel => self.ctx.task(id).queue_level - 1,
            _ => 0,
        }
    }
}
