use super::state::{SimCtx, TaskState};

/// Invariant checks run after every tick. All checks are debug_asserts, so
/// release builds pay nothing.
#[derive(Debug)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn observe(&mut self, ctx: &SimCtx) {
        self.step += 1;

        if let Some(id) = ctx.running {
            let task = ctx.task(id);
            debug_assert_eq!(
                task.state,
                TaskState::Running,
                "running slot holds task {id} in state {:?}",
                task.state
            );
            debug_assert!(
                !ctx.task_to_queue.contains_key(&id),
                "running task {id} still present in a ready queue"
            );
        }

        for (&id, &level) in &ctx.task_to_queue {
            let task = ctx.task(id);
            debug_assert_eq!(
                task.state,
                TaskState::Ready,
                "queued task {id} in state {:?}",
                task.state
            );
            debug_assert!(
                ctx.queues[level].contains(id),
                "task_to_queue claims task {id} in Q{}, but the queue lacks it",
                level + 1
            );
        }

        // Every task is in exactly one of {not arrived, ready, running,
        // completed}, consistent with the structures holding it.
        for task in &ctx.tasks {
            match task.state {
                TaskState::NotArrived | TaskState::Completed => {
                    debug_assert!(
                        !ctx.task_to_queue.contains_key(&task.id) && ctx.running != Some(task.id),
                        "task {} in state {:?} is still scheduled",
                        task.id,
                        task.state
                    );
                }
                TaskState::Ready => {
                    debug_assert!(
                        ctx.task_to_queue.contains_key(&task.id),
                        "ready task {} is in no queue",
                        task.id
                    );
                }
                TaskState::Running => {
                    debug_assert_eq!(ctx.running, Some(task.id));
                }
            }
            debug_assert_eq!(
                task.remaining_burst == 0,
                task.state == TaskState::Completed,
                "task {} remaining burst inconsistent with completion",
                task.id
            );
        }

        debug_assert_eq!(
            ctx.timeline.total_duration(),
            ctx.now,
            "timeline duration must track simulated time"
        );
    }
}
