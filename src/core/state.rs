use crate::policy::QueueTopology;
use crate::sim::process::ProcessSpec;
use keyed_priority_queue::KeyedPriorityQueue;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

// Index into the task Vec
pub type ProcId = usize;
pub type Ticks = u64;

pub const QUEUE_LEVELS: usize = 3;

/// Rank of a task in a keyed ready queue. KeyedPriorityQueue is a max-heap,
/// so Ord is flipped: the smallest (key, seq) pair wins. `seq` is a
/// monotonic enqueue counter, which makes ties resolve in arrival-into-queue
/// order.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct Rank {
    pub key: u64,
    pub seq: u64,
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (other.key, other.seq).cmp(&(self.key, self.seq))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    NotArrived,
    Ready,
    Running,
    Completed,
}

/// Per-run mutable state wrapping an immutable descriptor.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: ProcId,
    pub spec: ProcessSpec,
    /// Short display id derived from the descriptor id.
    pub label: String,
    pub state: TaskState,
    /// 1-based. Fixed for MLQ; starts at 1 and only grows for MLFQ.
    pub queue_level: usize,
    pub remaining_burst: Ticks,
    /// Accrued one unit per tick spent in a ready queue, never while running.
    pub waiting_time: Ticks,
    pub completion_time: Option<Ticks>,
}

impl Task {
    pub fn new(id: ProcId, spec: ProcessSpec, queue_level: usize) -> Self {
        let label = spec.label();
        let remaining_burst = spec.burst_time;
        Self {
            id,
            spec,
            label,
            state: TaskState::NotArrived,
            queue_level,
            remaining_burst,
            waiting_time: 0,
            completion_time: None,
        }
    }

    pub fn turnaround_time(&self) -> Option<Ticks> {
        self.completion_time.map(|ct| ct - self.spec.arrival_time)
    }
}

#[derive(Debug)]
pub enum ReadyQueue {
    Fifo { tasks: VecDeque<ProcId> },
    Ranked { tasks: KeyedPriorityQueue<ProcId, Rank> },
}

impl ReadyQueue {
    pub fn new_fifo() -> Self {
        Self::Fifo {
            tasks: VecDeque::new(),
        }
    }

    pub fn new_ranked() -> Self {
        Self::Ranked {
            tasks: KeyedPriorityQueue::new(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Fifo { tasks } => tasks.len(),
            Self::Ranked { tasks } => tasks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ProcId) -> bool {
        match self {
            Self::Fifo { tasks } => tasks.contains(&id),
            Self::Ranked { tasks } => tasks.iter().any(|t| *t.0 == id),
        }
    }

    /// Best ranked key currently queued. None for FIFO or empty queues.
    pub fn peek_key(&self) -> Option<u64> {
        match self {
            Self::Fifo { .. } => None,
            Self::Ranked { tasks } => tasks.peek().map(|(_, rank)| rank.key),
        }
    }

    pub fn pop(&mut self) -> Option<ProcId> {
        match self {
            Self::Fifo { tasks } => tasks.pop_front(),
            Self::Ranked { tasks } => tasks.pop().map(|t| t.0),
        }
    }

    /// Queue contents in selection order: FIFO order, or ascending rank.
    pub fn ids(&self) -> Vec<ProcId> {
        match self {
            Self::Fifo { tasks } => tasks.iter().copied().collect(),
            Self::Ranked { tasks } => {
                let mut entries: Vec<(ProcId, Rank)> =
                    tasks.iter().map(|(id, rank)| (*id, *rank)).collect();
                entries.sort_by_key(|(_, rank)| (rank.key, rank.seq));
                entries.into_iter().map(|(id, _)| id).collect()
            }
        }
    }

    fn push(&mut self, id: ProcId, rank: Option<Rank>) {
        match self {
            Self::Fifo { tasks } => tasks.push_back(id),
            Self::Ranked { tasks } => {
                tasks.push(id, rank.expect("ranked queue push without a rank"));
            }
        }
    }
}

/// All mutable simulation state: the ready queues, running slot, slice
/// counter, timeline and task table. Owned by the tick engine; external
/// drivers see it only through snapshots.
#[derive(Debug)]
pub struct SimCtx {
    pub now: Ticks,
    pub tasks: Vec<Task>,
    pub queues: Vec<ReadyQueue>,
    pub running: Option<ProcId>,
    /// Contiguous units the running task has held the CPU.
    pub slice: Ticks,
    pub task_to_queue: FxHashMap<ProcId, usize>,
    pub timeline: super::timeline::Timeline,

    // Tasks sorted by (arrival, id); index of the next unadmitted one.
    arrival_order: Vec<ProcId>,
    arrival_cursor: usize,
    completed: usize,
    enqueue_seq: u64,
}

impl SimCtx {
    pub fn new(tasks: Vec<Task>, topology: QueueTopology) -> Self {
        let queues = match topology {
            QueueTopology::SingleFifo => vec![ReadyQueue::new_fifo()],
            QueueTopology::SingleRanked => vec![ReadyQueue::new_ranked()],
            QueueTopology::Multilevel => (0..QUEUE_LEVELS).map(|_| ReadyQueue::new_fifo()).collect(),
        };

        let mut arrival_order: Vec<ProcId> = (0..tasks.len()).collect();
        arrival_order.sort_by_key(|&id| (tasks[id].spec.arrival_time, id));

        Self {
            now: 0,
            tasks,
            queues,
            running: None,
            slice: 0,
            task_to_queue: FxHashMap::default(),
            timeline: super::timeline::Timeline::new(),
            arrival_order,
            arrival_cursor: 0,
            completed: 0,
            enqueue_seq: 0,
        }
    }

    pub fn task(&self, id: ProcId) -> &Task {
        &self.tasks[id]
    }

    pub fn task_mut(&mut self, id: ProcId) -> &mut Task {
        &mut self.tasks[id]
    }

    /// Arrival time of the earliest task that has not been admitted yet.
    pub fn next_arrival(&self) -> Option<Ticks> {
        self.arrival_order
            .get(self.arrival_cursor)
            .map(|&id| self.tasks[id].spec.arrival_time)
    }

    /// Pops the next unadmitted task if it has arrived by `now`.
    pub fn pop_arrival(&mut self, now: Ticks) -> Option<ProcId> {
        let &id = self.arrival_order.get(self.arrival_cursor)?;
        if self.tasks[id].spec.arrival_time > now {
            return None;
        }
        self.arrival_cursor += 1;
        Some(id)
    }

    pub fn enqueue(&mut self, id: ProcId, level: usize, key: Option<u64>) {
        debug_assert!(
            !self.task_to_queue.contains_key(&id),
            "task {id} already present in a ready queue"
        );
        let task = &mut self.tasks[id];
        debug_assert!(
            matches!(task.state, TaskState::NotArrived | TaskState::Ready | TaskState::Running),
            "completed task {id} cannot be enqueued"
        );
        task.state = TaskState::Ready;

        let rank = key.map(|key| {
            let seq = self.enqueue_seq;
            self.enqueue_seq += 1;
            Rank { key, seq }
        });
        self.queues[level].push(id, rank);
        self.task_to_queue.insert(id, level);
    }

    pub fn dequeue(&mut self, level: usize) -> Option<ProcId> {
        let id = self.queues[level].pop()?;
        let removed = self.task_to_queue.remove(&id);
        debug_assert!(removed.is_some(), "task {id} missing queue membership");
        Some(id)
    }

    /// 0-based index of the highest-ranked nonempty queue.
    pub fn highest_nonempty_level(&self) -> Option<usize> {
        self.queues.iter().position(|q| !q.is_empty())
    }

    pub fn all_queues_empty(&self) -> bool {
        self.queues.iter().all(|q| q.is_empty())
    }

    pub fn set_running(&mut self, id: ProcId) {
        debug_assert!(
            !self.task_to_queue.contains_key(&id),
            "running task {id} must not be enqueued"
        );
        debug_assert!(self.running.is_none(), "CPU already running a task");
        self.running = Some(id);
        self.slice = 0;
        self.tasks[id].state = TaskState::Running;
    }

    pub fn complete_running(&mut self, completion_time: Ticks) -> ProcId {
        let id = self.running.take().expect("no running task to complete");
        self.slice = 0;
        self.completed += 1;

        let task = &mut self.tasks[id];
        debug_assert_eq!(task.remaining_burst, 0, "completed task {id} has burst left");
        task.state = TaskState::Completed;
        task.completion_time = Some(completion_time);

        let turnaround = completion_time - task.spec.arrival_time;
        debug_assert_eq!(
            task.waiting_time,
            turnaround - task.spec.burst_time,
            "accrued waiting for task {id} disagrees with turnaround - burst"
        );
        task.waiting_time = turnaround - task.spec.burst_time;
        id
    }

    /// One waiting unit for every task sitting in a ready queue.
    pub fn accrue_waiting(&mut self) {
        let SimCtx {
            ref queues,
            ref mut tasks,
            ..
        } = *self;
        for queue in queues {
            match queue {
                ReadyQueue::Fifo { tasks: ids } => {
                    for &id in ids {
                        tasks[id].waiting_time += 1;
                    }
                }
                ReadyQueue::Ranked { tasks: ids } => {
                    for (&id, _) in ids.iter() {
                        tasks[id].waiting_time += 1;
                    }
                }
            }
        }
    }

    pub fn all_complete(&self) -> bool {
        self.completed == self.tasks.len()
    }
}
