pub mod driver;
pub mod observer;
pub mod state;
pub mod timeline;

pub use driver::SchedCore;
pub use state::{ProcId, Rank, ReadyQueue, SimCtx, Task, TaskState, Ticks, QUEUE_LEVELS};
pub use timeline::{Occupant, Timeline, TimelineBlock};
