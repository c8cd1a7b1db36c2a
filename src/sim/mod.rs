pub mod driver;
pub mod process;

pub use driver::{run_batch, BatchResult, Sim, StepResult, DEFAULT_TICK_LIMIT};
pub use process::{ProcessSpec, DEFAULT_QUEUE_LEVEL};
