pub mod core;
pub mod error;
pub mod policy;
pub mod sim;
pub mod stats;

pub use crate::core::timeline::{Occupant, Timeline, TimelineBlock};
pub use error::SimError;
pub use policy::Policy;
pub use sim::{run_batch, BatchResult, ProcessSpec, Sim, StepResult};
pub use stats::{Averages, ProcessStats};
