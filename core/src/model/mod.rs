pub mod address;
pub mod task;

pub use address::Address;
pub use task::{Task, TaskId, TaskStatus};
