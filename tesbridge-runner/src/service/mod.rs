//! Service layer
//!
//! Services contain the runner's business logic: turning a job into a TES
//! task description, and driving one job from submission to its final
//! result.

pub mod collector;
pub mod lifecycle;
pub mod task_builder;

pub use collector::{DirectoryListingCollector, OutputCollector, OutputMap};
pub use lifecycle::{JobRunner, ResultCallback};
pub use task_builder::TaskBuilder;
