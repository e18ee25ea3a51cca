//! Scheduler layer for the runner
//!
//! Polling workers track a submitted task until it is terminal; the
//! registry keeps hold of them so the host can join or cancel them before
//! exiting.

pub mod poller;
pub mod registry;

pub use poller::{JobIdentity, PollExit, PollOutcome, PollPolicy, PollWorker};
pub use registry::{ShutdownSignal, WorkerRegistry};
