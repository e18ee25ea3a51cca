//! Repository layer
//!
//! The remote task service as seen by the runner. `TesClient` is the HTTP
//! implementation; tests substitute scripted ones.

mod tasks;

pub use tasks::TaskService;
