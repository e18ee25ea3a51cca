//! Core domain types
//!
//! `job` is what the workflow engine hands us, `task` is what we send to the
//! Task Execution Service and `operation` is what we get back while polling.

pub mod job;
pub mod operation;
pub mod task;
