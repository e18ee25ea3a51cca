//! Data Transfer Objects for the TES HTTP API
//!
//! Lightweight bodies that are exchanged with the remote service but never
//! stored anywhere.

pub mod task;
