//! Tesbridge Core
//!
//! Core types shared by the Tesbridge client and runner.
//!
//! This crate contains:
//! - Domain types: the host job specification, the TES task description and
//!   remote operation snapshots
//! - DTOs: request/response bodies that only exist on the wire

pub mod domain;
pub mod dto;
