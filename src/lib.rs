//! mergebot - a continuously-running merge bot
//!
//! Scans pull requests on a set of monitored repositories, decides which
//! one (if any) is ready to be rebuilt and/or merged, drives the external
//! build pipeline, and posts status back to the review thread. All state
//! is rederived each cycle from the remote comment history; the merge
//! step re-validates live state immediately before pushing so concurrent
//! modification aborts the merge instead of overwriting newer work.

pub mod commands;
pub mod config;
pub mod cycle;
pub mod deps;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod platform;
pub mod publish;
pub mod refs;
pub mod select;
pub mod ticket;
pub mod types;
pub mod verify;
