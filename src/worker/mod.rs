//! Extraction worker layer
//!
//! The worker is a separate process that downloads and unpacks the template
//! artifact. This module owns the spawn contract, the message protocol and
//! the supervision of a single run.
//!
//! # Modules
//!
//! - [`request`]: Arguments and environment passed on spawn
//! - [`message`]: NDJSON messages sent back by the worker
//! - [`supervisor`]: Spawns the worker and maps its exit to a result
//! - [`contract`]: Helpers for implementing a worker
//! - [`error`]: Extraction error types

pub mod contract;
pub mod error;
pub mod message;
pub mod request;
pub mod supervisor;
