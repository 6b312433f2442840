//! Template provisioning pipeline
//!
//! Decides which template release an application should run, then drives an
//! isolated worker process that downloads and extracts it, broadcasting the
//! worker's progress along the way.
//!
//! # Modules
//!
//! - [`provision`]: Orchestrates resolution and extraction
//! - [`version`]: Tag name resolution and the in-process version cache
//! - [`worker`]: Worker spawn contract, message protocol and supervision
//! - [`progress`]: Process-wide progress broadcast
//! - [`config`]: Configuration, constants and paths
//! - [`logging`]: Tracing setup

pub mod config;
pub mod logging;
pub mod progress;
pub mod provision;
pub mod version;
pub mod worker;
