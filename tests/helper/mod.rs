//! Shared test utilities

pub mod sources;
pub mod worker;
