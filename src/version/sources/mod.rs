//! Tag source implementations

pub mod atom_feed;
pub mod latest_json;

pub use atom_feed::AtomFeedSource;
pub use latest_json::LatestJsonSource;
