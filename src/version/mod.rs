//! Version resolution layer for template releases
//!
//! Determines which release tag should be installed and keeps the answer,
//! along with per-tag template metadata, in an in-process cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  TagSource  │────▶│  Resolver   │────▶│    Cache    │
//! │   (fetch)   │     │ (select +   │     │ (tag TTL +  │
//! └─────────────┘     │  memoize)   │     │  metadata)  │
//!        │            └─────────────┘     └─────────────┘
//!        ▼
//! ┌─────────────────────┐
//! │       Sources       │
//! │ (atom feed, latest) │
//! └─────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: In-process cache for the tag name and template info
//! - [`resolver`]: Tag name resolution with caching
//! - [`source`]: Trait for fetching the current tag from a remote source
//! - [`sources`]: Concrete sources (release feed, latest-release JSON)
//! - [`error`]: Error types for resolution
//! - [`tag`]: The `TagName` type

pub mod cache;
pub mod error;
pub mod resolver;
pub mod source;
pub mod sources;
pub mod tag;
