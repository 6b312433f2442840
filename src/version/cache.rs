//! In-process cache for the resolved tag name and per-tag template metadata.
//!
//! Nothing here is persisted: every entry dies with the process, which bounds
//! staleness to a single process lifetime.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::version::tag::TagName;

#[derive(Debug)]
struct Expiring<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Expiring<T> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Holds two independent stores:
/// - a single slot for the current tag name, with a TTL
/// - template info JSON keyed by tag name, never expiring
#[derive(Debug, Default)]
pub struct VersionCache {
    tag_name: Mutex<Option<Expiring<TagName>>>,
    template_info: Mutex<HashMap<TagName, String>>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_tag_name(&self) -> MutexGuard<'_, Option<Expiring<TagName>>> {
        self.tag_name.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_template_info(&self) -> MutexGuard<'_, HashMap<TagName, String>> {
        self.template_info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the cached tag name. An expired entry is evicted and reported as absent.
    pub fn tag_name(&self) -> Option<TagName> {
        let mut slot = self.lock_tag_name();

        if slot
            .as_ref()
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            debug!("Cached tag name expired");
            *slot = None;
        }

        slot.as_ref().map(|entry| entry.value.clone())
    }

    /// Store the tag name. A zero `ttl` keeps it for the rest of the process lifetime.
    pub fn set_tag_name(&self, tag_name: TagName, ttl: Duration) {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        *self.lock_tag_name() = Some(Expiring {
            value: tag_name,
            expires_at,
        });
    }

    /// Get the serialized template info cached for `tag_name`
    pub fn template_info_json(&self, tag_name: &TagName) -> Option<String> {
        self.lock_template_info().get(tag_name).cloned()
    }

    /// Cache serialized template info for `tag_name` until the process exits
    pub fn set_template_info_json(&self, tag_name: TagName, json: String) {
        self.lock_template_info().insert(tag_name, json);
    }

    /// Drop every entry
    pub fn clear(&self) {
        *self.lock_tag_name() = None;
        self.lock_template_info().clear();
    }
}
